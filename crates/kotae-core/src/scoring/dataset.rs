//! SQuAD-format dataset structures.
//!
//! Matches the on-disk JSON layout of SQuAD v1.1 and v2.0: a `data` array of
//! articles, each holding paragraphs, each holding question-answer entries.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset version string (e.g. "v2.0"); absent in some exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub data: Vec<Article>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub context: String,
    pub qas: Vec<QuestionAnswer>,
}

/// One question over a paragraph, with its gold answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
    /// v2.0 only; v1.1 files omit it, meaning every question has an answer.
    #[serde(default)]
    pub is_impossible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub answer_start: usize,
}

impl Dataset {
    /// Read a SQuAD-format JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let dataset = serde_json::from_reader(BufReader::new(file))?;
        Ok(dataset)
    }

    /// Iterate over every question-answer entry in the dataset.
    pub fn qas(&self) -> impl Iterator<Item = &QuestionAnswer> {
        self.data
            .iter()
            .flat_map(|article| &article.paragraphs)
            .flat_map(|paragraph| &paragraph.qas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v2_layout() {
        let raw = r#"{
            "version": "v2.0",
            "data": [{
                "title": "Test",
                "paragraphs": [{
                    "context": "The leader was John Smith.",
                    "qas": [
                        {
                            "id": "q1",
                            "question": "Who was the leader?",
                            "answers": [{"text": "John Smith", "answer_start": 15}],
                            "is_impossible": false
                        },
                        {
                            "id": "q2",
                            "question": "Who was the follower?",
                            "answers": [],
                            "is_impossible": true
                        }
                    ]
                }]
            }]
        }"#;
        let dataset: Dataset = serde_json::from_str(raw).unwrap();
        assert_eq!(dataset.version.as_deref(), Some("v2.0"));
        let qas: Vec<_> = dataset.qas().collect();
        assert_eq!(qas.len(), 2);
        assert!(!qas[0].is_impossible);
        assert!(qas[1].is_impossible);
        assert_eq!(qas[0].answers[0].text, "John Smith");
    }

    #[test]
    fn v1_entries_default_to_answerable() {
        let raw = r#"{
            "data": [{
                "paragraphs": [{
                    "context": "Water is wet.",
                    "qas": [{
                        "id": "q1",
                        "question": "What is wet?",
                        "answers": [{"text": "Water", "answer_start": 0}]
                    }]
                }]
            }]
        }"#;
        let dataset: Dataset = serde_json::from_str(raw).unwrap();
        let qa = dataset.qas().next().unwrap();
        assert!(!qa.is_impossible);
        assert_eq!(qa.answers.len(), 1);
    }
}
