//! Loading SQuAD-format files into decodable examples.
//!
//! The JSON stores answers as character offsets into the raw context string,
//! while the feature builder works over whitespace-delimited document tokens.
//! Loading therefore walks the context character by character, building the
//! token list and a char-to-word offset map in one pass.

use std::path::Path;

use kotae_core::scoring::{Dataset, Paragraph};
use kotae_core::types::Example;
use tracing::warn;

/// Load a SQuAD v1.1/v2.0 file as examples. With `is_training` set, gold
/// answer spans are attached (and verified against the document tokens);
/// otherwise only the questions are kept.
pub fn load_examples(path: impl AsRef<Path>, is_training: bool) -> anyhow::Result<Vec<Example>> {
    let dataset = Dataset::from_file(path)?;
    Ok(examples_from_dataset(&dataset, is_training))
}

/// Convert an in-memory dataset to examples.
pub fn examples_from_dataset(dataset: &Dataset, is_training: bool) -> Vec<Example> {
    let mut examples = Vec::new();
    for article in &dataset.data {
        for paragraph in &article.paragraphs {
            collect_paragraph(paragraph, is_training, &mut examples);
        }
    }
    examples
}

fn collect_paragraph(paragraph: &Paragraph, is_training: bool, out: &mut Vec<Example>) {
    let (doc_tokens, char_to_word_offset) = split_context(&paragraph.context);

    for qa in &paragraph.qas {
        let mut example = Example::new(&qa.id, &qa.question, doc_tokens.clone());
        if qa.is_impossible {
            example = example.impossible();
        }

        if is_training && !qa.is_impossible {
            let Some(answer) = qa.answers.first().filter(|a| !a.text.is_empty()) else {
                warn!(qas_id = %qa.id, "answerable question without gold answer, skipping");
                continue;
            };
            let answer_end = answer.answer_start + answer.text.chars().count() - 1;
            let (Some(&start), Some(&end)) = (
                char_to_word_offset.get(answer.answer_start),
                char_to_word_offset.get(answer_end),
            ) else {
                warn!(qas_id = %qa.id, "answer offset outside context, skipping");
                continue;
            };

            // Offsets in the wild sometimes point at the wrong place; skip
            // any answer that cannot be recovered from the tokens.
            let actual_text = doc_tokens[start..=end].join(" ");
            let cleaned: String = answer
                .text
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !actual_text.contains(&cleaned) {
                warn!(
                    qas_id = %qa.id,
                    actual = %actual_text,
                    expected = %cleaned,
                    "could not locate answer in context, skipping"
                );
                continue;
            }
            example = example.with_answer(&answer.text, start, end);
        }
        out.push(example);
    }
}

/// Split a context string into whitespace-delimited tokens, returning a map
/// from each character position to the token it belongs to.
pub fn split_context(context: &str) -> (Vec<String>, Vec<usize>) {
    let mut doc_tokens: Vec<String> = Vec::new();
    let mut char_to_word_offset = Vec::with_capacity(context.len());
    let mut prev_is_whitespace = true;

    for c in context.chars() {
        if c.is_whitespace() {
            prev_is_whitespace = true;
        } else {
            if prev_is_whitespace {
                doc_tokens.push(String::new());
            }
            doc_tokens
                .last_mut()
                .expect("token pushed above")
                .push(c);
            prev_is_whitespace = false;
        }
        char_to_word_offset.push(doc_tokens.len().saturating_sub(1));
    }

    (doc_tokens, char_to_word_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kotae_core::scoring::{Answer, Article, QuestionAnswer};

    fn paragraph(context: &str, qas: Vec<QuestionAnswer>) -> Dataset {
        Dataset {
            version: Some("v2.0".to_string()),
            data: vec![Article {
                title: String::new(),
                paragraphs: vec![Paragraph {
                    context: context.to_string(),
                    qas,
                }],
            }],
        }
    }

    fn qa(id: &str, answer: Option<(&str, usize)>, is_impossible: bool) -> QuestionAnswer {
        QuestionAnswer {
            id: id.to_string(),
            question: "?".to_string(),
            answers: answer
                .map(|(text, answer_start)| {
                    vec![Answer {
                        text: text.to_string(),
                        answer_start,
                    }]
                })
                .unwrap_or_default(),
            is_impossible,
        }
    }

    #[test]
    fn split_context_maps_chars_to_tokens() {
        let (tokens, offsets) = split_context("ab  cd\te");
        assert_eq!(tokens, vec!["ab", "cd", "e"]);
        //                        a  b  sp sp c  d  tab e
        assert_eq!(offsets, vec![0, 0, 0, 0, 1, 1, 1, 2]);
    }

    #[test]
    fn training_answers_become_token_spans() {
        // "John Smith" starts at char 15.
        let dataset = paragraph(
            "The leader was John Smith.",
            vec![qa("q1", Some(("John Smith", 15)), false)],
        );
        let examples = examples_from_dataset(&dataset, true);
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].start_position, Some(3));
        assert_eq!(examples[0].end_position, Some(4));
        assert_eq!(examples[0].orig_answer_text.as_deref(), Some("John Smith"));
    }

    #[test]
    fn unrecoverable_answers_are_skipped() {
        let dataset = paragraph(
            "The leader was John Smith.",
            vec![qa("q1", Some(("Queen Victoria", 15)), false)],
        );
        let examples = examples_from_dataset(&dataset, true);
        assert!(examples.is_empty());
    }

    #[test]
    fn impossible_questions_keep_no_span() {
        let dataset = paragraph(
            "The leader was John Smith.",
            vec![qa("q1", None, true)],
        );
        let examples = examples_from_dataset(&dataset, true);
        assert_eq!(examples.len(), 1);
        assert!(examples[0].is_impossible);
        assert!(!examples[0].has_answer());
    }

    #[test]
    fn inference_mode_keeps_all_questions() {
        let dataset = paragraph(
            "The leader was John Smith.",
            vec![qa("q1", Some(("Queen Victoria", 15)), false), qa("q2", None, true)],
        );
        let examples = examples_from_dataset(&dataset, false);
        assert_eq!(examples.len(), 2);
    }
}
