//! # Token-Classification Features
//!
//! Converts word-tokenized, word-labelled sequences into fixed-length
//! features for a per-token tagging head. Subword tokenization splits words
//! apart, so each word's label sits on its first sub-token and a `valid_ids`
//! mask marks those positions; everything else (continuation pieces, special
//! tokens, padding) carries the pad label 0.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{KotaeError, Result};
use crate::tokenize::SubwordTokenizer;
use crate::types::ModelFamily;

/// Reserved label id for padding, special tokens and continuation pieces.
pub const LABEL_PAD: u32 = 0;

/// One word-tokenized input sequence, optionally labelled per word.
#[derive(Debug, Clone)]
pub struct TagExample {
    pub id: String,
    pub tokens: Vec<String>,
    /// One label per entry in `tokens`. `None` at inference time.
    pub labels: Option<Vec<String>>,
}

impl TagExample {
    pub fn new(id: impl Into<String>, tokens: Vec<String>) -> Self {
        Self {
            id: id.into(),
            tokens,
            labels: None,
        }
    }

    #[must_use]
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }
}

/// Bidirectional label-string ↔ label-id map. Id 0 is reserved for padding;
/// real labels start at 1, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelMap {
    label_to_id: HashMap<String, u32>,
    id_to_label: HashMap<u32, String>,
}

impl LabelMap {
    pub fn new(labels: &[&str]) -> Self {
        let mut map = Self::default();
        for label in labels {
            map.insert(label);
        }
        map
    }

    fn insert(&mut self, label: &str) {
        if self.label_to_id.contains_key(label) {
            return;
        }
        let id = self.label_to_id.len() as u32 + 1;
        self.label_to_id.insert(label.to_string(), id);
        self.id_to_label.insert(id, label.to_string());
    }

    pub fn id(&self, label: &str) -> Result<u32> {
        self.label_to_id
            .get(label)
            .copied()
            .ok_or_else(|| KotaeError::UnknownLabel(label.to_string()))
    }

    /// Label text for an id; unknown or pad ids fall back to the outside tag.
    #[must_use]
    pub fn label(&self, id: u32) -> &str {
        self.id_to_label.get(&id).map_or("O", String::as_str)
    }

    /// Number of real labels, excluding the pad id.
    #[must_use]
    pub fn len(&self) -> usize {
        self.label_to_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.label_to_id.is_empty()
    }

    /// Decode a padded id sequence, keeping only the valid positions.
    pub fn decode(&self, label_ids: &[u32], valid_ids: &[u32]) -> Vec<String> {
        label_ids
            .iter()
            .zip(valid_ids)
            .filter(|&(_, &valid)| valid == 1)
            .map(|(&id, _)| self.label(id).to_string())
            .collect()
    }
}

/// Configuration for tagging feature construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TagConfig {
    pub family: ModelFamily,
    pub max_seq_length: usize,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            family: ModelFamily::Standard,
            max_seq_length: 128,
        }
    }
}

impl TagConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_family(mut self, family: ModelFamily) -> Self {
        self.family = family;
        self
    }

    #[must_use]
    pub fn with_max_seq_length(mut self, max_seq_length: usize) -> Self {
        self.max_seq_length = max_seq_length;
        self
    }
}

/// A fixed-length tagging feature, all vectors `max_seq_length` long.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagFeature {
    pub input_ids: Vec<u32>,
    pub input_mask: Vec<u32>,
    pub segment_ids: Vec<u32>,
    /// 1 at the first sub-token of each word, 0 elsewhere.
    pub valid_ids: Vec<u32>,
    /// Per-position label ids; all [`LABEL_PAD`] when built without labels.
    pub label_ids: Vec<u32>,
}

/// Builds [`TagFeature`]s from word-level examples.
pub struct TagFeatureBuilder<'a, T: SubwordTokenizer + ?Sized> {
    tokenizer: &'a T,
    labels: &'a LabelMap,
    config: TagConfig,
}

impl<'a, T: SubwordTokenizer + ?Sized> TagFeatureBuilder<'a, T> {
    pub fn new(tokenizer: &'a T, labels: &'a LabelMap, config: TagConfig) -> Self {
        Self {
            tokenizer,
            labels,
            config,
        }
    }

    pub fn build(&self, examples: &[TagExample]) -> Result<Vec<TagFeature>> {
        if examples.is_empty() {
            return Err(KotaeError::EmptyExamples);
        }
        examples.iter().map(|ex| self.build_example(ex)).collect()
    }

    fn build_example(&self, example: &TagExample) -> Result<TagFeature> {
        let max_seq_length = self.config.max_seq_length;
        let family = self.config.family;

        if let Some(labels) = &example.labels {
            if labels.len() != example.tokens.len() {
                return Err(KotaeError::LengthMismatch {
                    expected: example.tokens.len(),
                    actual: labels.len(),
                });
            }
        }

        let mut tokens: Vec<String> = Vec::new();
        let mut valid_ids: Vec<u32> = Vec::new();
        let mut label_ids: Vec<u32> = Vec::new();
        for (i, word) in example.tokens.iter().enumerate() {
            let pieces = self.tokenizer.tokenize(word);
            for (piece_index, piece) in pieces.iter().enumerate() {
                tokens.push(piece.clone());
                valid_ids.push(u32::from(piece_index == 0));
                let label = match (&example.labels, piece_index) {
                    (Some(labels), 0) => self.labels.id(&labels[i])?,
                    _ => LABEL_PAD,
                };
                label_ids.push(label);
            }
        }

        // Room for one separator and the classification token.
        let limit = max_seq_length
            .checked_sub(2)
            .ok_or_else(|| KotaeError::InvalidConfig("max_seq_length below 2".to_string()))?;
        tokens.truncate(limit);
        valid_ids.truncate(limit);
        label_ids.truncate(limit);

        tokens.push(self.tokenizer.sep_token().to_string());
        valid_ids.push(0);
        label_ids.push(LABEL_PAD);
        let mut segment_ids = vec![0u32; tokens.len()];

        let (cls_segment, pad_segment) = if family.cls_at_end() { (2, 4) } else { (0, 0) };
        if family.cls_at_end() {
            tokens.push(self.tokenizer.cls_token().to_string());
            segment_ids.push(cls_segment);
            valid_ids.push(0);
            label_ids.push(LABEL_PAD);
        } else {
            tokens.insert(0, self.tokenizer.cls_token().to_string());
            segment_ids.insert(0, cls_segment);
            valid_ids.insert(0, 0);
            label_ids.insert(0, LABEL_PAD);
        }

        let mut input_ids = self.tokenizer.convert_tokens_to_ids(&tokens);
        let mut input_mask = vec![1u32; input_ids.len()];

        let padding = max_seq_length - input_ids.len();
        if family.cls_at_end() {
            // Pointer-family models pad on the left.
            input_ids.splice(0..0, std::iter::repeat_n(self.tokenizer.pad_id(), padding));
            input_mask.splice(0..0, std::iter::repeat_n(0, padding));
            segment_ids.splice(0..0, std::iter::repeat_n(pad_segment, padding));
            valid_ids.splice(0..0, std::iter::repeat_n(0, padding));
            label_ids.splice(0..0, std::iter::repeat_n(LABEL_PAD, padding));
        } else {
            input_ids.extend(std::iter::repeat_n(self.tokenizer.pad_id(), padding));
            input_mask.extend(std::iter::repeat_n(0, padding));
            segment_ids.extend(std::iter::repeat_n(pad_segment, padding));
            valid_ids.extend(std::iter::repeat_n(0, padding));
            label_ids.extend(std::iter::repeat_n(LABEL_PAD, padding));
        }

        for seq in [&input_ids, &input_mask, &segment_ids, &valid_ids, &label_ids] {
            if seq.len() != max_seq_length {
                return Err(KotaeError::LengthMismatch {
                    expected: max_seq_length,
                    actual: seq.len(),
                });
            }
        }

        Ok(TagFeature {
            input_ids,
            input_mask,
            segment_ids,
            valid_ids,
            label_ids,
        })
    }
}
