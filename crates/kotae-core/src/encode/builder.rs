//! # Feature Builder
//!
//! Converts examples into fixed-length feature records. Documents longer
//! than the model's context window are covered by overlapping sliding-window
//! chunks; each chunk becomes one feature.

use std::collections::HashMap;

use tracing::debug;

use crate::encode::max_context::is_max_context;
use crate::error::{KotaeError, Result};
use crate::tokenize::SubwordTokenizer;
use crate::types::{DocSpan, Example, Feature, ModelFamily};

/// First feature id handed out. Large so feature ids never collide with
/// example indices in downstream lookups.
pub const FIRST_UNIQUE_ID: u64 = 1_000_000_000;

/// Configuration for feature construction.
#[derive(Debug, Clone, Copy)]
pub struct FeatureConfig {
    /// Target model family; controls sequence layout.
    pub family: ModelFamily,
    /// Fixed length of every produced positional sequence.
    pub max_seq_length: usize,
    /// Stride of the sliding window over long documents.
    pub doc_stride: usize,
    /// Maximum number of query sub-tokens kept.
    pub max_query_length: usize,
    /// Whether to compute training labels.
    pub is_training: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            family: ModelFamily::Standard,
            max_seq_length: 384,
            doc_stride: 128,
            max_query_length: 64,
            is_training: false,
        }
    }
}

impl FeatureConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model family.
    #[must_use]
    pub fn with_family(mut self, family: ModelFamily) -> Self {
        self.family = family;
        self
    }

    /// Set the fixed sequence length.
    #[must_use]
    pub fn with_max_seq_length(mut self, max_seq_length: usize) -> Self {
        self.max_seq_length = max_seq_length;
        self
    }

    /// Set the sliding-window stride.
    #[must_use]
    pub fn with_doc_stride(mut self, doc_stride: usize) -> Self {
        self.doc_stride = doc_stride;
        self
    }

    /// Set the query truncation length.
    #[must_use]
    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }

    /// Enable or disable training label computation.
    #[must_use]
    pub fn with_training(mut self, is_training: bool) -> Self {
        self.is_training = is_training;
        self
    }
}

/// Segment id assignment for one model family.
struct SegmentIds {
    seq_a: u32,
    seq_b: u32,
    cls: u32,
    pad: u32,
}

impl SegmentIds {
    fn for_family(family: ModelFamily) -> Self {
        match family {
            ModelFamily::Standard => Self { seq_a: 0, seq_b: 1, cls: 0, pad: 0 },
            ModelFamily::Pointer => Self { seq_a: 0, seq_b: 1, cls: 2, pad: 4 },
        }
    }
}

/// Builds [`Feature`]s from [`Example`]s using an external subword tokenizer.
pub struct FeatureBuilder<'a, T: SubwordTokenizer + ?Sized> {
    tokenizer: &'a T,
    config: FeatureConfig,
}

impl<'a, T: SubwordTokenizer + ?Sized> FeatureBuilder<'a, T> {
    /// Create a builder over the given tokenizer.
    pub fn new(tokenizer: &'a T, config: FeatureConfig) -> Self {
        Self { tokenizer, config }
    }

    /// Convert a batch of examples into features, one per doc span, in
    /// example order. Fails fast on configuration or padding violations.
    pub fn build(&self, examples: &[Example]) -> Result<Vec<Feature>> {
        if examples.is_empty() {
            return Err(KotaeError::EmptyExamples);
        }

        let mut unique_id = FIRST_UNIQUE_ID;
        let mut features = Vec::new();
        for (example_index, example) in examples.iter().enumerate() {
            self.build_example(example, example_index, &mut unique_id, &mut features)?;
        }
        Ok(features)
    }

    fn build_example(
        &self,
        example: &Example,
        example_index: usize,
        unique_id: &mut u64,
        features: &mut Vec<Feature>,
    ) -> Result<()> {
        let mut query_tokens = self.tokenizer.tokenize(&example.question_text);
        query_tokens.truncate(self.config.max_query_length);

        // Sub-tokenize each document token independently, keeping the
        // alignment between sub-token and original-token indices.
        let mut tok_to_orig_index = Vec::new();
        let mut orig_to_tok_index = Vec::new();
        let mut all_doc_tokens: Vec<String> = Vec::new();
        for (i, token) in example.doc_tokens.iter().enumerate() {
            orig_to_tok_index.push(all_doc_tokens.len());
            for sub_token in self.tokenizer.tokenize(token) {
                tok_to_orig_index.push(i);
                all_doc_tokens.push(sub_token);
            }
        }

        let tok_span = self.project_answer_span(example, &orig_to_tok_index, &all_doc_tokens);

        let reserved = query_tokens.len() + 3; // [CLS] and two [SEP]
        let max_tokens_for_doc = self
            .config
            .max_seq_length
            .checked_sub(reserved)
            .filter(|n| *n > 0)
            .ok_or(KotaeError::LengthMismatch {
                expected: self.config.max_seq_length,
                actual: reserved,
            })?;

        let doc_spans = compute_doc_spans(all_doc_tokens.len(), max_tokens_for_doc, self.config.doc_stride);

        for (doc_span_index, doc_span) in doc_spans.iter().enumerate() {
            let feature = self.build_span_feature(
                example,
                example_index,
                *unique_id,
                &query_tokens,
                &all_doc_tokens,
                &tok_to_orig_index,
                &doc_spans,
                doc_span_index,
                *doc_span,
                tok_span,
            )?;
            if example_index < 2 {
                debug!(
                    unique_id = feature.unique_id,
                    example_index,
                    doc_span_index,
                    tokens = %feature.tokens.join(" "),
                    "built feature"
                );
            }
            features.push(feature);
            *unique_id += 1;
        }
        Ok(())
    }

    /// Project the original-token answer span into sub-token indices, then
    /// tighten it against the detokenized gold answer.
    fn project_answer_span(
        &self,
        example: &Example,
        orig_to_tok_index: &[usize],
        all_doc_tokens: &[String],
    ) -> Option<(usize, usize)> {
        if !self.config.is_training || example.is_impossible {
            return None;
        }
        let (start, end) = (example.start_position?, example.end_position?);
        let answer_text = example.orig_answer_text.as_deref()?;

        let tok_start = orig_to_tok_index[start];
        let tok_end = if end < example.doc_tokens.len() - 1 {
            orig_to_tok_index[end + 1] - 1
        } else {
            all_doc_tokens.len() - 1
        };
        Some(self.improve_answer_span(all_doc_tokens, tok_start, tok_end, answer_text))
    }

    /// Scan sub-token start/end pairs inside the projected range for the
    /// first pair whose detokenized text equals the gold answer exactly.
    ///
    /// Annotations are character based and may sit inside a word the subword
    /// segmentation keeps whole ("1895" inside "(1895-1943)."); when the
    /// segmentation does split, this recovers the tight span. If nothing
    /// matches, the original projection stands.
    fn improve_answer_span(
        &self,
        all_doc_tokens: &[String],
        input_start: usize,
        input_end: usize,
        orig_answer_text: &str,
    ) -> (usize, usize) {
        let tok_answer_text = self.tokenizer.tokenize(orig_answer_text).join(" ");

        for new_start in input_start..=input_end {
            for new_end in (new_start..=input_end).rev() {
                let text_span = all_doc_tokens[new_start..=new_end].join(" ");
                if text_span == tok_answer_text {
                    return (new_start, new_end);
                }
            }
        }
        (input_start, input_end)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_span_feature(
        &self,
        example: &Example,
        example_index: usize,
        unique_id: u64,
        query_tokens: &[String],
        all_doc_tokens: &[String],
        tok_to_orig_index: &[usize],
        doc_spans: &[DocSpan],
        doc_span_index: usize,
        doc_span: DocSpan,
        tok_span: Option<(usize, usize)>,
    ) -> Result<Feature> {
        let family = self.config.family;
        let seg = SegmentIds::for_family(family);
        let max_seq_length = self.config.max_seq_length;

        let mut tokens: Vec<String> = Vec::with_capacity(max_seq_length);
        let mut segment_ids: Vec<u32> = Vec::with_capacity(max_seq_length);
        let mut p_mask: Vec<u32> = Vec::with_capacity(max_seq_length);
        let mut token_to_orig_map = HashMap::new();
        let mut token_is_max_context = HashMap::new();
        let mut cls_index = 0;

        // The classification token stays answerable (p_mask 0): it is how
        // the null answer is expressed.
        if !family.cls_at_end() {
            tokens.push(self.tokenizer.cls_token().to_string());
            segment_ids.push(seg.cls);
            p_mask.push(0);
            cls_index = 0;
        }

        if !family.doc_first() {
            for token in query_tokens {
                tokens.push(token.clone());
                segment_ids.push(seg.seq_a);
                p_mask.push(1);
            }
            tokens.push(self.tokenizer.sep_token().to_string());
            segment_ids.push(seg.seq_a);
            p_mask.push(1);
        }

        let doc_segment = if family.doc_first() { seg.seq_a } else { seg.seq_b };
        for i in 0..doc_span.length {
            let split_token_index = doc_span.start + i;
            token_to_orig_map.insert(tokens.len(), tok_to_orig_index[split_token_index]);
            token_is_max_context.insert(
                tokens.len(),
                is_max_context(doc_spans, doc_span_index, split_token_index),
            );
            tokens.push(all_doc_tokens[split_token_index].clone());
            segment_ids.push(doc_segment);
            p_mask.push(0);
        }
        let paragraph_len = doc_span.length;

        if family.doc_first() {
            tokens.push(self.tokenizer.sep_token().to_string());
            segment_ids.push(seg.seq_a);
            p_mask.push(1);
            for token in query_tokens {
                tokens.push(token.clone());
                segment_ids.push(seg.seq_b);
                p_mask.push(1);
            }
        }

        tokens.push(self.tokenizer.sep_token().to_string());
        segment_ids.push(seg.seq_b);
        p_mask.push(1);

        if family.cls_at_end() {
            tokens.push(self.tokenizer.cls_token().to_string());
            segment_ids.push(seg.cls);
            p_mask.push(0);
            cls_index = tokens.len() - 1;
        }

        let mut input_ids = self.tokenizer.convert_tokens_to_ids(&tokens);
        let mut input_mask: Vec<u32> = vec![1; input_ids.len()];

        while input_ids.len() < max_seq_length {
            input_ids.push(self.tokenizer.pad_id());
            input_mask.push(0);
            segment_ids.push(seg.pad);
            p_mask.push(1);
        }

        for sequence in [&input_ids, &input_mask, &segment_ids, &p_mask] {
            if sequence.len() != max_seq_length {
                return Err(KotaeError::LengthMismatch {
                    expected: max_seq_length,
                    actual: sequence.len(),
                });
            }
        }

        let (start_position, end_position, span_is_impossible) = self.place_labels(
            example,
            doc_span,
            tok_span,
            query_tokens.len(),
            cls_index,
        );

        Ok(Feature {
            unique_id,
            example_index,
            doc_span_index,
            tokens,
            token_to_orig_map,
            token_is_max_context,
            input_ids,
            input_mask,
            segment_ids,
            cls_index,
            p_mask,
            paragraph_len,
            start_position,
            end_position,
            is_impossible: span_is_impossible,
        })
    }

    /// Training label placement: a chunk that does not fully contain the
    /// gold span is treated as unanswerable and points at the CLS slot.
    fn place_labels(
        &self,
        example: &Example,
        doc_span: DocSpan,
        tok_span: Option<(usize, usize)>,
        query_len: usize,
        cls_index: usize,
    ) -> (Option<usize>, Option<usize>, bool) {
        if !self.config.is_training {
            return (None, None, example.is_impossible);
        }

        if let Some((tok_start, tok_end)) = tok_span {
            if tok_start >= doc_span.start && tok_end <= doc_span.end() {
                let doc_offset = if self.config.family.doc_first() {
                    0
                } else {
                    query_len + 2
                };
                return (
                    Some(tok_start - doc_span.start + doc_offset),
                    Some(tok_end - doc_span.start + doc_offset),
                    false,
                );
            }
        }
        (Some(cls_index), Some(cls_index), true)
    }
}

/// Cover the tokenized document with sliding windows of up to
/// `max_tokens_for_doc` sub-tokens, advancing by `doc_stride`. The final
/// window ends exactly at the last sub-token.
fn compute_doc_spans(doc_len: usize, max_tokens_for_doc: usize, doc_stride: usize) -> Vec<DocSpan> {
    let mut doc_spans = Vec::new();
    let mut start_offset = 0;
    while start_offset < doc_len {
        let length = (doc_len - start_offset).min(max_tokens_for_doc);
        doc_spans.push(DocSpan { start: start_offset, length });
        if start_offset + length == doc_len {
            break;
        }
        start_offset += length.min(doc_stride);
    }
    doc_spans
}
