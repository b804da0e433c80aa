//! # Span Decoding
//!
//! Converts raw model scores back into ranked, de-duplicated answer strings.
//! Two head variants exist behind one entry point, selected by the config's
//! model family: the standard head (per-token start/end logits) and the
//! pointer head (top-k joint log-probabilities plus a null logit).

pub mod pointer;
pub mod realign;
pub mod standard;

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{KotaeError, Result};
use crate::types::{Example, Feature, ModelFamily, NbestEntry, RawResult};

pub use realign::realign;

/// Configuration for span decoding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Model family; selects the decoder variant.
    pub family: ModelFamily,
    /// How many candidates to keep per example (and per logit shortlist).
    pub n_best_size: usize,
    /// Longest admissible answer span, in sub-tokens.
    pub max_answer_length: usize,
    /// Whether the dataset contains unanswerable questions.
    pub allow_null: bool,
    /// Fixed decision threshold on the null-vs-answer score difference
    /// (standard head only).
    pub null_score_diff_threshold: f32,
    /// Number of start candidates the pointer head emits.
    pub start_n_top: usize,
    /// Number of end candidates per start candidate (pointer head).
    pub end_n_top: usize,
    /// Casing mode of the subword tokenizer, used during re-alignment.
    pub lower_case: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            family: ModelFamily::Standard,
            n_best_size: 20,
            max_answer_length: 30,
            allow_null: false,
            null_score_diff_threshold: 0.0,
            start_n_top: 5,
            end_n_top: 5,
            lower_case: true,
        }
    }
}

impl DecodeConfig {
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

    /// Set the n-best size.
    #[must_use]
    pub fn with_n_best_size(mut self, n_best_size: usize) -> Self {
        self.n_best_size = n_best_size;
        self
    }

    /// Set the maximum answer length.
    #[must_use]
    pub fn with_max_answer_length(mut self, max_answer_length: usize) -> Self {
        self.max_answer_length = max_answer_length;
        self
    }

    /// Enable or disable null-answer support.
    #[must_use]
    pub fn with_allow_null(mut self, allow_null: bool) -> Self {
        self.allow_null = allow_null;
        self
    }

    /// Set the fixed null decision threshold (standard head).
    #[must_use]
    pub fn with_null_score_diff_threshold(mut self, threshold: f32) -> Self {
        self.null_score_diff_threshold = threshold;
        self
    }

    /// Set the pointer-head shortlist sizes.
    #[must_use]
    pub fn with_top_sizes(mut self, start_n_top: usize, end_n_top: usize) -> Self {
        self.start_n_top = start_n_top;
        self.end_n_top = end_n_top;
        self
    }

    /// Set the tokenizer casing mode used during re-alignment.
    #[must_use]
    pub fn with_lower_case(mut self, lower_case: bool) -> Self {
        self.lower_case = lower_case;
        self
    }
}

/// Decoded predictions for one evaluation pass, in input example order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeOutput {
    /// Question id → final predicted answer text.
    pub predictions: IndexMap<String, String>,
    /// Question id → ranked candidate answers.
    pub nbest: IndexMap<String, Vec<NbestEntry>>,
    /// Question id → null-vs-answer score difference. Populated when null
    /// answers are enabled (standard head) or always (pointer head, for the
    /// downstream threshold search).
    pub null_odds: IndexMap<String, f32>,
}

impl DecodeOutput {
    /// Write the predictions file (pretty-printed JSON object).
    pub fn write_predictions(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), &self.predictions)
    }

    /// Write the n-best file.
    pub fn write_nbest(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), &self.nbest)
    }

    /// Write the null-odds file.
    pub fn write_null_odds(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), &self.null_odds)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    info!(path = %path.display(), "writing predictions");
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    std::fs::write(path, body)?;
    Ok(())
}

/// Decode raw model results into ranked answers for every example, using the
/// decoder variant selected by `config.family`.
pub fn decode(
    examples: &[Example],
    features: &[Feature],
    results: &[RawResult],
    config: &DecodeConfig,
) -> Result<DecodeOutput> {
    match config.family {
        ModelFamily::Standard => standard::decode(examples, features, results, config),
        ModelFamily::Pointer => pointer::decode(examples, features, results, config),
    }
}

/// Group features by originating example index, preserving feature order.
pub(crate) fn features_by_example<'a>(features: &'a [Feature]) -> HashMap<usize, Vec<&'a Feature>> {
    let mut grouped: HashMap<usize, Vec<&Feature>> = HashMap::new();
    for feature in features {
        grouped.entry(feature.example_index).or_default().push(feature);
    }
    grouped
}

/// Index raw results by feature id.
pub(crate) fn results_by_id<'a>(results: &'a [RawResult]) -> HashMap<u64, &'a RawResult> {
    results.iter().map(|r| (r.unique_id(), r)).collect()
}

/// Look up the result for a feature; a miss means a corrupted inference pass.
pub(crate) fn result_for<'a>(
    by_id: &HashMap<u64, &'a RawResult>,
    unique_id: u64,
) -> Result<&'a RawResult> {
    by_id
        .get(&unique_id)
        .copied()
        .ok_or(KotaeError::MissingResult { unique_id })
}

/// Indices of the `n_best_size` largest scores, best first. Equal scores
/// keep ascending index order (stable sort).
pub(crate) fn best_indexes(scores: &[f32], n_best_size: usize) -> Vec<usize> {
    let mut index_and_score: Vec<(usize, f32)> =
        scores.iter().copied().enumerate().collect();
    index_and_score.sort_by(|a, b| b.1.total_cmp(&a.1));
    index_and_score
        .into_iter()
        .take(n_best_size)
        .map(|(index, _)| index)
        .collect()
}

/// Softmax over raw scores, numerically stabilized by max subtraction.
pub(crate) fn softmax(scores: &[f32]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let max_score = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp_scores: Vec<f64> = scores
        .iter()
        .map(|s| f64::from(s - max_score).exp())
        .collect();
    let total: f64 = exp_scores.iter().sum();
    exp_scores.into_iter().map(|x| x / total).collect()
}

/// Join sub-tokens and undo WordPiece continuation markers, collapsing the
/// result to single-spaced text.
pub(crate) fn detokenize(tokens: &[String]) -> String {
    let joined = tokens.join(" ");
    let merged = joined.replace(" ##", "").replace("##", "");
    merged.split_whitespace().collect::<Vec<_>>().join(" ")
}
