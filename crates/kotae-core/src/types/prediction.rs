use serde::{Deserialize, Serialize};

/// A candidate answer span before any text materialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrelimPrediction {
    /// Index into the example's feature list.
    pub feature_index: usize,
    /// Chunk-local start token position.
    pub start_index: usize,
    /// Chunk-local end token position (inclusive).
    pub end_index: usize,
    /// Start logit or log-probability, depending on head.
    pub start_score: f32,
    /// End logit or log-probability, depending on head.
    pub end_score: f32,
}

impl PrelimPrediction {
    /// Combined ranking score.
    #[must_use]
    pub fn score(&self) -> f32 {
        self.start_score + self.end_score
    }
}

/// A de-duplicated, text-materialized candidate answer.
#[derive(Debug, Clone, PartialEq)]
pub struct NbestPrediction {
    /// Answer text aligned back onto the original document.
    pub text: String,
    /// Start score carried from the preliminary prediction.
    pub start_score: f32,
    /// End score carried from the preliminary prediction.
    pub end_score: f32,
}

/// One entry of the persisted n-best file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NbestEntry {
    /// Answer text.
    pub text: String,
    /// Softmax probability over the kept candidates' combined scores.
    pub probability: f64,
    /// Start score of the candidate.
    pub start_score: f32,
    /// End score of the candidate.
    pub end_score: f32,
}
