/// Raw output of a standard-head model for one feature: one start and one
/// end logit per chunk-local token position.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardResult {
    /// Matches the feature's `unique_id`.
    pub unique_id: u64,
    /// Start logits, one per token position.
    pub start_logits: Vec<f32>,
    /// End logits, one per token position.
    pub end_logits: Vec<f32>,
}

/// Raw output of a pointer-head model for one feature.
///
/// The model emits `start_n_top` start candidates; for each start candidate
/// it emits `end_n_top` end candidates, flattened row-major into the
/// `end_top_*` vectors (`len == start_n_top * end_n_top`). `cls_logit` scores
/// the no-answer hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerResult {
    /// Matches the feature's `unique_id`.
    pub unique_id: u64,
    /// Log-probabilities of the top start candidates.
    pub start_top_log_probs: Vec<f32>,
    /// Token positions of the top start candidates.
    pub start_top_index: Vec<usize>,
    /// Joint log-probabilities of end candidates, row-major per start.
    pub end_top_log_probs: Vec<f32>,
    /// Token positions of end candidates, row-major per start.
    pub end_top_index: Vec<usize>,
    /// Null (unanswerable) logit at the classification position.
    pub cls_logit: f32,
}

/// Raw model output for one feature, either head.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// BERT/XLM style per-token logits.
    Standard(StandardResult),
    /// XLNet style top-k pointer scores.
    Pointer(PointerResult),
}

impl RawResult {
    /// The feature id this result belongs to.
    #[must_use]
    pub fn unique_id(&self) -> u64 {
        match self {
            RawResult::Standard(r) => r.unique_id,
            RawResult::Pointer(r) => r.unique_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_id_dispatch() {
        let standard = RawResult::Standard(StandardResult {
            unique_id: 1_000_000_001,
            start_logits: vec![0.0],
            end_logits: vec![0.0],
        });
        assert_eq!(standard.unique_id(), 1_000_000_001);

        let pointer = RawResult::Pointer(PointerResult {
            unique_id: 1_000_000_002,
            start_top_log_probs: vec![],
            start_top_index: vec![],
            end_top_log_probs: vec![],
            end_top_index: vec![],
            cls_logit: 0.0,
        });
        assert_eq!(pointer.unique_id(), 1_000_000_002);
    }
}
