//! # Answer Scoring
//!
//! SQuAD-format dataset loading and the standard exact-match / token-F1
//! metrics, including the no-answer threshold search for v2.0 datasets.

pub mod dataset;
pub mod squad;

pub use dataset::{Answer, Article, Dataset, Paragraph, QuestionAnswer};
pub use squad::{
    apply_no_answer_threshold, compute_exact, compute_f1, evaluate, find_best_threshold,
    get_raw_scores, make_qid_to_has_ans, normalize_answer, EvalMetrics, ThresholdSearch,
};
