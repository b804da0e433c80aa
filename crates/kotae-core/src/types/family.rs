use serde::{Deserialize, Serialize};
use std::fmt;

/// Which model family the features and decoder target.
///
/// The two families differ in sequence layout and in how the model reports
/// span scores:
///
/// - [`ModelFamily::Standard`] (BERT/XLM style): `[CLS] query [SEP] doc [SEP]`,
///   one start logit and one end logit per token position.
/// - [`ModelFamily::Pointer`] (XLNet style): `doc [SEP] query [SEP] [CLS]`,
///   top-k joint start/end log-probabilities plus a CLS null logit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// BERT-family layout and per-token start/end logits.
    #[default]
    Standard,
    /// XLNet-style layout and top-k pointer log-probabilities.
    Pointer,
}

impl ModelFamily {
    /// Returns `true` if the classification token goes at the end of the
    /// sequence (pointer family).
    #[must_use]
    pub fn cls_at_end(&self) -> bool {
        matches!(self, ModelFamily::Pointer)
    }

    /// Returns `true` if the document chunk comes before the query.
    #[must_use]
    pub fn doc_first(&self) -> bool {
        matches!(self, ModelFamily::Pointer)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Standard => write!(f, "standard"),
            ModelFamily::Pointer => write!(f, "pointer"),
        }
    }
}
