use serde::{Deserialize, Serialize};

/// One question over one document, as produced by the data loader.
///
/// `doc_tokens` are the original whitespace-delimited document tokens;
/// `start_position`/`end_position` index into them (inclusive) when a gold
/// answer is annotated. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Unique question id, carried through to the prediction files.
    pub qas_id: String,

    /// Question text as asked.
    pub question_text: String,

    /// Original document tokens, in document order.
    pub doc_tokens: Vec<String>,

    /// Gold answer text, verbatim from the annotation.
    pub orig_answer_text: Option<String>,

    /// Index of the first document token of the gold answer.
    pub start_position: Option<usize>,

    /// Index of the last document token of the gold answer (inclusive).
    pub end_position: Option<usize>,

    /// Whether the question is annotated as unanswerable.
    pub is_impossible: bool,
}

impl Example {
    /// Creates an unanswered example over the given document tokens.
    #[must_use]
    pub fn new(
        qas_id: impl Into<String>,
        question_text: impl Into<String>,
        doc_tokens: Vec<String>,
    ) -> Self {
        Self {
            qas_id: qas_id.into(),
            question_text: question_text.into(),
            doc_tokens,
            orig_answer_text: None,
            start_position: None,
            end_position: None,
            is_impossible: false,
        }
    }

    /// Attaches a gold answer span (token indices, inclusive).
    #[must_use]
    pub fn with_answer(
        mut self,
        text: impl Into<String>,
        start_position: usize,
        end_position: usize,
    ) -> Self {
        self.orig_answer_text = Some(text.into());
        self.start_position = Some(start_position);
        self.end_position = Some(end_position);
        self
    }

    /// Marks the example as unanswerable.
    #[must_use]
    pub fn impossible(mut self) -> Self {
        self.is_impossible = true;
        self
    }

    /// Returns `true` if a gold answer span is attached.
    #[must_use]
    pub fn has_answer(&self) -> bool {
        self.start_position.is_some() && self.end_position.is_some()
    }
}
