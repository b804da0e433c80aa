use thiserror::Error;

/// Errors that can occur during kotae core operations.
#[derive(Debug, Error)]
pub enum KotaeError {
    /// A sequence does not have the required length: a padded feature vector
    /// off the configured length, or a label list off its token count.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// The required length.
        expected: usize,
        /// The length actually supplied or produced.
        actual: usize,
    },

    /// No raw model result was found for a known feature id.
    #[error("missing raw result for unique id {unique_id}")]
    MissingResult {
        /// The feature id with no matching result.
        unique_id: u64,
    },

    /// A raw result carries the wrong head variant for the configured family.
    #[error("raw result for unique id {unique_id} does not match the configured model family")]
    ResultFamilyMismatch {
        /// The offending feature id.
        unique_id: u64,
    },

    /// The example set handed to a builder or decoder is empty.
    #[error("no examples to process")]
    EmptyExamples,

    /// A builder or decoder was configured with inconsistent parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The subword tokenizer reported a failure.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// An unknown label was encountered during tag conversion.
    #[error("unknown label: {0:?}")]
    UnknownLabel(String),

    /// JSON serialization or parsing failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O failed while reading a dataset or writing predictions.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for kotae operations.
pub type Result<T> = std::result::Result<T, KotaeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = KotaeError::LengthMismatch {
            expected: 384,
            actual: 380,
        };
        assert_eq!(err.to_string(), "length mismatch: expected 384, got 380");

        let err = KotaeError::MissingResult { unique_id: 1000000007 };
        assert!(err.to_string().contains("1000000007"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KotaeError>();
    }
}
