//! # Tokenization and Alignment Adapters
//!
//! Wraps the external subword tokenizer behind a small trait and provides the
//! whitespace/basic tokenization the text re-aligner needs to work in the
//! same normalized space as the model's tokenizer.

use tokenizers::Tokenizer as HfTokenizer;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::{KotaeError, Result};

/// Splits text on runs of whitespace. Empty input yields no tokens.
pub fn whitespace_tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Behavioral contract of the external subword tokenizer.
///
/// Implementations must be deterministic and idempotent: tokenizing the join
/// of a token's sub-tokens yields the same sub-tokens again. Continuation
/// pieces carry the `##` prefix in the BERT-family convention.
pub trait SubwordTokenizer {
    /// Split text into subword tokens.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Map tokens to vocabulary ids.
    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<u32>;

    /// The classification token string.
    fn cls_token(&self) -> &str {
        "[CLS]"
    }

    /// The separator token string.
    fn sep_token(&self) -> &str {
        "[SEP]"
    }

    /// The reserved padding id.
    fn pad_id(&self) -> u32 {
        0
    }
}

/// Adapter over a Hugging Face `tokenizers` vocabulary file.
pub struct HfSubwordTokenizer {
    inner: HfTokenizer,
}

impl HfSubwordTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let inner = HfTokenizer::from_file(path.as_ref())
            .map_err(|e| KotaeError::Tokenizer(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl SubwordTokenizer for HfSubwordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.get_tokens().to_vec(),
            Err(e) => {
                warn!(error = %e, "subword tokenization failed, treating text as empty");
                Vec::new()
            }
        }
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<u32> {
        tokens
            .iter()
            .map(|t| self.inner.token_to_id(t).unwrap_or(self.pad_id()))
            .collect()
    }
}

/// Whitespace + punctuation tokenizer matching the model tokenizer's basic
/// normalization pass (optional lowercasing and accent stripping).
///
/// The re-aligner uses this to bring the original document text into the
/// same normalized space as a detokenized prediction.
#[derive(Debug, Clone, Copy)]
pub struct BasicTokenizer {
    lower_case: bool,
}

impl BasicTokenizer {
    /// Create a basic tokenizer; `lower_case` must match the subword
    /// tokenizer's casing mode.
    #[must_use]
    pub fn new(lower_case: bool) -> Self {
        Self { lower_case }
    }

    /// Tokenize text: clean control characters, split on whitespace,
    /// normalize each word, then split punctuation into its own tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned = clean_text(text);
        let mut output = Vec::new();
        for word in cleaned.split_whitespace() {
            let word = if self.lower_case {
                strip_accents(&word.to_lowercase())
            } else {
                word.to_string()
            };
            split_on_punctuation(&word, &mut output);
        }
        output
    }
}

impl Default for BasicTokenizer {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Drop control characters and canonicalize all whitespace to plain spaces.
fn clean_text(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            if c == '\u{0}' || c == '\u{fffd}' {
                None
            } else if c.is_whitespace() {
                Some(' ')
            } else if c.is_control() {
                None
            } else {
                Some(c)
            }
        })
        .collect()
}

/// Remove combining marks after NFD decomposition.
fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// ASCII symbols count as punctuation (matching the BERT convention of
/// treating characters like `$` and `-` as splittable), as does anything
/// non-alphanumeric outside the ASCII range.
fn is_punctuation(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_punctuation()
    } else {
        !c.is_alphanumeric() && !c.is_whitespace() && !is_combining_mark(c)
    }
}

fn split_on_punctuation(word: &str, output: &mut Vec<String>) {
    let mut current = String::new();
    for c in word.chars() {
        if is_punctuation(c) {
            if !current.is_empty() {
                output.push(std::mem::take(&mut current));
            }
            output.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        output.push(current);
    }
}
