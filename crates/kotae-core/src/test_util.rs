//! Deterministic tokenizer fake for unit tests.

use crate::tokenize::{BasicTokenizer, SubwordTokenizer};

/// Word-level stand-in for a real subword vocabulary: lowercases and splits
/// punctuation like the basic tokenizer, hashes tokens to stable ids.
pub(crate) struct FakeTokenizer {
    basic: BasicTokenizer,
}

impl FakeTokenizer {
    pub(crate) fn new() -> Self {
        Self {
            basic: BasicTokenizer::new(true),
        }
    }
}

impl SubwordTokenizer for FakeTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.basic.tokenize(text)
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<u32> {
        tokens.iter().map(|t| fnv1a(t)).collect()
    }
}

/// FNV-1a, truncated; reserves 0 for padding.
fn fnv1a(token: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in token.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash | 1
}

pub(crate) fn doc_tokens(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
