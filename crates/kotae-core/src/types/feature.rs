use std::collections::HashMap;

/// One sliding-window chunk over a sub-tokenized document.
///
/// `start` is a sub-token offset into the full tokenized document; the span
/// covers `start..start + length`. Ephemeral, computed per example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocSpan {
    /// First covered sub-token index.
    pub start: usize,
    /// Number of sub-tokens covered.
    pub length: usize,
}

impl DocSpan {
    /// Index of the last covered sub-token (inclusive).
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.length - 1
    }

    /// Returns `true` if the span covers the given sub-token position.
    #[must_use]
    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position <= self.end()
    }
}

/// One fixed-length, tensor-ready record built from a single [`DocSpan`].
///
/// All positional sequences (`input_ids`, `input_mask`, `segment_ids`,
/// `p_mask`) have length exactly `max_seq_length`; the builder fails rather
/// than emit a feature violating this.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Globally unique feature id, independent of the example index, so
    /// results of a shuffled inference pass can be matched back.
    pub unique_id: u64,

    /// Index of the originating example in the input batch.
    pub example_index: usize,

    /// Which of the example's doc spans produced this feature.
    pub doc_span_index: usize,

    /// Assembled token strings, special tokens included.
    pub tokens: Vec<String>,

    /// Chunk-local token position → original document token index. Only
    /// document positions appear as keys; query and special tokens do not.
    pub token_to_orig_map: HashMap<usize, usize>,

    /// Chunk-local token position → whether this chunk is the max-context
    /// owner of the underlying document sub-token.
    pub token_is_max_context: HashMap<usize, bool>,

    /// Vocabulary ids, padded to `max_seq_length`.
    pub input_ids: Vec<u32>,

    /// Attention mask: 1 for real tokens, 0 for padding.
    pub input_mask: Vec<u32>,

    /// Segment (token type) ids, padded with the reserved pad segment id.
    pub segment_ids: Vec<u32>,

    /// Position of the classification token within the sequence.
    pub cls_index: usize,

    /// 1 for positions that can never be part of an answer (query tokens,
    /// separators, padding), 0 for answerable positions.
    pub p_mask: Vec<u32>,

    /// Number of document sub-tokens in this chunk.
    pub paragraph_len: usize,

    /// Training label: answer start (chunk-local), when training.
    pub start_position: Option<usize>,

    /// Training label: answer end (chunk-local, inclusive), when training.
    pub end_position: Option<usize>,

    /// Whether this particular chunk contains no gold answer.
    pub is_impossible: bool,
}

impl Feature {
    /// Returns `true` if the given chunk-local position belongs to the
    /// document part of the sequence.
    #[must_use]
    pub fn is_doc_position(&self, position: usize) -> bool {
        self.token_to_orig_map.contains_key(&position)
    }

    /// Max-context ownership for a chunk-local position; positions outside
    /// the document part are never owned.
    #[must_use]
    pub fn is_max_context(&self, position: usize) -> bool {
        self.token_is_max_context.get(&position).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_span_bounds() {
        let span = DocSpan { start: 4, length: 3 };
        assert_eq!(span.end(), 6);
        assert!(span.contains(4));
        assert!(span.contains(6));
        assert!(!span.contains(3));
        assert!(!span.contains(7));
    }

    #[test]
    fn max_context_defaults_to_false() {
        let feature = Feature {
            unique_id: 1_000_000_000,
            example_index: 0,
            doc_span_index: 0,
            tokens: vec![],
            token_to_orig_map: HashMap::new(),
            token_is_max_context: HashMap::new(),
            input_ids: vec![],
            input_mask: vec![],
            segment_ids: vec![],
            cls_index: 0,
            p_mask: vec![],
            paragraph_len: 0,
            start_position: None,
            end_position: None,
            is_impossible: false,
        };
        assert!(!feature.is_max_context(5));
        assert!(!feature.is_doc_position(5));
    }
}
