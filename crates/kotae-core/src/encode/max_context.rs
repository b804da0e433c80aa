//! # Max-Context Resolution
//!
//! With sliding-window chunking a document sub-token can appear in several
//! overlapping chunks. Only one chunk should contribute that token's score:
//! the one where the token has the most surrounding context.

use crate::types::DocSpan;

/// Returns `true` if `doc_spans[cur_span_index]` is the max-context owner of
/// the document sub-token at `position`.
///
/// The owner is the covering span maximizing
/// `min(left_context, right_context) + 0.01 * span_length`. For example, with
///
/// ```text
/// Doc:    the man went to the store and bought a gallon of milk
/// Span A: the man went to the
/// Span B: to the store and bought
/// Span C: and bought a gallon of
/// ```
///
/// the token `bought` scores 4 left / 0 right in span B but 1 left / 3 right
/// in span C, so span C owns it. The span-length term nudges ties toward the
/// longer span; remaining ties go to the first-enumerated span (strict `>`).
pub fn is_max_context(doc_spans: &[DocSpan], cur_span_index: usize, position: usize) -> bool {
    let mut best_score = f32::NEG_INFINITY;
    let mut best_span_index = None;
    for (span_index, span) in doc_spans.iter().enumerate() {
        if !span.contains(position) {
            continue;
        }
        let left_context = position - span.start;
        let right_context = span.end() - position;
        let score = left_context.min(right_context) as f32 + 0.01 * span.length as f32;
        if score > best_score {
            best_score = score;
            best_span_index = Some(span_index);
        }
    }
    best_span_index == Some(cur_span_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(raw: &[(usize, usize)]) -> Vec<DocSpan> {
        raw.iter()
            .map(|&(start, length)| DocSpan { start, length })
            .collect()
    }

    #[test]
    fn later_span_owns_right_edge_token() {
        // "bought" is position 7: span B (2..=6)? no. Spans as in the doc
        // comment: A=0..5, B=3..8, C=6..11.
        let doc_spans = spans(&[(0, 5), (3, 5), (6, 5)]);
        assert!(!is_max_context(&doc_spans, 1, 7));
        assert!(is_max_context(&doc_spans, 2, 7));
    }

    #[test]
    fn non_covering_span_never_owns() {
        let doc_spans = spans(&[(0, 5), (5, 5)]);
        assert!(!is_max_context(&doc_spans, 1, 2));
        assert!(is_max_context(&doc_spans, 0, 2));
    }

    #[test]
    fn every_covered_position_has_exactly_one_owner() {
        // Heavily overlapping windows over a 40-token document.
        let doc_spans = spans(&[(0, 16), (8, 16), (16, 16), (24, 16)]);
        for position in 0..40 {
            let covered = doc_spans.iter().any(|s| s.contains(position));
            let owners = (0..doc_spans.len())
                .filter(|&i| is_max_context(&doc_spans, i, position))
                .count();
            if covered {
                assert_eq!(owners, 1, "position {position} has {owners} owners");
            } else {
                assert_eq!(owners, 0);
            }
        }
    }

    #[test]
    fn tie_resolves_to_first_enumerated_span() {
        // Identical spans: strict > keeps the first.
        let doc_spans = spans(&[(0, 4), (0, 4)]);
        assert!(is_max_context(&doc_spans, 0, 2));
        assert!(!is_max_context(&doc_spans, 1, 2));
    }
}
