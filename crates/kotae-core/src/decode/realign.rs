//! # Text Re-alignment
//!
//! Detokenization normalizes case, accents and whitespace, so a predicted
//! span cannot be sliced directly out of the original document. This module
//! maps the normalized prediction back onto the verbatim original substring
//! through a space-stripped character alignment. Best effort by contract:
//! whenever the alignment cannot be established, the untouched original
//! substring is returned.

use std::collections::BTreeMap;

use tracing::debug;

use crate::tokenize::BasicTokenizer;

/// Project `pred_text` (normalized, detokenized) back onto `orig_text`
/// (the verbatim original-token span). `lower_case` must match the subword
/// tokenizer's casing mode.
///
/// Example: for `pred_text = "steve smith"` over `orig_text = "Steve
/// Smith's"`, the aligned answer is `"Steve Smith"` — neither the normalized
/// prediction nor the over-inclusive original span.
pub fn realign(pred_text: &str, orig_text: &str, lower_case: bool) -> String {
    let tokenizer = BasicTokenizer::new(lower_case);
    let tok_text = tokenizer.tokenize(orig_text).join(" ");

    let tok_chars: Vec<char> = tok_text.chars().collect();
    let pred_chars: Vec<char> = pred_text.chars().collect();
    let Some(start_position) = find_subsequence(&tok_chars, &pred_chars) else {
        debug!(pred = pred_text, orig = orig_text, "prediction not found in normalized text");
        return orig_text.to_string();
    };
    let end_position = start_position + pred_chars.len() - 1;

    let orig_chars: Vec<char> = orig_text.chars().collect();
    let (orig_ns_chars, orig_ns_to_s) = strip_spaces(&orig_chars);
    let (tok_ns_chars, tok_ns_to_s) = strip_spaces(&tok_chars);

    // If the space-stripped strings differ, the normalization changed more
    // than spacing and characters cannot be aligned one-to-one.
    if orig_ns_chars.len() != tok_ns_chars.len() {
        debug!(
            pred = pred_text,
            orig = orig_text,
            "length mismatch after stripping spaces"
        );
        return orig_text.to_string();
    }

    let tok_s_to_ns: BTreeMap<usize, usize> =
        tok_ns_to_s.iter().map(|(&ns, &s)| (s, ns)).collect();

    let orig_start = tok_s_to_ns
        .get(&start_position)
        .and_then(|ns| orig_ns_to_s.get(ns));
    let orig_end = tok_s_to_ns
        .get(&end_position)
        .and_then(|ns| orig_ns_to_s.get(ns));

    match (orig_start, orig_end) {
        (Some(&start), Some(&end)) => orig_chars[start..=end].iter().collect(),
        _ => {
            debug!(pred = pred_text, orig = orig_text, "could not map span endpoints");
            orig_text.to_string()
        }
    }
}

/// Drop spaces, keeping a map from each stripped-character index to its
/// index in the space-containing text.
fn strip_spaces(chars: &[char]) -> (Vec<char>, BTreeMap<usize, usize>) {
    let mut ns_chars = Vec::with_capacity(chars.len());
    let mut ns_to_s = BTreeMap::new();
    for (i, c) in chars.iter().enumerate() {
        if *c == ' ' {
            continue;
        }
        ns_to_s.insert(ns_chars.len(), i);
        ns_chars.push(*c);
    }
    (ns_chars, ns_to_s)
}

/// First occurrence of `needle` in `haystack`, as a character offset.
fn find_subsequence(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_possessive_suffix() {
        assert_eq!(realign("steve smith", "Steve Smith's", true), "Steve Smith");
    }

    #[test]
    fn exact_match_passes_through() {
        assert_eq!(realign("john smith", "John Smith", true), "John Smith");
    }

    #[test]
    fn missing_prediction_falls_back_to_original() {
        assert_eq!(realign("queen victoria", "John Smith's", true), "John Smith's");
    }

    #[test]
    fn stripped_length_mismatch_falls_back_to_original() {
        // Lowercasing strips the accent, so the stripped strings differ in
        // content length only when normalization drops characters entirely.
        assert_eq!(realign("cafe", "Caf\u{e9}\u{30a}\u{30a}", true), "Caf\u{e9}\u{30a}\u{30a}");
    }

    #[test]
    fn cased_mode_keeps_case() {
        assert_eq!(realign("John Smith", "John Smith (1895).", false), "John Smith");
    }
}
