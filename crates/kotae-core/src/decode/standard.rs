//! # Standard-Head Span Decoder
//!
//! BERT/XLM style decoding: the model emits one start logit and one end
//! logit per token position. Candidate spans come from the cross product of
//! the per-feature n-best start and end shortlists; the null answer is scored
//! at the classification position and decided per example against a fixed
//! threshold.

use std::collections::{HashMap, HashSet};

use crate::decode::{
    best_indexes, detokenize, features_by_example, realign, result_for, results_by_id, softmax,
    DecodeConfig, DecodeOutput,
};
use crate::error::{KotaeError, Result};
use crate::types::{
    Example, Feature, NbestEntry, NbestPrediction, PrelimPrediction, RawResult, StandardResult,
};

pub(crate) fn decode(
    examples: &[Example],
    features: &[Feature],
    results: &[RawResult],
    config: &DecodeConfig,
) -> Result<DecodeOutput> {
    if examples.is_empty() {
        return Err(KotaeError::EmptyExamples);
    }

    let grouped = features_by_example(features);
    let by_id = results_by_id(results);
    let no_features = Vec::new();

    let mut output = DecodeOutput::default();
    for (example_index, example) in examples.iter().enumerate() {
        let example_features = grouped.get(&example_index).unwrap_or(&no_features);
        decode_example(example, example_features, &by_id, config, &mut output)?;
    }
    Ok(output)
}

/// Null-answer bookkeeping: the feature with the lowest CLS start+end score
/// across the example's chunks represents the no-answer hypothesis.
struct NullScore {
    score: f32,
    feature_index: usize,
    start_logit: f32,
    end_logit: f32,
}

impl NullScore {
    fn new() -> Self {
        Self {
            score: 1_000_000.0,
            feature_index: 0,
            start_logit: 0.0,
            end_logit: 0.0,
        }
    }

    fn observe(&mut self, feature_index: usize, result: &StandardResult) {
        let start = result.start_logits.first().copied().unwrap_or_default();
        let end = result.end_logits.first().copied().unwrap_or_default();
        if start + end < self.score {
            self.score = start + end;
            self.feature_index = feature_index;
            self.start_logit = start;
            self.end_logit = end;
        }
    }
}

fn decode_example(
    example: &Example,
    features: &[&Feature],
    by_id: &HashMap<u64, &RawResult>,
    config: &DecodeConfig,
    output: &mut DecodeOutput,
) -> Result<()> {
    let mut prelim: Vec<PrelimPrediction> = Vec::new();
    let mut null = NullScore::new();

    for (feature_index, feature) in features.iter().enumerate() {
        let result = result_for(by_id, feature.unique_id)?;
        let RawResult::Standard(result) = result else {
            return Err(KotaeError::ResultFamilyMismatch {
                unique_id: feature.unique_id,
            });
        };

        if config.allow_null {
            null.observe(feature_index, result);
        }

        let start_indexes = best_indexes(&result.start_logits, config.n_best_size);
        let end_indexes = best_indexes(&result.end_logits, config.n_best_size);
        for &start_index in &start_indexes {
            for &end_index in &end_indexes {
                // Shortlisted indices may land on query or special tokens,
                // run backwards, or exceed the length bound; none of those
                // are real spans.
                if start_index >= feature.tokens.len() || end_index >= feature.tokens.len() {
                    continue;
                }
                if !feature.token_to_orig_map.contains_key(&start_index)
                    || !feature.token_to_orig_map.contains_key(&end_index)
                {
                    continue;
                }
                if !feature.is_max_context(start_index) {
                    continue;
                }
                if end_index < start_index {
                    continue;
                }
                if end_index - start_index + 1 > config.max_answer_length {
                    continue;
                }
                prelim.push(PrelimPrediction {
                    feature_index,
                    start_index,
                    end_index,
                    start_score: result.start_logits[start_index],
                    end_score: result.end_logits[end_index],
                });
            }
        }
    }

    if config.allow_null {
        prelim.push(PrelimPrediction {
            feature_index: null.feature_index,
            start_index: 0,
            end_index: 0,
            start_score: null.start_logit,
            end_score: null.end_logit,
        });
    }
    prelim.sort_by(|a, b| b.score().total_cmp(&a.score()));

    let mut seen: HashSet<String> = HashSet::new();
    let mut nbest: Vec<NbestPrediction> = Vec::new();
    for pred in &prelim {
        if nbest.len() >= config.n_best_size {
            break;
        }
        // start_index 0 is the CLS slot: the synthesized null prediction.
        let text = if pred.start_index > 0 {
            let Some(text) = materialize(example, features[pred.feature_index], pred, config)
            else {
                continue;
            };
            if seen.contains(&text) {
                continue;
            }
            seen.insert(text.clone());
            text
        } else {
            seen.insert(String::new());
            String::new()
        };
        nbest.push(NbestPrediction {
            text,
            start_score: pred.start_score,
            end_score: pred.end_score,
        });
    }

    if config.allow_null {
        if !seen.contains("") {
            nbest.push(NbestPrediction {
                text: String::new(),
                start_score: null.start_logit,
                end_score: null.end_logit,
            });
        }
        // With a single remaining null candidate, a zero-scored placeholder
        // goes ahead of it. Inherited behavior: downstream indexing and
        // softmax stay well-defined, at the cost of a nonce entry.
        if nbest.len() == 1 {
            nbest.insert(
                0,
                NbestPrediction {
                    text: "empty".into(),
                    start_score: 0.0,
                    end_score: 0.0,
                },
            );
        }
    }

    // No valid candidates at all: synthesize a neutral placeholder so the
    // softmax and serialization below never see an empty collection.
    if nbest.is_empty() {
        nbest.push(NbestPrediction {
            text: "empty".into(),
            start_score: 0.0,
            end_score: 0.0,
        });
    }

    let total_scores: Vec<f32> = nbest.iter().map(|e| e.start_score + e.end_score).collect();
    let probs = softmax(&total_scores);
    let best_non_null = nbest.iter().find(|e| !e.text.is_empty());

    let entries: Vec<NbestEntry> = nbest
        .iter()
        .zip(probs.iter())
        .map(|(entry, prob)| NbestEntry {
            text: entry.text.clone(),
            probability: *prob,
            start_score: entry.start_score,
            end_score: entry.end_score,
        })
        .collect();

    let qas_id = example.qas_id.clone();
    if !config.allow_null {
        output.predictions.insert(qas_id.clone(), nbest[0].text.clone());
    } else {
        match best_non_null {
            Some(best) => {
                // Predict "" iff null score - best non-null score > threshold.
                let score_diff = null.score - best.start_score - best.end_score;
                output.null_odds.insert(qas_id.clone(), score_diff);
                let answer = if score_diff > config.null_score_diff_threshold {
                    String::new()
                } else {
                    best.text.clone()
                };
                output.predictions.insert(qas_id.clone(), answer);
            }
            None => {
                output.null_odds.insert(qas_id.clone(), null.score);
                output.predictions.insert(qas_id.clone(), String::new());
            }
        }
    }
    output.nbest.insert(qas_id, entries);
    Ok(())
}

/// Detokenize the predicted sub-token span and align it back onto the
/// original document text.
fn materialize(
    example: &Example,
    feature: &Feature,
    pred: &PrelimPrediction,
    config: &DecodeConfig,
) -> Option<String> {
    let tok_text = detokenize(&feature.tokens[pred.start_index..=pred.end_index]);
    let orig_doc_start = *feature.token_to_orig_map.get(&pred.start_index)?;
    let orig_doc_end = *feature.token_to_orig_map.get(&pred.end_index)?;
    let orig_text = example.doc_tokens[orig_doc_start..=orig_doc_end].join(" ");
    Some(realign(&tok_text, &orig_text, config.lower_case))
}
