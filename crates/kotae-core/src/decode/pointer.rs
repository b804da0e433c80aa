//! # Pointer-Head Span Decoder
//!
//! XLNet-style decoding: the model emits `start_n_top` start candidates and,
//! for each, `end_n_top` end candidates with joint log-probabilities, plus a
//! scalar null logit at the classification position. Unlike the standard
//! head, the no-answer decision is not made here: the best non-null text is
//! always reported and the minimum null logit is recorded for a global
//! threshold search over the whole dataset.

use std::collections::{HashMap, HashSet};

use crate::decode::{
    detokenize, features_by_example, realign, result_for, results_by_id, softmax, DecodeConfig,
    DecodeOutput,
};
use crate::error::{KotaeError, Result};
use crate::types::{Example, Feature, NbestEntry, NbestPrediction, PrelimPrediction, RawResult};

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

fn decode_example(
    example: &Example,
    features: &[&Feature],
    by_id: &HashMap<u64, &RawResult>,
    config: &DecodeConfig,
    output: &mut DecodeOutput,
) -> Result<()> {
    let mut prelim: Vec<PrelimPrediction> = Vec::new();
    let mut score_null = 1_000_000.0f32;

    for (feature_index, feature) in features.iter().enumerate() {
        let result = result_for(by_id, feature.unique_id)?;
        let RawResult::Pointer(result) = result else {
            return Err(KotaeError::ResultFamilyMismatch {
                unique_id: feature.unique_id,
            });
        };

        score_null = score_null.min(result.cls_logit);

        if feature.paragraph_len == 0 {
            continue;
        }

        let start_n = config
            .start_n_top
            .min(result.start_top_index.len())
            .min(result.start_top_log_probs.len());
        for i in 0..start_n {
            let start_log_prob = result.start_top_log_probs[i];
            let start_index = result.start_top_index[i];

            for j in 0..config.end_n_top {
                let j_index = i * config.end_n_top + j;
                if j_index >= result.end_top_index.len()
                    || j_index >= result.end_top_log_probs.len()
                {
                    break;
                }
                let end_log_prob = result.end_top_log_probs[j_index];
                let end_index = result.end_top_index[j_index];

                // The shortlist is already bounded; only structural checks
                // remain. The last document position is the separator side
                // of the chunk, hence the `paragraph_len - 1` bound.
                if start_index + 1 >= feature.paragraph_len || end_index + 1 >= feature.paragraph_len
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
                    start_score: start_log_prob,
                    end_score: end_log_prob,
                });
            }
        }
    }

    prelim.sort_by(|a, b| b.score().total_cmp(&a.score()));

    let mut seen: HashSet<String> = HashSet::new();
    let mut nbest: Vec<NbestPrediction> = Vec::new();
    for pred in &prelim {
        if nbest.len() >= config.n_best_size {
            break;
        }
        let feature = features[pred.feature_index];
        let (Some(&orig_doc_start), Some(&orig_doc_end)) = (
            feature.token_to_orig_map.get(&pred.start_index),
            feature.token_to_orig_map.get(&pred.end_index),
        ) else {
            continue;
        };
        let tok_text = detokenize(&feature.tokens[pred.start_index..=pred.end_index]);
        let orig_text = example.doc_tokens[orig_doc_start..=orig_doc_end].join(" ");
        let text = realign(&tok_text, &orig_text, config.lower_case);
        if seen.contains(&text) {
            continue;
        }
        seen.insert(text.clone());
        nbest.push(NbestPrediction {
            text,
            start_score: pred.start_score,
            end_score: pred.end_score,
        });
    }

    if nbest.is_empty() {
        nbest.push(NbestPrediction {
            text: String::new(),
            start_score: -1e6,
            end_score: -1e6,
        });
    }

    let total_scores: Vec<f32> = nbest.iter().map(|e| e.start_score + e.end_score).collect();
    let probs = softmax(&total_scores);

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

    // Always report the best candidate; the threshold search over the
    // recorded null odds decides no-answer later.
    let qas_id = example.qas_id.clone();
    output.null_odds.insert(qas_id.clone(), score_null);
    output
        .predictions
        .insert(qas_id.clone(), nbest[0].text.clone());
    output.nbest.insert(qas_id, entries);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{FeatureBuilder, FeatureConfig};
    use crate::test_util::{doc_tokens, FakeTokenizer};
    use crate::types::{ModelFamily, PointerResult, StandardResult};

    fn build(examples: &[Example]) -> Vec<Feature> {
        let tokenizer = FakeTokenizer::new();
        let config = FeatureConfig::new()
            .with_family(ModelFamily::Pointer)
            .with_max_seq_length(32);
        FeatureBuilder::new(&tokenizer, config).build(examples).unwrap()
    }

    fn leader_example() -> Example {
        Example::new(
            "q1",
            "Who was the leader?",
            doc_tokens(&["The", "leader", "was", "John", "Smith"]),
        )
    }

    fn pointer_result(unique_id: u64, cls_logit: f32) -> RawResult {
        // Two start candidates: "john" (doc position 3) and "leader" (1);
        // two end candidates each, row-major.
        RawResult::Pointer(PointerResult {
            unique_id,
            start_top_log_probs: vec![-0.1, -1.0],
            start_top_index: vec![3, 1],
            end_top_log_probs: vec![-0.2, -2.0, -0.5, -3.0],
            end_top_index: vec![3, 2, 1, 2],
            cls_logit,
        })
    }

    fn config() -> DecodeConfig {
        DecodeConfig::new()
            .with_family(ModelFamily::Pointer)
            .with_top_sizes(2, 2)
    }

    #[test]
    fn reports_best_joint_candidate() {
        let example = leader_example();
        let features = build(std::slice::from_ref(&example));
        let results = vec![pointer_result(features[0].unique_id, 4.0)];

        let output = decode(&[example], &features, &results, &config()).unwrap();
        // Doc-first layout: doc position 3 is "john".
        assert_eq!(output.predictions["q1"], "John");
        let nbest = &output.nbest["q1"];
        assert_eq!(nbest[0].text, "John");
        let total: f64 = nbest.iter().map(|e| e.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn null_odds_track_minimum_cls_logit() {
        let first = leader_example();
        let second = Example::new(
            "q2",
            "Who was the leader?",
            doc_tokens(&["The", "leader", "was", "Jane", "Doe"]),
        );
        let features = build(&[first.clone(), second.clone()]);
        let results = vec![
            pointer_result(features[0].unique_id, 4.0),
            pointer_result(features[1].unique_id, -2.5),
        ];

        let output = decode(&[first, second], &features, &results, &config()).unwrap();
        assert!((output.null_odds["q1"] - 4.0).abs() < 1e-6);
        assert!((output.null_odds["q2"] + 2.5).abs() < 1e-6);
        // Best non-null is always reported, never "".
        assert!(!output.predictions["q2"].is_empty());
    }

    #[test]
    fn spans_touching_last_doc_position_are_rejected() {
        let example = leader_example();
        let features = build(std::slice::from_ref(&example));
        // paragraph_len is 5; position 4 ("smith") sits at the bound.
        let results = vec![RawResult::Pointer(PointerResult {
            unique_id: features[0].unique_id,
            start_top_log_probs: vec![-0.1],
            start_top_index: vec![4],
            end_top_log_probs: vec![-0.1],
            end_top_index: vec![4],
            cls_logit: 0.0,
        })];

        let output = decode(&[example], &features, &results, &config()).unwrap();
        // No valid span survives; the placeholder keeps the output shaped.
        assert_eq!(output.predictions["q1"], "");
        assert_eq!(output.nbest["q1"].len(), 1);
    }

    #[test]
    fn standard_results_are_rejected() {
        let example = leader_example();
        let features = build(std::slice::from_ref(&example));
        let results = vec![RawResult::Standard(StandardResult {
            unique_id: features[0].unique_id,
            start_logits: vec![0.0; 32],
            end_logits: vec![0.0; 32],
        })];

        let err = decode(&[example], &features, &results, &config()).unwrap_err();
        assert!(matches!(err, KotaeError::ResultFamilyMismatch { .. }));
    }
}
