//! SQuAD exact-match and F1 scoring, with the no-answer threshold search
//! used for v2.0-style datasets.

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::scoring::dataset::Dataset;

static ARTICLES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(a|an|the)\b").expect("static pattern"));

/// Canonical answer form: lowercase, strip ASCII punctuation, drop English
/// articles, collapse whitespace.
pub fn normalize_answer(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_punc: String = lowered.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    let no_articles = ARTICLES.replace_all(&no_punc, " ");
    no_articles.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn get_tokens(text: &str) -> Vec<String> {
    normalize_answer(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Exact match after normalization: 1.0 or 0.0.
pub fn compute_exact(gold: &str, pred: &str) -> f64 {
    if normalize_answer(gold) == normalize_answer(pred) {
        1.0
    } else {
        0.0
    }
}

/// Token-level F1 between the normalized answers. When either side is empty
/// (a no-answer), F1 degenerates to exact match.
pub fn compute_f1(gold: &str, pred: &str) -> f64 {
    let gold_tokens = get_tokens(gold);
    let pred_tokens = get_tokens(pred);
    if gold_tokens.is_empty() || pred_tokens.is_empty() {
        return if gold_tokens == pred_tokens { 1.0 } else { 0.0 };
    }

    let mut gold_counts: HashMap<&str, usize> = HashMap::new();
    for token in &gold_tokens {
        *gold_counts.entry(token).or_insert(0) += 1;
    }
    let mut num_same = 0usize;
    for token in &pred_tokens {
        if let Some(count) = gold_counts.get_mut(token.as_str()) {
            if *count > 0 {
                *count -= 1;
                num_same += 1;
            }
        }
    }
    if num_same == 0 {
        return 0.0;
    }
    let precision = num_same as f64 / pred_tokens.len() as f64;
    let recall = num_same as f64 / gold_tokens.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// Per-question exact and F1 scores, each the maximum over the gold answers.
/// Questions with no normalizable gold answer score against the empty string.
/// Questions missing from `predictions` are skipped with a warning.
pub fn get_raw_scores(
    dataset: &Dataset,
    predictions: &IndexMap<String, String>,
) -> (HashMap<String, f64>, HashMap<String, f64>) {
    let mut exact_scores = HashMap::new();
    let mut f1_scores = HashMap::new();
    for qa in dataset.qas() {
        let mut gold_answers: Vec<&str> = qa
            .answers
            .iter()
            .map(|a| a.text.as_str())
            .filter(|text| !normalize_answer(text).is_empty())
            .collect();
        if gold_answers.is_empty() {
            gold_answers.push("");
        }
        let Some(pred) = predictions.get(&qa.id) else {
            warn!(qas_id = %qa.id, "missing prediction");
            continue;
        };
        let exact = gold_answers
            .iter()
            .map(|gold| compute_exact(gold, pred))
            .fold(0.0, f64::max);
        let f1 = gold_answers
            .iter()
            .map(|gold| compute_f1(gold, pred))
            .fold(0.0, f64::max);
        exact_scores.insert(qa.id.clone(), exact);
        f1_scores.insert(qa.id.clone(), f1);
    }
    (exact_scores, f1_scores)
}

/// Question id → whether it has at least one non-empty gold answer.
pub fn make_qid_to_has_ans(dataset: &Dataset) -> HashMap<String, bool> {
    dataset
        .qas()
        .map(|qa| {
            let has_ans = qa
                .answers
                .iter()
                .any(|a| !normalize_answer(&a.text).is_empty());
            (qa.id.clone(), has_ans)
        })
        .collect()
}

/// Re-score with a fixed no-answer threshold: any question whose null odds
/// exceed the threshold is treated as predicted-unanswerable.
pub fn apply_no_answer_threshold(
    scores: &HashMap<String, f64>,
    null_odds: &IndexMap<String, f32>,
    qid_to_has_ans: &HashMap<String, bool>,
    threshold: f32,
) -> HashMap<String, f64> {
    scores
        .iter()
        .map(|(qid, &score)| {
            let pred_na = null_odds.get(qid).is_some_and(|&odds| odds > threshold);
            let adjusted = if pred_na {
                if qid_to_has_ans.get(qid).copied().unwrap_or(false) {
                    0.0
                } else {
                    1.0
                }
            } else {
                score
            };
            (qid.clone(), adjusted)
        })
        .collect()
}

/// Result of the best-threshold search.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ThresholdSearch {
    /// Best achievable score (percentage) over all thresholds.
    pub score: f64,
    /// The null-odds value achieving it.
    pub threshold: f32,
    /// Mean raw score over the answerable questions, threshold-independent.
    pub has_answer_score: f64,
}

/// Sweep the no-answer threshold over the observed null odds and report the
/// best dataset-level score. Starts from the everything-is-null baseline and
/// walks the questions in ascending null-odds order, flipping one question
/// to "answered" at a time.
pub fn find_best_threshold(
    predictions: &IndexMap<String, String>,
    scores: &HashMap<String, f64>,
    null_odds: &IndexMap<String, f32>,
    qid_to_has_ans: &HashMap<String, bool>,
) -> ThresholdSearch {
    let num_no_ans = qid_to_has_ans.values().filter(|has| !**has).count() as f64;

    let mut qid_list: Vec<&String> = null_odds.keys().collect();
    qid_list.sort_by(|a, b| null_odds[*a].total_cmp(&null_odds[*b]));

    let mut cur_score = num_no_ans;
    let mut best_score = cur_score;
    let mut best_thresh = 0.0f32;
    for qid in &qid_list {
        let Some(&score) = scores.get(*qid) else {
            continue;
        };
        let diff = if qid_to_has_ans.get(*qid).copied().unwrap_or(false) {
            score
        } else if predictions.get(*qid).is_some_and(|p| !p.is_empty()) {
            -1.0
        } else {
            0.0
        };
        cur_score += diff;
        if cur_score > best_score {
            best_score = cur_score;
            best_thresh = null_odds[*qid];
        }
    }

    let mut has_ans_score = 0.0;
    let mut has_ans_count = 0usize;
    for qid in &qid_list {
        if !qid_to_has_ans.get(*qid).copied().unwrap_or(false) {
            continue;
        }
        has_ans_count += 1;
        if let Some(&score) = scores.get(*qid) {
            has_ans_score += score;
        }
    }

    ThresholdSearch {
        score: 100.0 * best_score / scores.len() as f64,
        threshold: best_thresh,
        has_answer_score: if has_ans_count == 0 {
            0.0
        } else {
            has_ans_score / has_ans_count as f64
        },
    }
}

/// Dataset-level evaluation summary.
#[derive(Debug, Clone, Serialize)]
pub struct EvalMetrics {
    /// Mean exact-match score, percentage.
    pub exact: f64,
    /// Mean token F1, percentage.
    pub f1: f64,
    /// Number of scored questions.
    pub total: usize,
    /// Threshold search results, present when null odds were supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_exact: Option<ThresholdSearch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_f1: Option<ThresholdSearch>,
}

/// Score predictions against a dataset. When `null_odds` is given the best
/// no-answer thresholds for exact match and F1 are searched as well.
pub fn evaluate(
    dataset: &Dataset,
    predictions: &IndexMap<String, String>,
    null_odds: Option<&IndexMap<String, f32>>,
) -> EvalMetrics {
    let (exact_scores, f1_scores) = get_raw_scores(dataset, predictions);
    let total = exact_scores.len();
    let mean = |scores: &HashMap<String, f64>| {
        if scores.is_empty() {
            0.0
        } else {
            100.0 * scores.values().sum::<f64>() / scores.len() as f64
        }
    };

    let (best_exact, best_f1) = match null_odds {
        Some(null_odds) => {
            let qid_to_has_ans = make_qid_to_has_ans(dataset);
            (
                Some(find_best_threshold(
                    predictions,
                    &exact_scores,
                    null_odds,
                    &qid_to_has_ans,
                )),
                Some(find_best_threshold(
                    predictions,
                    &f1_scores,
                    null_odds,
                    &qid_to_has_ans,
                )),
            )
        }
        None => (None, None),
    };

    EvalMetrics {
        exact: mean(&exact_scores),
        f1: mean(&f1_scores),
        total,
        best_exact,
        best_f1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::dataset::{Answer, Article, Paragraph, QuestionAnswer};

    fn qa(id: &str, answers: &[&str], is_impossible: bool) -> QuestionAnswer {
        QuestionAnswer {
            id: id.to_string(),
            question: String::from("?"),
            answers: answers
                .iter()
                .map(|text| Answer {
                    text: text.to_string(),
                    answer_start: 0,
                })
                .collect(),
            is_impossible,
        }
    }

    fn dataset(qas: Vec<QuestionAnswer>) -> Dataset {
        Dataset {
            version: Some("v2.0".to_string()),
            data: vec![Article {
                title: String::new(),
                paragraphs: vec![Paragraph {
                    context: String::new(),
                    qas,
                }],
            }],
        }
    }

    #[test]
    fn normalize_strips_articles_punctuation_and_case() {
        assert_eq!(normalize_answer("The Japan."), "japan");
        assert_eq!(normalize_answer("an  apple, a day"), "apple day");
        assert_eq!(normalize_answer("..."), "");
    }

    #[test]
    fn exact_match_ignores_normalization_differences() {
        assert!((compute_exact("The Japan.", "japan") - 1.0).abs() < 1e-12);
        assert!(compute_exact("Japan", "China") < 0.5);
    }

    #[test]
    fn f1_counts_token_overlap() {
        assert!((compute_f1("the japan", "Japan") - 1.0).abs() < 1e-12);
        // One of two predicted tokens matches one of two gold tokens.
        let f1 = compute_f1("john smith", "john doe");
        assert!((f1 - 0.5).abs() < 1e-12);
        assert_eq!(compute_f1("japan", "china"), 0.0);
    }

    #[test]
    fn f1_of_empty_answers_is_exact_match() {
        assert!((compute_f1("", "") - 1.0).abs() < 1e-12);
        assert_eq!(compute_f1("", "japan"), 0.0);
        assert_eq!(compute_f1("japan", ""), 0.0);
    }

    #[test]
    fn f1_is_symmetric() {
        let a = compute_f1("the quick brown fox", "quick fox");
        let b = compute_f1("quick fox", "the quick brown fox");
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn raw_scores_take_best_gold_answer() {
        let dataset = dataset(vec![qa("q1", &["John Smith", "Smith"], false)]);
        let mut predictions = IndexMap::new();
        predictions.insert("q1".to_string(), "Smith".to_string());
        let (exact, f1) = get_raw_scores(&dataset, &predictions);
        assert!((exact["q1"] - 1.0).abs() < 1e-12);
        assert!((f1["q1"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unanswerable_scores_against_empty_string() {
        let dataset = dataset(vec![qa("q1", &[], true)]);
        let mut predictions = IndexMap::new();
        predictions.insert("q1".to_string(), String::new());
        let (exact, _) = get_raw_scores(&dataset, &predictions);
        assert!((exact["q1"] - 1.0).abs() < 1e-12);

        predictions.insert("q1".to_string(), "guess".to_string());
        let (exact, _) = get_raw_scores(&dataset, &predictions);
        assert_eq!(exact["q1"], 0.0);
    }

    #[test]
    fn missing_predictions_are_skipped() {
        let dataset = dataset(vec![qa("q1", &["x"], false), qa("q2", &["y"], false)]);
        let mut predictions = IndexMap::new();
        predictions.insert("q1".to_string(), "x".to_string());
        let (exact, f1) = get_raw_scores(&dataset, &predictions);
        assert_eq!(exact.len(), 1);
        assert_eq!(f1.len(), 1);
    }

    #[test]
    fn threshold_search_finds_separating_value() {
        // Two answerable questions predicted correctly with low null odds,
        // one unanswerable predicted non-empty with high null odds. Cutting
        // between them scores all three.
        let dataset = dataset(vec![
            qa("a1", &["right"], false),
            qa("a2", &["also right"], false),
            qa("n1", &[], true),
        ]);
        let mut predictions = IndexMap::new();
        predictions.insert("a1".to_string(), "right".to_string());
        predictions.insert("a2".to_string(), "also right".to_string());
        predictions.insert("n1".to_string(), "wrong guess".to_string());
        let mut null_odds = IndexMap::new();
        null_odds.insert("a1".to_string(), -4.0f32);
        null_odds.insert("a2".to_string(), -2.0f32);
        null_odds.insert("n1".to_string(), 5.0f32);

        let (exact, _) = get_raw_scores(&dataset, &predictions);
        let qid_to_has_ans = make_qid_to_has_ans(&dataset);
        let search = find_best_threshold(&predictions, &exact, &null_odds, &qid_to_has_ans);

        // Baseline (all null) = 1; +1 at a1, +1 at a2, -1 at n1. Best is 3
        // at threshold -2.0, i.e. 100%.
        assert!((search.score - 100.0).abs() < 1e-9);
        assert!((search.threshold + 2.0).abs() < 1e-6);
        assert!((search.has_answer_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fixed_threshold_rescoring() {
        let dataset = dataset(vec![qa("a1", &["right"], false), qa("n1", &[], true)]);
        let mut predictions = IndexMap::new();
        predictions.insert("a1".to_string(), "right".to_string());
        predictions.insert("n1".to_string(), "wrong".to_string());
        let mut null_odds = IndexMap::new();
        null_odds.insert("a1".to_string(), -1.0f32);
        null_odds.insert("n1".to_string(), 3.0f32);

        let (exact, _) = get_raw_scores(&dataset, &predictions);
        let qid_to_has_ans = make_qid_to_has_ans(&dataset);
        let adjusted = apply_no_answer_threshold(&exact, &null_odds, &qid_to_has_ans, 0.0);
        assert!((adjusted["a1"] - 1.0).abs() < 1e-12);
        // n1 flips to predicted-null, which is correct for an unanswerable.
        assert!((adjusted["n1"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn evaluate_reports_means_and_thresholds() {
        let dataset = dataset(vec![qa("a1", &["right"], false), qa("a2", &["miss"], false)]);
        let mut predictions = IndexMap::new();
        predictions.insert("a1".to_string(), "right".to_string());
        predictions.insert("a2".to_string(), "other".to_string());

        let metrics = evaluate(&dataset, &predictions, None);
        assert!((metrics.exact - 50.0).abs() < 1e-9);
        assert_eq!(metrics.total, 2);
        assert!(metrics.best_exact.is_none());

        let mut null_odds = IndexMap::new();
        null_odds.insert("a1".to_string(), 0.0f32);
        null_odds.insert("a2".to_string(), 0.0f32);
        let metrics = evaluate(&dataset, &predictions, Some(&null_odds));
        assert!(metrics.best_exact.is_some());
        assert!(metrics.best_f1.is_some());
    }
}
