//! Lexical comparison metrics for RAG answers.
//!
//! Word-level, language-agnostic implementations: BLEU with epsilon
//! smoothing, ROUGE-L F1 over the longest common subsequence, a symmetric
//! token-set surrogate for METEOR, and a BERTScore placeholder pending an
//! embedding backend.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Epsilon substituted for zero n-gram precisions (smoothing method 1).
const BLEU_EPSILON: f64 = 0.1;

/// Computed lexical metrics between an expected and an actual answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagMetrics {
    pub bleu_score: f64,
    pub rouge_l_f1: f64,
    pub meteor_score: f64,
    /// Placeholder until an embedding-based scorer is wired in.
    pub bertscore_f1: f64,
}

/// Compute all metrics for one answer pair.
#[must_use]
pub fn compute_metrics(expected: &str, actual: &str) -> RagMetrics {
    let expected_tokens: Vec<&str> = expected.split_whitespace().collect();
    let actual_tokens: Vec<&str> = actual.split_whitespace().collect();

    RagMetrics {
        bleu_score: bleu(&expected_tokens, &actual_tokens),
        rouge_l_f1: rouge_l_f1(&expected_tokens, &actual_tokens),
        meteor_score: token_set_overlap(&expected_tokens, &actual_tokens),
        bertscore_f1: 0.0,
    }
}

fn ngram_counts<'a>(tokens: &'a [&'a str], n: usize) -> HashMap<&'a [&'a str], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for window in tokens.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}

/// Sentence BLEU against a single reference: up to 4-gram modified
/// precision, uniform weights, brevity penalty, zero precisions smoothed to
/// an epsilon numerator.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bleu(reference: &[&str], candidate: &[&str]) -> f64 {
    if reference.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let max_order = candidate.len().min(4);
    let mut log_precision_sum = 0.0;
    for n in 1..=max_order {
        let reference_counts = ngram_counts(reference, n);
        let candidate_counts = ngram_counts(candidate, n);

        let total: usize = candidate_counts.values().sum();
        let clipped: usize = candidate_counts
            .iter()
            .map(|(ngram, count)| (*count).min(reference_counts.get(ngram).copied().unwrap_or(0)))
            .sum();

        let precision = if clipped == 0 {
            BLEU_EPSILON / total as f64
        } else {
            clipped as f64 / total as f64
        };
        log_precision_sum += precision.ln();
    }
    let geometric_mean = (log_precision_sum / max_order as f64).exp();

    let brevity_penalty = if candidate.len() < reference.len() {
        (1.0 - reference.len() as f64 / candidate.len() as f64).exp()
    } else {
        1.0
    };

    brevity_penalty * geometric_mean
}

fn lcs_length(a: &[&str], b: &[&str]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for token_a in a {
        for (j, token_b) in b.iter().enumerate() {
            curr[j + 1] = if token_a == token_b {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// ROUGE-L F1 via word-level longest common subsequence.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rouge_l_f1(reference: &[&str], candidate: &[&str]) -> f64 {
    if reference.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let lcs = lcs_length(reference, candidate) as f64;
    if lcs == 0.0 {
        return 0.0;
    }
    let precision = lcs / candidate.len() as f64;
    let recall = lcs / reference.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// Symmetric token-set overlap: `2 * |ref ∩ cand| / (|ref| + |cand|)` over
/// unique tokens. Stands in for METEOR.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn token_set_overlap(reference: &[&str], candidate: &[&str]) -> f64 {
    let reference: std::collections::HashSet<&str> = reference.iter().copied().collect();
    let candidate: std::collections::HashSet<&str> = candidate.iter().copied().collect();
    if reference.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let overlap = reference.intersection(&candidate).count() as f64;
    2.0 * overlap / (reference.len() + candidate.len()) as f64
}
