//! BM25 Okapi scoring over a per-query candidate subset.
//!
//! All collection statistics (`N`, `avgdl`, document frequencies) come from the
//! documents handed to [`Bm25::new`], never from a global index.
//!
//! IDF: `ln((N - n_t + 0.5) / (n_t + 0.5) + 1)`.

use crate::expand::ExpandedQuery;
use std::collections::HashMap;

pub struct Bm25<'d> {
    term_freqs: Vec<HashMap<&'d str, u32>>,
    doc_lens: Vec<usize>,
    doc_freq: HashMap<&'d str, u32>,
    avgdl: f64,
    k1: f64,
    b: f64,
}

impl<'d> Bm25<'d> {
    pub fn new<I>(docs: I, k1: f64, b: f64) -> Self
    where
        I: IntoIterator<Item = &'d [String]>,
    {
        let mut term_freqs = Vec::new();
        let mut doc_lens = Vec::new();
        let mut doc_freq: HashMap<&'d str, u32> = HashMap::new();
        for tokens in docs {
            let mut tf: HashMap<&'d str, u32> = HashMap::new();
            for t in tokens {
                *tf.entry(t.as_str()).or_insert(0) += 1;
            }
            for &term in tf.keys() {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
            doc_lens.push(tokens.len());
            term_freqs.push(tf);
        }
        let total: usize = doc_lens.iter().sum();
        let avgdl = if doc_lens.is_empty() { 0.0 } else { total as f64 / doc_lens.len() as f64 };
        Self { term_freqs, doc_lens, doc_freq, avgdl, k1, b }
    }

    pub fn num_docs(&self) -> usize { self.doc_lens.len() }

    pub fn avgdl(&self) -> f64 { self.avgdl }

    pub fn idf(&self, term: &str) -> f64 {
        let n = self.num_docs() as f64;
        let n_t = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        ((n - n_t + 0.5) / (n_t + 0.5) + 1.0).ln()
    }

    /// BM25 contribution of a single query term to document `doc`.
    pub fn term_score(&self, term: &str, doc: usize) -> f64 {
        let tf = self.term_freqs[doc].get(term).copied().unwrap_or(0);
        if tf == 0 {
            return 0.0;
        }
        let tf = tf as f64;
        let dl = self.doc_lens[doc] as f64;
        let norm = self.k1 * (1.0 - self.b + self.b * dl / self.avgdl);
        self.idf(term) * tf * (self.k1 + 1.0) / (tf + norm)
    }

    /// Standard BM25: one score per document, summed over `query` in order.
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        (0..self.num_docs())
            .map(|doc| query.iter().map(|t| self.term_score(t, doc)).sum())
            .collect()
    }

    /// Per-term linear reweighting: `Σ weight(t) · score({t}, D)` in token order.
    ///
    /// Each single-term score is the full BM25 pass for a one-token query over
    /// the same candidate subset; weights do not enter IDF or length normalization.
    pub fn weighted_scores(&self, tokens: &[String], weights: &HashMap<String, f64>) -> Vec<f64> {
        (0..self.num_docs())
            .map(|doc| {
                let mut total = 0.0;
                for t in tokens {
                    let weight = weights.get(t).copied().unwrap_or(1.0);
                    let base = self.term_score(t, doc);
                    if base > 0.0 {
                        tracing::trace!(doc, token = %t, weight, base, weighted = base * weight, "term contribution");
                    }
                    total += weight * base;
                }
                total
            })
            .collect()
    }
}

pub fn score(query_tokens: &[String], docs: &[&[String]], k1: f64, b: f64) -> Vec<f64> {
    Bm25::new(docs.iter().copied(), k1, b).scores(query_tokens)
}

pub fn score_weighted(tokens: &[String], weights: &HashMap<String, f64>, docs: &[&[String]], k1: f64, b: f64) -> Vec<f64> {
    Bm25::new(docs.iter().copied(), k1, b).weighted_scores(tokens, weights)
}

pub fn score_expanded(query: &ExpandedQuery, docs: &[&[String]], k1: f64, b: f64) -> Vec<f64> {
    score_weighted(&query.tokens, &query.weights, docs, k1, b)
}

/// Indices of the top `n` scores, best first; equal scores keep input order.
pub fn rank(scores: &[f64], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(n.max(1));
    order
}
