//! Grid search over BM25 parameters.
//!
//! Configurations are enumerated as the Cartesian product of the grid's axes in
//! declaration order, last axis varying fastest. Evaluations may run in
//! parallel, but results are reported and the best run is chosen in
//! enumeration order: a later configuration only replaces the best when its
//! accuracy is strictly higher.

use crate::error::{Error, Result};
use crate::retrieve::Retriever;
use crate::types::{AnswerSet, GroundTruthSet, ParamSet, Query, TuningResult};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub enum GridAxis {
    K1(Vec<f64>),
    B(Vec<f64>),
    N(Vec<usize>),
}

impl GridAxis {
    fn name(&self) -> &'static str {
        match self {
            GridAxis::K1(_) => "k1",
            GridAxis::B(_) => "b",
            GridAxis::N(_) => "n",
        }
    }

    fn len(&self) -> usize {
        match self {
            GridAxis::K1(v) | GridAxis::B(v) => v.len(),
            GridAxis::N(v) => v.len(),
        }
    }

    fn assign(&self, i: usize, params: &mut ParamSet) {
        match self {
            GridAxis::K1(v) => params.k1 = v[i],
            GridAxis::B(v) => params.b = v[i],
            GridAxis::N(v) => params.n = v[i],
        }
    }

    fn validate(&self) -> Result<()> {
        let bad = |why: String| Err(Error::InvalidParamGrid(why));
        if self.len() == 0 {
            return bad(format!("{} has no values", self.name()));
        }
        match self {
            GridAxis::K1(v) => {
                if let Some(x) = v.iter().find(|x| !x.is_finite() || **x < 0.0) {
                    return bad(format!("k1 must be >= 0, got {x}"));
                }
            }
            GridAxis::B(v) => {
                if let Some(x) = v.iter().find(|x| !(0.0..=1.0).contains(*x)) {
                    return bad(format!("b must be in [0, 1], got {x}"));
                }
            }
            GridAxis::N(v) => {
                if v.contains(&0) {
                    return bad("n must be >= 1".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Ordered parameter axes; every one of `k1`, `b` and `n` appears exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    axes: Vec<GridAxis>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            axes: vec![
                GridAxis::K1(vec![0.5, 1.5]),
                GridAxis::B(vec![0.25, 0.75]),
                GridAxis::N(vec![1, 2]),
            ],
        }
    }
}

impl ParamGrid {
    pub fn new(axes: Vec<GridAxis>) -> Result<Self> {
        for name in ["k1", "b", "n"] {
            let count = axes.iter().filter(|a| a.name() == name).count();
            if count != 1 {
                return Err(Error::InvalidParamGrid(format!("{name} must appear exactly once, found {count}")));
            }
        }
        for axis in &axes {
            axis.validate()?;
        }
        Ok(Self { axes })
    }

    /// Build from the `param_grid` object, keeping its key order.
    pub fn from_json(grid: &Value) -> Result<Self> {
        let obj = grid
            .as_object()
            .ok_or_else(|| Error::InvalidParamGrid("param_grid must be an object".to_string()))?;
        let mut axes = Vec::with_capacity(obj.len());
        for (key, values) in obj {
            let parse_err = |e: serde_json::Error| Error::InvalidParamGrid(format!("{key}: {e}"));
            let axis = match key.as_str() {
                "k1" => GridAxis::K1(serde_json::from_value(values.clone()).map_err(parse_err)?),
                "b" => GridAxis::B(serde_json::from_value(values.clone()).map_err(parse_err)?),
                "n" => GridAxis::N(serde_json::from_value(values.clone()).map_err(parse_err)?),
                other => return Err(Error::InvalidParamGrid(format!("unknown parameter {other}"))),
            };
            axes.push(axis);
        }
        Self::new(axes)
    }

    pub fn axes(&self) -> &[GridAxis] { &self.axes }

    /// Number of configurations.
    pub fn len(&self) -> usize {
        self.axes.iter().map(GridAxis::len).product()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// The `index`-th configuration in enumeration order.
    pub fn params_at(&self, index: usize) -> ParamSet {
        let mut params = ParamSet::default();
        let mut rem = index;
        for axis in self.axes.iter().rev() {
            let len = axis.len();
            axis.assign(rem % len, &mut params);
            rem /= len;
        }
        params
    }

    pub fn iter(&self) -> impl Iterator<Item = ParamSet> + '_ {
        (0..self.len()).map(move |i| self.params_at(i))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The first failing configuration (in enumeration order) aborts the search.
    /// Configurations enumerated after a known failure are not evaluated.
    #[default]
    Abort,
    /// Failing configurations are logged and left out of the results.
    SkipConfiguration,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub index: usize,
    pub params: ParamSet,
    pub accuracy: f64,
    pub answers: AnswerSet,
}

/// Best configuration seen so far. Starts at accuracy 0 with no configuration.
#[derive(Debug, Clone, Default)]
pub struct BestRun {
    pub index: Option<usize>,
    pub params: Option<ParamSet>,
    pub accuracy: f64,
    pub answers: Option<AnswerSet>,
}

impl BestRun {
    /// Combine two partial results. The higher accuracy wins; among equal
    /// accuracies the earlier enumeration index wins. Accuracy 0 never
    /// displaces the empty initial state.
    pub fn merge(self, other: BestRun) -> BestRun {
        match (self.index, other.index) {
            (_, None) => self,
            (None, Some(_)) => {
                if other.accuracy > self.accuracy { other } else { self }
            }
            (Some(a), Some(b)) => {
                if other.accuracy > self.accuracy || (other.accuracy == self.accuracy && b < a) {
                    other
                } else {
                    self
                }
            }
        }
    }

    pub fn offer(self, eval: Evaluation) -> BestRun {
        self.merge(BestRun::from(eval))
    }
}

impl From<Evaluation> for BestRun {
    fn from(eval: Evaluation) -> Self {
        Self { index: Some(eval.index), params: Some(eval.params), accuracy: eval.accuracy, answers: Some(eval.answers) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TuningOutcome {
    pub best: BestRun,
    /// One entry per evaluated configuration, in enumeration order.
    pub results: Vec<TuningResult>,
    /// Configurations dropped under `FailurePolicy::SkipConfiguration`.
    pub skipped: Vec<(ParamSet, String)>,
    /// Answers of the first evaluated configuration.
    pub first_answers: Option<AnswerSet>,
}

impl TuningOutcome {
    pub fn best_params(&self) -> Option<ParamSet> { self.best.params }

    pub fn best_accuracy(&self) -> f64 { self.best.accuracy }

    /// Answers to explain: the best run's, or the first evaluated
    /// configuration's when nothing scored above 0.
    pub fn analyzed_answers(&self) -> Option<&AnswerSet> {
        self.best.answers.as_ref().or(self.first_answers.as_ref())
    }
}

/// Fraction of ground-truth entries whose qid was answered with the correct id.
pub fn accuracy(answers: &AnswerSet, ground_truth: &GroundTruthSet) -> f64 {
    if ground_truth.is_empty() {
        return 0.0;
    }
    let truth = ground_truth.by_qid();
    let correct = answers
        .answers
        .iter()
        .filter(|a| truth.get(&a.qid).is_some_and(|gt| gt.retrieve == a.retrieve))
        .count();
    correct as f64 / ground_truth.len() as f64
}

/// Answer every question with `params` and score the answers.
pub fn evaluate(retriever: &Retriever<'_>, questions: &[Query], ground_truth: &GroundTruthSet, params: &ParamSet) -> Result<(f64, AnswerSet)> {
    let answers = retriever.answer_all(questions, params)?;
    Ok((accuracy(&answers, ground_truth), answers))
}

fn evaluate_at(retriever: &Retriever<'_>, grid: &ParamGrid, index: usize, questions: &[Query], ground_truth: &GroundTruthSet) -> (ParamSet, Result<Evaluation>) {
    let params = grid.params_at(index);
    let eval = evaluate(retriever, questions, ground_truth, &params)
        .map(|(accuracy, answers)| Evaluation { index, params, accuracy, answers });
    (params, eval)
}

pub fn grid_search(
    retriever: &Retriever<'_>,
    grid: &ParamGrid,
    questions: &[Query],
    ground_truth: &GroundTruthSet,
    policy: FailurePolicy,
) -> Result<TuningOutcome> {
    let total = grid.len();
    tracing::info!(total, questions = questions.len(), "starting grid search");

    // Lowest failing index seen so far. Under Abort, later indices are skipped;
    // every index below it still runs, so the fold sees the first failure.
    let first_failure = AtomicUsize::new(usize::MAX);
    let run = |i: usize| {
        if policy == FailurePolicy::Abort && i > first_failure.load(Ordering::Relaxed) {
            return None;
        }
        let (params, eval) = evaluate_at(retriever, grid, i, questions, ground_truth);
        if eval.is_err() {
            first_failure.fetch_min(i, Ordering::Relaxed);
        }
        Some((params, eval))
    };

    #[cfg(feature = "parallel")]
    let evaluations: Vec<_> = (0..total).into_par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let evaluations: Vec<_> = (0..total).map(run).collect();

    let mut outcome = TuningOutcome::default();
    for (params, eval) in evaluations.into_iter().flatten() {
        match eval {
            Ok(eval) => {
                tracing::info!(k1 = params.k1, b = params.b, n = params.n, accuracy = eval.accuracy, "evaluated configuration");
                outcome.results.push(TuningResult { params, accuracy: eval.accuracy });
                if outcome.first_answers.is_none() {
                    outcome.first_answers = Some(eval.answers.clone());
                }
                outcome.best = std::mem::take(&mut outcome.best).offer(eval);
            }
            Err(e) => match policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::SkipConfiguration => {
                    tracing::warn!(k1 = params.k1, b = params.b, n = params.n, error = %e, "skipping configuration");
                    outcome.skipped.push((params, e.to_string()));
                }
            },
        }
    }

    tracing::info!(best = ?outcome.best.params, accuracy = outcome.best.accuracy, "grid search complete");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::QueryExpander;
    use crate::index::{Corpora, CorpusIndex};
    use crate::synonyms::SynonymTables;
    use crate::tokenizer::Stopwords;
    use crate::types::GroundTruth;
    use crate::Category;
    use serde_json::json;

    #[test]
    fn enumeration_follows_declared_key_order() {
        let grid = ParamGrid::from_json(&json!({"b": [0.1, 0.9], "n": [1], "k1": [1.0, 2.0]})).unwrap();
        let got: Vec<(f64, f64)> = grid.iter().map(|p| (p.b, p.k1)).collect();
        assert_eq!(got, vec![(0.1, 1.0), (0.1, 2.0), (0.9, 1.0), (0.9, 2.0)]);
    }

    #[test]
    fn default_grid_has_eight_configurations() {
        let grid = ParamGrid::default();
        assert_eq!(grid.len(), 8);
        assert_eq!(grid.params_at(0), ParamSet { k1: 0.5, b: 0.25, n: 1 });
        assert_eq!(grid.params_at(1), ParamSet { k1: 0.5, b: 0.25, n: 2 });
        assert_eq!(grid.params_at(7), ParamSet { k1: 1.5, b: 0.75, n: 2 });
    }

    #[test]
    fn rejects_malformed_grids() {
        for bad in [
            json!({"k1": [1.0], "b": [0.5]}),
            json!({"k1": [1.0], "b": [0.5], "n": [1], "x": [1]}),
            json!({"k1": [], "b": [0.5], "n": [1]}),
            json!({"k1": [1.0], "b": [1.5], "n": [1]}),
            json!({"k1": [-1.0], "b": [0.5], "n": [1]}),
            json!({"k1": [1.0], "b": [0.5], "n": [0]}),
            json!({"k1": "1.0", "b": [0.5], "n": [1]}),
            json!([1, 2]),
        ] {
            assert!(matches!(ParamGrid::from_json(&bad), Err(Error::InvalidParamGrid(_))), "{bad}");
        }
    }

    fn eval(index: usize, accuracy: f64) -> Evaluation {
        Evaluation { index, params: ParamSet { k1: index as f64, b: 0.5, n: 1 }, accuracy, answers: AnswerSet::default() }
    }

    #[test]
    fn best_run_requires_strict_improvement() {
        let best = BestRun::default().offer(eval(0, 0.0));
        assert!(best.params.is_none());
        let best = best.offer(eval(1, 0.5)).offer(eval(2, 0.5)).offer(eval(3, 0.25));
        assert_eq!(best.index, Some(1));
        assert_eq!(best.accuracy, 0.5);
    }

    fn split(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn large_grid() -> ParamGrid {
        ParamGrid::new(vec![
            GridAxis::K1((1..=10).map(|i| i as f64 / 10.0).collect()),
            GridAxis::B((0..10).map(|i| i as f64 / 10.0).collect()),
            GridAxis::N((1..=10).collect()),
        ])
        .unwrap()
    }

    // The second question names a missing document, so every configuration fails
    // after tokenizing the first question exactly once.
    fn run(policy: FailurePolicy) -> (Result<TuningOutcome>, usize) {
        let mut corpora = Corpora::new();
        corpora.insert(CorpusIndex::build(Category::Faq, vec![(1, "a b".to_string())], &split, &Stopwords::default()));
        let calls = AtomicUsize::new(0);
        let counting = |text: &str| {
            calls.fetch_add(1, Ordering::Relaxed);
            split(text)
        };
        let tables = SynonymTables::new();
        let stop = Stopwords::default();
        let retriever = Retriever::new(&corpora, QueryExpander::new(&counting, &tables), &stop);
        let questions = vec![
            Query { qid: 1, category: Category::Faq, raw_text: "a".into(), candidates: vec![1] },
            Query { qid: 2, category: Category::Faq, raw_text: "b".into(), candidates: vec![1, 9] },
        ];
        let gt = GroundTruthSet { ground_truths: vec![GroundTruth { qid: 1, retrieve: 1, category: Category::Faq }] };
        let outcome = grid_search(&retriever, &large_grid(), &questions, &gt, policy);
        (outcome, calls.load(Ordering::Relaxed))
    }

    #[test]
    fn abort_stops_evaluating_after_a_failure() {
        let total = large_grid().len();
        let (outcome, calls) = run(FailurePolicy::Abort);
        assert!(matches!(outcome, Err(Error::UnknownDocumentId { category: Category::Faq, id: 9 })));
        assert!(calls < total, "evaluated {calls} of {total}");

        let (outcome, calls) = run(FailurePolicy::SkipConfiguration);
        assert_eq!(outcome.unwrap().skipped.len(), total);
        assert_eq!(calls, total);
    }

    #[test]
    fn best_run_merge_is_order_independent() {
        let a = BestRun::from(eval(4, 0.75));
        let b = BestRun::from(eval(2, 0.75));
        let c = BestRun::from(eval(1, 0.5));
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = c.merge(b.merge(a));
        assert_eq!(left.index, Some(2));
        assert_eq!(right.index, Some(2));
    }
}
