use crate::{Category, DocId, Qid};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A question plus the only documents it may be answered from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub qid: Qid,
    pub category: Category,
    #[serde(rename = "query")]
    pub raw_text: String,
    #[serde(rename = "source")]
    pub candidates: Vec<DocId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<Query>,
}

impl QuestionSet {
    pub fn find(&self, qid: Qid) -> Option<&Query> {
        self.questions.iter().find(|q| q.qid == qid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub qid: Qid,
    pub retrieve: DocId,
    pub category: Category,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundTruthSet {
    pub ground_truths: Vec<GroundTruth>,
}

impl GroundTruthSet {
    pub fn len(&self) -> usize { self.ground_truths.len() }

    pub fn is_empty(&self) -> bool { self.ground_truths.is_empty() }

    /// qid → entry; the first entry wins when a qid repeats.
    pub fn by_qid(&self) -> HashMap<Qid, &GroundTruth> {
        let mut map = HashMap::with_capacity(self.ground_truths.len());
        for gt in &self.ground_truths {
            map.entry(gt.qid).or_insert(gt);
        }
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub qid: Qid,
    pub retrieve: DocId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSet {
    pub answers: Vec<Answer>,
}

/// One scoring-formula configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    pub k1: f64,
    pub b: f64,
    /// Length of the ranked list before the top answer is taken.
    pub n: usize,
}

impl Default for ParamSet {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75, n: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub params: ParamSet,
    pub accuracy: f64,
}
