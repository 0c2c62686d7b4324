use crate::retrieve::Retriever;
use crate::types::{AnswerSet, GroundTruthSet, QuestionSet};
use crate::{Category, DocId, Qid};
use serde::Serialize;
use std::collections::BTreeMap;

/// Text reported when an id has no document in its category.
pub const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub qid: Qid,
    pub category: Category,
    pub query: String,
    pub predicted_id: DocId,
    pub correct_id: DocId,
    pub predicted_text: String,
    pub correct_text: String,
    pub expanded_tokens: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorReport {
    pub records: Vec<ErrorRecord>,
    pub per_category: BTreeMap<Category, usize>,
}

/// Explain every answer that disagrees with the ground truth.
///
/// Answers without a ground-truth entry or without a matching question are
/// not reported.
pub fn analyze(answers: &AnswerSet, ground_truth: &GroundTruthSet, questions: &QuestionSet, retriever: &Retriever<'_>) -> ErrorReport {
    let truth = ground_truth.by_qid();
    let corpora = retriever.corpora();
    let mut report = ErrorReport::default();

    for answer in &answers.answers {
        let Some(gt) = truth.get(&answer.qid) else { continue };
        if gt.retrieve == answer.retrieve {
            continue;
        }
        let Some(question) = questions.find(answer.qid) else { continue };
        let text_of = |id: DocId| {
            corpora
                .get(question.category, id)
                .map(|d| d.text.clone())
                .unwrap_or_else(|| NOT_FOUND.to_string())
        };
        report.records.push(ErrorRecord {
            qid: answer.qid,
            category: question.category,
            query: question.raw_text.clone(),
            predicted_id: answer.retrieve,
            correct_id: gt.retrieve,
            predicted_text: text_of(answer.retrieve),
            correct_text: text_of(gt.retrieve),
            expanded_tokens: retriever.expand(question).tokens,
        });
        *report.per_category.entry(question.category).or_insert(0) += 1;
    }

    tracing::info!(errors = report.records.len(), per_category = ?report.per_category, "error analysis");
    report
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub qid: Qid,
    pub output_retrieve: DocId,
    pub ground_truth_retrieve: Option<DocId>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
    pub incorrect: Vec<Mismatch>,
}

/// Compare an answer file against the ground truth.
pub fn check_answers(answers: &AnswerSet, ground_truth: &GroundTruthSet) -> CheckReport {
    let truth = ground_truth.by_qid();
    let mut correct = 0;
    let mut incorrect = Vec::new();
    for answer in &answers.answers {
        match truth.get(&answer.qid) {
            Some(gt) if gt.retrieve == answer.retrieve => correct += 1,
            gt => incorrect.push(Mismatch {
                qid: answer.qid,
                output_retrieve: answer.retrieve,
                ground_truth_retrieve: gt.map(|g| g.retrieve),
                category: gt.map(|g| g.category),
            }),
        }
    }
    let total = ground_truth.len();
    let accuracy = if total > 0 { correct as f64 / total as f64 } else { 0.0 };
    CheckReport { correct, total, accuracy, incorrect }
}
