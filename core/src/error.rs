use crate::{Category, DocId, Qid};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("document {id} not found in {category} corpus")]
    UnknownDocumentId { category: Category, id: DocId },

    #[error("question {qid} has no candidate documents")]
    EmptyCandidateSet { qid: Qid },

    #[error("no corpus loaded for category {0}")]
    CorpusNotLoaded(Category),

    #[error("no synonym table for category {0}")]
    MissingSynonymTable(Category),

    #[error("malformed config {}: {reason}", path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    #[error("malformed synonym file {}: {reason}", path.display())]
    MalformedSynonyms { path: PathBuf, reason: String },

    #[error("failed to load {category} corpus from {}: {reason}", path.display())]
    CorpusLoadFailure { category: Category, path: PathBuf, reason: String },

    #[error("invalid parameter grid: {0}")]
    InvalidParamGrid(String),
}

pub type Result<T> = std::result::Result<T, Error>;
