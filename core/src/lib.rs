use serde::{Deserialize, Serialize};
use std::fmt;

pub mod analysis;
pub mod error;
pub mod expand;
pub mod index;
pub mod persist;
pub mod retrieve;
pub mod scorer;
pub mod synonyms;
pub mod tokenizer;
pub mod tuner;
pub mod types;

pub use error::{Error, Result};
pub use index::{Corpora, CorpusIndex, Document};
pub use types::{Answer, AnswerSet, GroundTruth, GroundTruthSet, ParamSet, Query, QuestionSet, TuningResult};

pub type DocId = u32;
pub type Qid = u32;

/// Corpus partition a question and its candidates belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Insurance,
    Finance,
    Faq,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Insurance, Category::Finance, Category::Faq];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Insurance => "insurance",
            Category::Finance => "finance",
            Category::Faq => "faq",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
