use crate::error::{Error, Result};
use crate::expand::{ExpandedQuery, QueryExpander};
use crate::index::Corpora;
use crate::scorer::{rank, Bm25};
use crate::tokenizer::Stopwords;
use crate::types::{Answer, AnswerSet, ParamSet, Query};
use crate::DocId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMode {
    /// Expanded tokens scored with their synonym weights.
    #[default]
    Weighted,
    /// Expanded tokens scored with plain BM25.
    Unweighted,
}

/// A candidate's score, carrying its id and position in the candidate list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDocument {
    pub id: DocId,
    pub position: usize,
    pub score: f64,
}

/// Maps a question to the best document among its candidates.
pub struct Retriever<'a> {
    corpora: &'a Corpora,
    expander: QueryExpander<'a>,
    stopwords: &'a Stopwords,
    mode: ScoringMode,
}

impl<'a> Retriever<'a> {
    pub fn new(corpora: &'a Corpora, expander: QueryExpander<'a>, stopwords: &'a Stopwords) -> Self {
        Self { corpora, expander, stopwords, mode: ScoringMode::default() }
    }

    pub fn with_mode(mut self, mode: ScoringMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ScoringMode { self.mode }

    pub fn corpora(&self) -> &'a Corpora { self.corpora }

    /// Expanded query tokens with stopwords removed.
    pub fn expand(&self, query: &Query) -> ExpandedQuery {
        let mut expanded = self.expander.expand(&query.raw_text, query.category);
        expanded.tokens = self.stopwords.filter(expanded.tokens);
        expanded
    }

    /// Top `params.n` candidates, best first. Ties keep candidate-list order.
    pub fn rank(&self, query: &Query, params: &ParamSet) -> Result<Vec<ScoredDocument>> {
        if query.candidates.is_empty() {
            return Err(Error::EmptyCandidateSet { qid: query.qid });
        }
        let index = self.corpora.index(query.category)?;
        let docs = index.resolve(&query.candidates)?;
        let expanded = self.expand(query);

        let bm25 = Bm25::new(docs.iter().map(|d| d.tokens.as_slice()), params.k1, params.b);
        let scores = match self.mode {
            ScoringMode::Weighted => bm25.weighted_scores(&expanded.tokens, &expanded.weights),
            ScoringMode::Unweighted => bm25.scores(&expanded.tokens),
        };

        let ranked = rank(&scores, params.n)
            .into_iter()
            .map(|position| ScoredDocument { id: query.candidates[position], position, score: scores[position] })
            .collect::<Vec<_>>();
        tracing::debug!(qid = query.qid, category = %query.category, top = ?ranked.first(), "ranked candidates");
        Ok(ranked)
    }

    pub fn retrieve(&self, query: &Query, params: &ParamSet) -> Result<DocId> {
        let ranked = self.rank(query, params)?;
        // rank() always returns at least one entry for a non-empty candidate list.
        ranked
            .first()
            .map(|d| d.id)
            .ok_or(Error::EmptyCandidateSet { qid: query.qid })
    }

    /// Answer every question in order; the first failure aborts.
    pub fn answer_all(&self, questions: &[Query], params: &ParamSet) -> Result<AnswerSet> {
        let answers = questions
            .iter()
            .map(|q| Ok(Answer { qid: q.qid, retrieve: self.retrieve(q, params)? }))
            .collect::<Result<Vec<_>>>()?;
        Ok(AnswerSet { answers })
    }
}
