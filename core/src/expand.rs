//! Synonym-aware query expansion.
//!
//! The query's tokens are scanned left to right. At each cursor position the
//! next 3, 2, then 1 tokens are concatenated and looked up in the category's
//! synonym table. A hit emits the phrase and its synonyms (all carrying the
//! phrase weight) and advances past the consumed tokens; a miss emits the single
//! token and advances by one. Anything already emitted in this call is never
//! emitted again.

use crate::synonyms::{SynonymEntry, SynonymTable, SynonymTables};
use crate::tokenizer::Tokenizer;
use crate::Category;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Longest phrase window, in tokens.
pub const MAX_PHRASE_TOKENS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpandedQuery {
    pub tokens: Vec<String>,
    pub weights: HashMap<String, f64>,
}

impl ExpandedQuery {
    /// Query tokens used verbatim, no weights.
    pub fn passthrough(tokens: Vec<String>) -> Self {
        Self { tokens, weights: HashMap::new() }
    }

    /// Weight of `token`; 1.0 unless expansion assigned one.
    pub fn weight(&self, token: &str) -> f64 {
        self.weights.get(token).copied().unwrap_or(1.0)
    }
}

struct ScanState<'t> {
    tokens: &'t [String],
    cursor: usize,
    used: HashSet<String>,
    out: ExpandedQuery,
}

enum Step<'e> {
    Phrase { phrase: String, len: usize, entry: &'e SynonymEntry },
    Single,
}

impl<'t> ScanState<'t> {
    fn new(tokens: &'t [String]) -> Self {
        Self { tokens, cursor: 0, used: HashSet::new(), out: ExpandedQuery::default() }
    }

    fn done(&self) -> bool { self.cursor >= self.tokens.len() }

    fn next_step<'e>(&self, table: &'e SynonymTable) -> Step<'e> {
        let remaining = self.tokens.len() - self.cursor;
        for len in (1..=MAX_PHRASE_TOKENS.min(remaining)).rev() {
            let phrase: String = self.tokens[self.cursor..self.cursor + len].concat();
            if let Some(entry) = table.get(&phrase) {
                return Step::Phrase { phrase, len, entry };
            }
        }
        Step::Single
    }

    fn emit(&mut self, token: String, weight: Option<f64>) {
        if let Some(w) = weight {
            self.out.weights.insert(token.clone(), w);
        }
        self.used.insert(token.clone());
        self.out.tokens.push(token);
    }

    fn apply(&mut self, step: Step<'_>) {
        match step {
            Step::Phrase { phrase, len, entry } => {
                if !self.used.contains(&phrase) {
                    self.emit(phrase, Some(entry.weight));
                    for syn in &entry.synonyms {
                        if !self.used.contains(syn) {
                            self.emit(syn.clone(), Some(entry.weight));
                        }
                    }
                }
                self.cursor += len;
            }
            Step::Single => {
                let tokens = self.tokens;
                let token = &tokens[self.cursor];
                if !self.used.contains(token) {
                    self.emit(token.clone(), None);
                }
                self.cursor += 1;
            }
        }
    }
}

/// Expand an already tokenized query against one category's table.
///
/// A missing or empty table returns the tokens unchanged with no weights.
pub fn expand_tokens(tokens: Vec<String>, table: Option<&SynonymTable>) -> ExpandedQuery {
    let table = match table {
        Some(t) if !t.is_empty() => t,
        _ => return ExpandedQuery::passthrough(tokens),
    };
    let mut state = ScanState::new(&tokens);
    while !state.done() {
        let step = state.next_step(table);
        state.apply(step);
    }
    state.out
}

/// Tokenizes raw questions and expands them with the category's synonym table.
pub struct QueryExpander<'a> {
    tokenizer: &'a dyn Tokenizer,
    synonyms: &'a SynonymTables,
}

impl<'a> QueryExpander<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, synonyms: &'a SynonymTables) -> Self {
        Self { tokenizer, synonyms }
    }

    pub fn tokenizer(&self) -> &'a dyn Tokenizer { self.tokenizer }

    pub fn expand(&self, raw_query: &str, category: Category) -> ExpandedQuery {
        let tokens = self.tokenizer.tokenize(raw_query);
        let table = self.synonyms.table(category);
        if table.is_none() {
            tracing::debug!(%category, "{}; expansion is passthrough", crate::Error::MissingSynonymTable(category));
        }
        let expanded = expand_tokens(tokens, table);
        tracing::debug!(%category, query = raw_query, tokens = ?expanded.tokens, weights = ?expanded.weights, "expanded query");
        expanded
    }
}
