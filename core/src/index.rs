use crate::error::{Error, Result};
use crate::tokenizer::{Stopwords, Tokenizer};
use crate::{Category, DocId};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub category: Category,
    pub text: String,
    /// Tokens after stopword removal, computed once when the corpus is built.
    pub tokens: Vec<String>,
}

/// All documents of one category, keyed by id.
#[derive(Debug, Clone)]
pub struct CorpusIndex {
    category: Category,
    docs: HashMap<DocId, Document>,
}

impl CorpusIndex {
    pub fn new(category: Category) -> Self {
        Self { category, docs: HashMap::new() }
    }

    /// Tokenize every `(id, text)` pair. Later duplicates of an id replace earlier ones.
    pub fn build<I>(category: Category, texts: I, tokenizer: &dyn Tokenizer, stopwords: &Stopwords) -> Self
    where
        I: IntoIterator<Item = (DocId, String)>,
    {
        let mut index = Self::new(category);
        for (id, text) in texts {
            let tokens = stopwords.filter(tokenizer.tokenize(&text));
            index.docs.insert(id, Document { id, category, text, tokens });
        }
        tracing::info!(%category, num_docs = index.docs.len(), "built corpus index");
        index
    }

    pub fn category(&self) -> Category { self.category }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn get(&self, id: DocId) -> Option<&Document> { self.docs.get(&id) }

    pub fn contains(&self, id: DocId) -> bool { self.docs.contains_key(&id) }

    /// Look up a document, failing with `UnknownDocumentId` when absent.
    pub fn document(&self, id: DocId) -> Result<&Document> {
        self.docs
            .get(&id)
            .ok_or(Error::UnknownDocumentId { category: self.category, id })
    }

    /// Resolve an ordered candidate list to documents, preserving order and duplicates.
    pub fn resolve(&self, ids: &[DocId]) -> Result<Vec<&Document>> {
        ids.iter().map(|&id| self.document(id)).collect()
    }
}

/// Per-category corpus indexes. Ids are only unique within a category, so every
/// lookup goes through `(category, id)`.
#[derive(Debug, Clone, Default)]
pub struct Corpora {
    by_category: HashMap<Category, CorpusIndex>,
}

impl Corpora {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, index: CorpusIndex) -> Option<CorpusIndex> {
        self.by_category.insert(index.category(), index)
    }

    pub fn index(&self, category: Category) -> Result<&CorpusIndex> {
        self.by_category.get(&category).ok_or(Error::CorpusNotLoaded(category))
    }

    pub fn get(&self, category: Category, id: DocId) -> Option<&Document> {
        self.by_category.get(&category).and_then(|idx| idx.get(id))
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.by_category.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whitespace(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn same_id_in_two_categories_stays_separate() {
        let stop = Stopwords::default();
        let mut corpora = Corpora::new();
        corpora.insert(CorpusIndex::build(Category::Finance, vec![(7, "alpha".to_string())], &whitespace, &stop));
        corpora.insert(CorpusIndex::build(Category::Faq, vec![(7, "beta".to_string())], &whitespace, &stop));
        assert_eq!(corpora.get(Category::Finance, 7).unwrap().text, "alpha");
        assert_eq!(corpora.get(Category::Faq, 7).unwrap().text, "beta");
        assert!(corpora.get(Category::Insurance, 7).is_none());
    }

    #[test]
    fn resolve_reports_missing_id_with_category() {
        let stop = Stopwords::default();
        let idx = CorpusIndex::build(Category::Insurance, vec![(1, "a b".to_string())], &whitespace, &stop);
        match idx.resolve(&[1, 2]) {
            Err(Error::UnknownDocumentId { category, id }) => {
                assert_eq!(category, Category::Insurance);
                assert_eq!(id, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn stopwords_are_removed_from_document_tokens() {
        let stop = Stopwords::from_words(["b"]);
        let idx = CorpusIndex::build(Category::Faq, vec![(1, "a b c".to_string())], &whitespace, &stop);
        assert_eq!(idx.get(1).unwrap().tokens, vec!["a", "c"]);
    }
}
