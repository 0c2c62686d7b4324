use crate::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymEntry {
    pub weight: f64,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// Canonical term → entry, for one category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynonymTable {
    entries: HashMap<String, SynonymEntry>,
}

impl SynonymTable {
    pub fn new() -> Self { Self::default() }

    /// Insert or override the entry for `term`.
    pub fn insert(&mut self, term: impl Into<String>, entry: SynonymEntry) -> Option<SynonymEntry> {
        self.entries.insert(term.into(), entry)
    }

    pub fn get(&self, term: &str) -> Option<&SynonymEntry> { self.entries.get(term) }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SynonymEntry)> {
        self.entries.iter()
    }
}

/// Synonym tables for every category that has one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynonymTables {
    tables: HashMap<Category, SynonymTable>,
}

impl SynonymTables {
    pub fn new() -> Self { Self::default() }

    pub fn table(&self, category: Category) -> Option<&SynonymTable> {
        self.tables.get(&category)
    }

    pub fn table_mut(&mut self, category: Category) -> &mut SynonymTable {
        self.tables.entry(category).or_default()
    }

    /// Fold `other` into `self`; entries in `other` win term by term.
    pub fn merge(&mut self, other: SynonymTables) {
        for (category, table) in other.tables {
            let dst = self.table_mut(category);
            for (term, entry) in table.entries {
                dst.insert(term, entry);
            }
        }
    }

    pub fn is_empty(&self) -> bool { self.tables.values().all(SynonymTable::is_empty) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(weight: f64, syns: &[&str]) -> SynonymEntry {
        SynonymEntry { weight, synonyms: syns.iter().map(|s| s.to_string()).collect() }
    }

    #[test]
    fn later_tables_override_per_term() {
        let mut base = SynonymTables::new();
        base.table_mut(Category::Insurance).insert("契約", entry(2.0, &["保單"]));
        base.table_mut(Category::Insurance).insert("變更", entry(1.0, &["修改"]));

        let mut later = SynonymTables::new();
        later.table_mut(Category::Insurance).insert("契約", entry(3.0, &["合約"]));
        base.merge(later);

        let t = base.table(Category::Insurance).unwrap();
        assert_eq!(t.get("契約"), Some(&entry(3.0, &["合約"])));
        assert_eq!(t.get("變更"), Some(&entry(1.0, &["修改"])));
        assert!(base.table(Category::Faq).is_none());
    }
}
