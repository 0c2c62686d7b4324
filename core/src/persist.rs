use crate::analysis::ErrorRecord;
use crate::error::Error;
use crate::index::CorpusIndex;
use crate::synonyms::{SynonymEntry, SynonymTables};
use crate::tokenizer::{DictTokenizer, Stopwords, Tokenizer};
use crate::tuner::{ParamGrid, TuningOutcome};
use crate::types::{AnswerSet, GroundTruthSet, ParamSet, QuestionSet, TuningResult};
use crate::{Category, DocId};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a tuning run writes its outputs.
pub struct OutputPaths {
    pub root: PathBuf,
}

impl OutputPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn answers(&self) -> PathBuf { self.root.join("output_answers.json") }
    pub fn tuning_results(&self) -> PathBuf { self.root.join("parameter_search_results.json") }
    pub fn error_analysis(&self) -> PathBuf { self.root.join("error_analysis.json") }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let json = serde_json::to_string_pretty(value)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_questions(path: &Path) -> Result<QuestionSet> { read_json(path) }

pub fn load_ground_truth(path: &Path) -> Result<GroundTruthSet> { read_json(path) }

pub fn load_answers(path: &Path) -> Result<AnswerSet> { read_json(path) }

pub fn save_answers(path: &Path, answers: &AnswerSet) -> Result<()> { write_json(path, answers) }

pub fn save_error_analysis(path: &Path, records: &[ErrorRecord]) -> Result<()> { write_json(path, records) }

#[derive(Serialize)]
struct TuningReport<'a> {
    best_params: Option<ParamSet>,
    best_accuracy: f64,
    all_results: &'a [TuningResult],
}

pub fn save_tuning_results(path: &Path, outcome: &TuningOutcome) -> Result<()> {
    let report = TuningReport {
        best_params: outcome.best_params(),
        best_accuracy: outcome.best_accuracy(),
        all_results: &outcome.results,
    };
    write_json(path, &report)
}

// --- corpus ---

fn collect_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => items.iter().for_each(|v| collect_text(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_text(v, out)),
        Value::Bool(_) | Value::Null => {}
    }
}

/// Document text from a JSON value; structured values contribute their string leaves.
pub fn document_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => {
            let mut parts = Vec::new();
            collect_text(other, &mut parts);
            parts.join(" ")
        }
    }
}

/// Read `(id, text)` pairs from a merged `{"<id>": text}` file or from a
/// directory of `<id>.json` files each holding a `text` field.
///
/// Any unreadable entry or document fails the whole load.
pub fn load_corpus_texts(category: Category, path: &Path) -> crate::Result<Vec<(DocId, String)>> {
    let fail = |reason: String| Error::CorpusLoadFailure { category, path: path.to_path_buf(), reason };
    let mut seen = HashSet::new();
    let mut texts = Vec::new();
    let mut push = |id: DocId, text: String| {
        if !seen.insert(id) {
            return Err(fail(format!("duplicate document id {id}")));
        }
        texts.push((id, text));
        Ok(())
    };

    if path.is_dir() {
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(path).follow_links(true) {
            let entry = entry.map_err(|e| fail(format!("walking directory: {e}")))?;
            let p = entry.into_path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(p);
            }
        }
        files.sort();
        for file in files {
            let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let id: DocId = stem
                .parse()
                .map_err(|_| fail(format!("file name {} is not a document id", file.display())))?;
            let value: Value = read_json(&file).map_err(|e| fail(format!("{e:#}")))?;
            let text = value
                .get("text")
                .map(document_text)
                .ok_or_else(|| fail(format!("{} has no text field", file.display())))?;
            push(id, text)?;
        }
    } else {
        let value: HashMap<String, Value> = read_json(path).map_err(|e| fail(format!("{e:#}")))?;
        let mut entries: Vec<_> = value.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in entries {
            let id: DocId = key
                .trim()
                .parse()
                .map_err(|_| fail(format!("key {key:?} is not a document id")))?;
            push(id, document_text(&value))?;
        }
    }
    Ok(texts)
}

pub fn load_corpus(category: Category, path: &Path, tokenizer: &dyn Tokenizer, stopwords: &Stopwords) -> crate::Result<CorpusIndex> {
    let texts = load_corpus_texts(category, path)?;
    Ok(CorpusIndex::build(category, texts, tokenizer, stopwords))
}

// --- synonyms ---

#[derive(Deserialize)]
#[serde(transparent)]
struct SynonymFile(HashMap<Category, HashMap<String, SynonymEntry>>);

/// Load a synonym file: category → term → `{weight, synonyms}`.
pub fn load_synonyms(path: &Path) -> crate::Result<SynonymTables> {
    let malformed = |reason: String| Error::MalformedSynonyms { path: path.to_path_buf(), reason };
    let file: SynonymFile = read_json(path).map_err(|e| malformed(format!("{e:#}")))?;
    let mut tables = SynonymTables::new();
    for (category, entries) in file.0 {
        let table = tables.table_mut(category);
        for (term, entry) in entries {
            if !(entry.weight.is_finite() && entry.weight > 0.0) {
                return Err(malformed(format!("term {term:?} has non-positive weight {}", entry.weight)));
            }
            table.insert(term, entry);
        }
    }
    Ok(tables)
}

/// Load and merge synonym files in order. A file that fails to load is
/// reported and skipped.
pub fn load_synonym_files<P: AsRef<Path>>(paths: &[P]) -> SynonymTables {
    let mut tables = SynonymTables::new();
    for path in paths {
        match load_synonyms(path.as_ref()) {
            Ok(t) => tables.merge(t),
            Err(e) => tracing::warn!(error = %e, "ignoring synonym file"),
        }
    }
    tables
}

// --- configuration ---

#[derive(Deserialize)]
struct GridConfig {
    param_grid: Value,
}

pub fn try_load_param_grid(path: &Path) -> crate::Result<ParamGrid> {
    let malformed = |reason: String| Error::MalformedConfig { path: path.to_path_buf(), reason };
    let config: GridConfig = read_json(path).map_err(|e| malformed(format!("{e:#}")))?;
    ParamGrid::from_json(&config.param_grid).map_err(|e| malformed(e.to_string()))
}

/// The grid from `path`, or the default grid when the file is missing or malformed.
pub fn load_param_grid(path: &Path) -> ParamGrid {
    match try_load_param_grid(path) {
        Ok(grid) => {
            tracing::info!(path = %path.display(), configurations = grid.len(), "loaded parameter grid");
            grid
        }
        Err(e) => {
            tracing::warn!(error = %e, "using default parameter grid");
            ParamGrid::default()
        }
    }
}

// --- tokenizer resources ---

/// User dictionary: one word per line, optionally followed by frequency and tag.
pub fn load_user_dict(path: &Path) -> Result<DictTokenizer> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let words = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_whitespace().next());
    let tokenizer = DictTokenizer::with_words(words);
    tracing::info!(path = %path.display(), words = tokenizer.num_words(), "loaded user dictionary");
    Ok(tokenizer)
}

/// Stopword list: one token per non-empty line.
pub fn load_stopwords(path: &Path) -> Result<Stopwords> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let stopwords = Stopwords::from_words(text.lines().map(str::trim).filter(|l| !l.is_empty()));
    tracing::info!(path = %path.display(), count = stopwords.len(), "loaded stopwords");
    Ok(stopwords)
}
