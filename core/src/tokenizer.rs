use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Group 1: a run of Han characters. Group 2: a letter/digit run without Han.
    static ref RE: Regex = Regex::new(r"(?u)(\p{Han}+)|([[\p{L}\p{N}]--\p{Han}][[\p{L}\p{N}_']--\p{Han}]*)").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Converts raw text into an ordered token sequence.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn tokenize(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentMode {
    /// Longest dictionary match only.
    Exact,
    /// Longest match, preceded by the dictionary 2- and 3-character sub-words it contains.
    #[default]
    Search,
}

/// Dictionary-driven segmenter.
///
/// Text is NFKC-normalized and lowercased. Han runs are split by forward maximum
/// matching against the user dictionary; Han characters the dictionary does not
/// cover become single-character tokens. Other letter/digit runs are stemmed.
#[derive(Debug, Clone, Default)]
pub struct DictTokenizer {
    words: HashSet<String>,
    max_word_chars: usize,
    mode: SegmentMode,
}

fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

impl DictTokenizer {
    pub fn new() -> Self { Self::default() }

    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut t = Self::new();
        for w in words {
            t.add_word(w.as_ref());
        }
        t
    }

    pub fn with_mode(mut self, mode: SegmentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn add_word(&mut self, word: &str) {
        let word = normalize(word.trim());
        if word.is_empty() { return; }
        self.max_word_chars = self.max_word_chars.max(word.chars().count());
        self.words.insert(word);
    }

    pub fn num_words(&self) -> usize { self.words.len() }

    fn segment_han(&self, run: &str, out: &mut Vec<String>) {
        let chars: Vec<char> = run.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let longest = self.max_word_chars.min(chars.len() - i);
            let mut len = 1;
            for l in (2..=longest).rev() {
                let cand: String = chars[i..i + l].iter().collect();
                if self.words.contains(&cand) {
                    len = l;
                    break;
                }
            }
            let word = &chars[i..i + len];
            if self.mode == SegmentMode::Search {
                for sub in [2usize, 3] {
                    if word.len() <= sub { continue; }
                    for w in word.windows(sub) {
                        let s: String = w.iter().collect();
                        if self.words.contains(&s) {
                            out.push(s);
                        }
                    }
                }
            }
            out.push(word.iter().collect());
            i += len;
        }
    }
}

impl Tokenizer for DictTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = normalize(text);
        let mut tokens = Vec::new();
        for caps in RE.captures_iter(&normalized) {
            if let Some(han) = caps.get(1) {
                self.segment_han(han.as_str(), &mut tokens);
            } else if let Some(word) = caps.get(2) {
                tokens.push(STEMMER.stem(word.as_str()).to_string());
            }
        }
        tokens
    }
}

/// Tokens dropped from documents and from expanded queries.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { words: words.into_iter().map(Into::into).collect() }
    }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    pub fn contains(&self, token: &str) -> bool { self.words.contains(token) }

    pub fn filter(&self, tokens: Vec<String>) -> Vec<String> {
        if self.words.is_empty() { return tokens; }
        tokens.into_iter().filter(|t| !self.words.contains(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_maximum_matching_prefers_longest_word() {
        let t = DictTokenizer::with_words(["保單", "保單借款", "申請"]).with_mode(SegmentMode::Exact);
        assert_eq!(t.tokenize("保單借款的申請"), vec!["保單借款", "的", "申請"]);
    }

    #[test]
    fn search_mode_emits_sub_words_first() {
        let t = DictTokenizer::with_words(["保單", "保單借款", "借款"]);
        assert_eq!(t.tokenize("保單借款"), vec!["保單", "借款", "保單借款"]);
    }

    #[test]
    fn mixed_script_and_punctuation() {
        let t = DictTokenizer::with_words(["年化"]);
        let toks = t.tokenize("Running 年化，報酬 2024!");
        assert_eq!(toks, vec!["run", "年化", "報", "酬", "2024"]);
    }
}
