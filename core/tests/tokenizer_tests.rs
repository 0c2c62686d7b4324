use retrieval_core::tokenizer::{DictTokenizer, SegmentMode, Stopwords, Tokenizer};

#[test]
fn it_normalizes_and_stems() {
    let t = DictTokenizer::new();
    let words = t.tokenize("Running Runners RUN! ＡＢＣ");
    assert!(words.contains(&"run".to_string()));
    // NFKC folds full-width letters before lowercasing
    assert!(words.contains(&"abc".to_string()));
}

#[test]
fn it_segments_han_runs_with_the_dictionary() {
    let t = DictTokenizer::with_words(["投資型", "保單", "年化", "報酬率", "說明"]).with_mode(SegmentMode::Exact);
    assert_eq!(t.tokenize("投資型保單的年化報酬率說明"), vec!["投資型", "保單", "的", "年化", "報酬率", "說明"]);
}

#[test]
fn unknown_han_characters_become_single_tokens() {
    let t = DictTokenizer::new();
    assert_eq!(t.tokenize("借款"), vec!["借", "款"]);
}

#[test]
fn it_filters_stopwords() {
    let t = DictTokenizer::with_words(["保單"]);
    let stop = Stopwords::from_words(["的"]);
    let words = stop.filter(t.tokenize("保單的"));
    assert_eq!(words, vec!["保單"]);
}
