use retrieval_core::persist::{self, OutputPaths};
use retrieval_core::tokenizer::Tokenizer;
use retrieval_core::tuner::{ParamGrid, TuningOutcome};
use retrieval_core::{Category, Error, ParamSet, TuningResult};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

#[test]
fn corpus_from_directory_of_documents() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("finance");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("3.json"), json!({"text": "third"}).to_string()).unwrap();
    fs::write(dir.join("1.json"), json!({"text": "first"}).to_string()).unwrap();
    fs::write(dir.join("2.json"), json!({"text": ["second", 2]}).to_string()).unwrap();

    let texts = persist::load_corpus_texts(Category::Finance, &dir).unwrap();
    assert_eq!(
        texts,
        vec![(1, "first".to_string()), (2, "second 2".to_string()), (3, "third".to_string())]
    );
}

#[test]
fn document_without_text_fails_the_whole_directory() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("finance");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("1.json"), json!({"text": "first"}).to_string()).unwrap();
    fs::write(dir.join("2.json"), json!({"other": 1}).to_string()).unwrap();
    let err = persist::load_corpus_texts(Category::Finance, &dir).unwrap_err();
    match err {
        Error::CorpusLoadFailure { category, reason, .. } => {
            assert_eq!(category, Category::Finance);
            assert!(reason.contains("no text field"), "{reason}");
        }
        other => panic!("unexpected error {other}"),
    }

    fs::write(dir.join("2.json"), json!(["not", "an", "object"]).to_string()).unwrap();
    assert!(matches!(
        persist::load_corpus_texts(Category::Finance, &dir),
        Err(Error::CorpusLoadFailure { .. })
    ));
}

#[cfg(unix)]
#[test]
fn broken_symlink_fails_the_whole_directory() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("insurance");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("1.json"), json!({"text": "first"}).to_string()).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("missing"), dir.join("nested")).unwrap();
    assert!(matches!(
        persist::load_corpus_texts(Category::Insurance, &dir),
        Err(Error::CorpusLoadFailure { category: Category::Insurance, .. })
    ));
}

#[test]
fn structured_faq_entries_are_flattened() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pid_map_content.json");
    let faq = json!({"5": [{"question": "如何申請", "answers": ["線上申請", "臨櫃辦理"]}]});
    fs::write(&path, faq.to_string()).unwrap();
    let texts = persist::load_corpus_texts(Category::Faq, &path).unwrap();
    assert_eq!(texts, vec![(5, "如何申請 線上申請 臨櫃辦理".to_string())]);
}

#[test]
fn bad_corpus_is_a_load_failure() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("insurance.json");
    fs::write(&path, json!({"abc": "text"}).to_string()).unwrap();
    let err = persist::load_corpus_texts(Category::Insurance, &path).unwrap_err();
    assert!(matches!(err, Error::CorpusLoadFailure { category: Category::Insurance, .. }));

    let missing = tmp.path().join("nope.json");
    assert!(matches!(
        persist::load_corpus_texts(Category::Insurance, &missing),
        Err(Error::CorpusLoadFailure { .. })
    ));
}

#[test]
fn param_grid_falls_back_to_default() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("param_config.json");
    assert_eq!(persist::load_param_grid(&missing), ParamGrid::default());

    let broken = tmp.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    assert!(matches!(persist::try_load_param_grid(&broken), Err(Error::MalformedConfig { .. })));
    assert_eq!(persist::load_param_grid(&broken), ParamGrid::default());

    let good = tmp.path().join("good.json");
    fs::write(&good, r#"{"param_grid": {"n": [1], "b": [0.5, 0.6], "k1": [1.0]}}"#).unwrap();
    let grid = persist::load_param_grid(&good);
    assert_eq!(grid.len(), 2);
    assert_eq!(grid.params_at(1), ParamSet { k1: 1.0, b: 0.6, n: 1 });
}

#[test]
fn synonym_weights_must_be_positive() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("synonym_dict.json");
    fs::write(&path, json!({"finance": {"報酬": {"weight": 0.0, "synonyms": ["收益"]}}}).to_string()).unwrap();
    assert!(matches!(persist::load_synonyms(&path), Err(Error::MalformedSynonyms { .. })));
    assert!(persist::load_synonym_files(&[&path]).is_empty());
}

#[test]
fn later_synonym_files_override_earlier() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("a.json");
    let b = tmp.path().join("b.json");
    fs::write(&a, json!({"faq": {"申請": {"weight": 1.0, "synonyms": ["辦理"]}}}).to_string()).unwrap();
    fs::write(&b, json!({"faq": {"申請": {"weight": 3.0, "synonyms": ["提出"]}}}).to_string()).unwrap();
    let tables = persist::load_synonym_files(&[a, b]);
    let entry = tables.table(Category::Faq).unwrap().get("申請").unwrap();
    assert_eq!(entry.weight, 3.0);
    assert_eq!(entry.synonyms, vec!["提出"]);
}

#[test]
fn user_dictionary_and_stopwords() {
    let tmp = TempDir::new().unwrap();
    let dict = tmp.path().join("custom_dict.txt");
    fs::write(&dict, "保單 10 n\n# comment\n\n借款\n").unwrap();
    let stop = tmp.path().join("stopwords.txt");
    fs::write(&stop, "的\n\n了\n").unwrap();

    let tokenizer = persist::load_user_dict(&dict).unwrap();
    assert_eq!(tokenizer.num_words(), 2);
    let stopwords = persist::load_stopwords(&stop).unwrap();
    assert_eq!(stopwords.len(), 2);
    assert_eq!(stopwords.filter(tokenizer.tokenize("保單的借款")), vec!["保單", "借款"]);
}

#[test]
fn tuning_results_file_shape() {
    let tmp = TempDir::new().unwrap();
    let paths = OutputPaths::new(tmp.path().join("out"));
    let params = ParamSet { k1: 0.5, b: 0.25, n: 1 };
    let outcome = TuningOutcome {
        results: vec![TuningResult { params, accuracy: 0.0 }],
        ..Default::default()
    };
    persist::save_tuning_results(&paths.tuning_results(), &outcome).unwrap();
    let v: Value = serde_json::from_str(&fs::read_to_string(paths.tuning_results()).unwrap()).unwrap();
    assert_eq!(v["best_params"], Value::Null);
    assert_eq!(v["best_accuracy"], json!(0.0));
    assert_eq!(v["all_results"][0]["params"], json!({"k1": 0.5, "b": 0.25, "n": 1}));
}
