use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use retrieval_core::analysis::{analyze, check_answers, CheckReport};
use retrieval_core::expand::QueryExpander;
use retrieval_core::persist::{self, OutputPaths};
use retrieval_core::retrieve::{Retriever, ScoringMode};
use retrieval_core::synonyms::SynonymTables;
use retrieval_core::tokenizer::{DictTokenizer, Stopwords};
use retrieval_core::tuner::{grid_search, FailurePolicy, TuningOutcome};
use retrieval_core::{AnswerSet, Category, Corpora, ParamSet, QuestionSet};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "tuner")]
#[command(about = "BM25 retrieval over pre-filtered candidates, with parameter grid search", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer every question with one parameter set
    Retrieve {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long, default_value_t = 1.5)]
        k1: f64,
        #[arg(long, default_value_t = 0.75)]
        b: f64,
        /// Ranked list length before the top answer is taken
        #[arg(long, default_value_t = 1)]
        n: usize,
        /// Answer file to write
        #[arg(long)]
        output: PathBuf,
    },
    /// Grid-search k1, b and n against the ground truth
    Tune {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        ground_truth: PathBuf,
        /// JSON file holding a `param_grid` object
        #[arg(long, default_value = "param_config.json")]
        config: PathBuf,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// Leave failing configurations out of the results instead of aborting
        #[arg(long, default_value_t = false)]
        skip_failed_configs: bool,
    },
    /// Compare an answer file with the ground truth
    Check {
        #[arg(long)]
        answers: PathBuf,
        #[arg(long)]
        ground_truth: PathBuf,
    },
}

/// Inputs shared by `retrieve` and `tune`.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    #[arg(long)]
    pub questions: PathBuf,
    /// Insurance corpus: merged JSON map or directory of `<id>.json`
    #[arg(long)]
    pub insurance: Option<PathBuf>,
    #[arg(long)]
    pub finance: Option<PathBuf>,
    #[arg(long)]
    pub faq: Option<PathBuf>,
    /// Synonym files, merged in order
    #[arg(long)]
    pub synonyms: Vec<PathBuf>,
    #[arg(long)]
    pub user_dict: Option<PathBuf>,
    #[arg(long)]
    pub stopwords: Option<PathBuf>,
    /// Score expanded tokens without their synonym weights
    #[arg(long, default_value_t = false)]
    pub unweighted: bool,
    /// Skip synonym expansion entirely
    #[arg(long, default_value_t = false)]
    pub no_synonyms: bool,
}

impl DataArgs {
    fn corpus_path(&self, category: Category) -> Option<&PathBuf> {
        match category {
            Category::Insurance => self.insurance.as_ref(),
            Category::Finance => self.finance.as_ref(),
            Category::Faq => self.faq.as_ref(),
        }
    }

    fn scoring_mode(&self) -> ScoringMode {
        if self.unweighted { ScoringMode::Unweighted } else { ScoringMode::Weighted }
    }
}

/// Everything loaded from disk that a `Retriever` borrows.
pub struct Dataset {
    pub tokenizer: DictTokenizer,
    pub stopwords: Stopwords,
    pub corpora: Corpora,
    pub synonyms: SynonymTables,
    pub questions: QuestionSet,
    pub mode: ScoringMode,
}

impl Dataset {
    pub fn load(args: &DataArgs) -> Result<Self> {
        let tokenizer = match &args.user_dict {
            Some(path) => persist::load_user_dict(path)?,
            None => DictTokenizer::new(),
        };
        let stopwords = match &args.stopwords {
            Some(path) => persist::load_stopwords(path)?,
            None => Stopwords::default(),
        };

        let mut corpora = Corpora::new();
        for category in Category::ALL {
            let Some(path) = args.corpus_path(category) else { continue };
            let index = persist::load_corpus(category, path, &tokenizer, &stopwords)?;
            tracing::info!(%category, docs = index.len(), "loaded corpus");
            corpora.insert(index);
        }

        let synonyms = if args.no_synonyms {
            SynonymTables::new()
        } else {
            persist::load_synonym_files(args.synonyms.as_slice())
        };
        let questions = persist::load_questions(&args.questions)?;
        tracing::info!(questions = questions.questions.len(), "loaded questions");

        Ok(Self { tokenizer, stopwords, corpora, synonyms, questions, mode: args.scoring_mode() })
    }

    pub fn retriever(&self) -> Retriever<'_> {
        let expander = QueryExpander::new(&self.tokenizer, &self.synonyms);
        Retriever::new(&self.corpora, expander, &self.stopwords).with_mode(self.mode)
    }
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Retrieve { data, k1, b, n, output } => {
            run_retrieve(&data, ParamSet { k1, b, n }, &output).map(|_| ())
        }
        Commands::Tune { data, ground_truth, config, output_dir, skip_failed_configs } => {
            let policy = if skip_failed_configs { FailurePolicy::SkipConfiguration } else { FailurePolicy::Abort };
            let outcome = run_tune(&data, &ground_truth, &config, &output_dir, policy)?;
            match outcome.best_params() {
                Some(p) => println!("best: k1={} b={} n={} accuracy={:.4}", p.k1, p.b, p.n, outcome.best_accuracy()),
                None => println!("no configuration scored above 0"),
            }
            Ok(())
        }
        Commands::Check { answers, ground_truth } => {
            let report = run_check(&answers, &ground_truth)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

pub fn run_retrieve(data: &DataArgs, params: ParamSet, output: &Path) -> Result<AnswerSet> {
    let dataset = Dataset::load(data)?;
    let answers = dataset
        .retriever()
        .answer_all(&dataset.questions.questions, &params)
        .context("retrieval failed")?;
    persist::save_answers(output, &answers)?;
    tracing::info!(answers = answers.answers.len(), output = %output.display(), "wrote answers");
    Ok(answers)
}

pub fn run_tune(data: &DataArgs, ground_truth: &Path, config: &Path, output_dir: &Path, policy: FailurePolicy) -> Result<TuningOutcome> {
    let dataset = Dataset::load(data)?;
    let ground_truth = persist::load_ground_truth(ground_truth)?;
    let grid = persist::load_param_grid(config);
    let retriever = dataset.retriever();

    let outcome = grid_search(&retriever, &grid, &dataset.questions.questions, &ground_truth, policy)
        .context("grid search failed")?;

    let paths = OutputPaths::new(output_dir);
    if let Some(best) = &outcome.best.answers {
        persist::save_answers(&paths.answers(), best)?;
    }
    persist::save_tuning_results(&paths.tuning_results(), &outcome)?;

    let empty = AnswerSet::default();
    let analyzed = outcome.analyzed_answers().unwrap_or(&empty);
    let report = analyze(analyzed, &ground_truth, &dataset.questions, &retriever);
    persist::save_error_analysis(&paths.error_analysis(), &report.records)?;

    tracing::info!(output_dir = %output_dir.display(), skipped = outcome.skipped.len(), "tuning complete");
    Ok(outcome)
}

pub fn run_check(answers: &Path, ground_truth: &Path) -> Result<CheckReport> {
    let answers = persist::load_answers(answers)?;
    let ground_truth = persist::load_ground_truth(ground_truth)?;
    let report = check_answers(&answers, &ground_truth);
    tracing::info!(correct = report.correct, total = report.total, accuracy = report.accuracy, "checked answers");
    Ok(report)
}
