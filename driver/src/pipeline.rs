use crate::{input, output};
use app_similarity::{DocPair, SimilarityApp, SimilarityResult};
use app_wordsets::WordSetApp;
use common::{codec::read_records, Config, Job, Result, Substrate};
use eyre::{ensure, WrapErr};
use log::info;
use std::{fmt, path::PathBuf, sync::Arc};

pub const WORD_EXTRACTION: &str = "document word extraction";
pub const SIMILARITY: &str = "document similarity";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Intermediate records; created and removed by the caller.
    pub scratch: PathBuf,
    pub n_reduce: u64,
    /// Documents per map partition.
    pub split_size: usize,
    pub config: Config,
}

impl PipelineOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, scratch: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            scratch: scratch.into(),
            n_reduce: 10,
            split_size: 1000,
            config: Config::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        ensure!(self.n_reduce > 0, "at least one reduce partition is required");
        ensure!(self.split_size > 0, "split size must be at least 1");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub documents: usize,
    pub skipped: usize,
    pub tokens: usize,
    pub pairs: usize,
    pub retries: usize,
    pub output: PathBuf,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents ({} skipped), {} distinct tokens, {} similar pairs written to {}",
            self.documents,
            self.skipped,
            self.tokens,
            self.pairs,
            self.output.display()
        )
    }
}

/// Tokenize and invert, then aggregate, then write the sorted results. Each
/// job starts only after the previous one has fully committed its output.
pub fn run<S: Substrate>(substrate: &S, opts: &PipelineOptions) -> Result<Summary> {
    opts.validate()?;
    ensure!(
        !opts.output.exists(),
        "output location {} already exists",
        opts.output.display()
    );

    let corpus = input::read_corpus(&opts.input)?;
    info!(
        "read {} documents from {} ({} skipped)",
        corpus.documents.len(),
        opts.input.display(),
        corpus.skipped
    );
    let splits = input::write_splits(&corpus.documents, &opts.scratch.join("splits"), opts.split_size)?;

    let word_sets = substrate
        .run(Job {
            name: WORD_EXTRACTION.to_owned(),
            app: Arc::new(WordSetApp::new(&opts.config)),
            inputs: splits,
            output_dir: opts.scratch.join("word-sets"),
            n_reduce: opts.n_reduce,
        })
        .wrap_err_with(|| format!("{} failed", WORD_EXTRACTION))?;

    let similarity = substrate
        .run(Job {
            name: SIMILARITY.to_owned(),
            app: Arc::new(SimilarityApp::new(&opts.config)),
            inputs: word_sets.outputs,
            output_dir: opts.scratch.join("similarity"),
            n_reduce: opts.n_reduce,
        })
        .wrap_err_with(|| format!("{} failed", SIMILARITY))?;

    let mut results: Vec<SimilarityResult> = read_records::<DocPair, f64>(&similarity.outputs)?
        .into_iter()
        .map(|(pair, score)| SimilarityResult { pair, score })
        .collect();
    results.sort_by(|x, y| x.pair.cmp(&y.pair));
    output::write_results(&results, &opts.output)?;

    Ok(Summary {
        documents: corpus.documents.len(),
        skipped: corpus.skipped,
        tokens: word_sets.records_out,
        pairs: results.len(),
        retries: word_sets.retries + similarity.retries,
        output: opts.output.clone(),
    })
}
