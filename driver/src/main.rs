use common::{Config, Result};
use driver::{init_logger, run, PipelineOptions, Summary};
use eyre::{ensure, WrapErr};
use log::warn;
use parallel::{Options, Parallel};
use sequential::Sequential;
use std::{fs, path::PathBuf, time::Duration};
use structopt::StructOpt;

fn parse_count(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_owned()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_partitions(s: &str) -> Result<u64, String> {
    parse_count(s).map(|n| n as u64)
}

fn parse_fanout(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n < 2 => Err("must be at least 2".to_owned()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_score(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(score) if (0.0..=1.0).contains(&score) => Ok(score),
        Ok(_) => Err("must lie in [0, 1]".to_owned()),
        Err(e) => Err(e.to_string()),
    }
}

#[derive(StructOpt, Debug)]
#[structopt(
    name = "doc-similarity",
    about = "Pairwise Jaccard similarity of documents by their shared words"
)]
struct Opt {
    /// Input file or directory of documents
    input: PathBuf,
    /// Output directory; must not exist
    output: PathBuf,

    /// Tokens shorter than this many characters are ignored
    #[structopt(long, default_value = "1", parse(try_from_str = parse_count))]
    min_token_len: usize,
    /// Drop tokens found in more documents than this
    #[structopt(long, parse(try_from_str = parse_count))]
    max_doc_freq: Option<usize>,
    /// Skip pairwise expansion of tokens found in more documents than this
    #[structopt(long, default_value = "1000", parse(try_from_str = parse_fanout))]
    max_pair_fanout: usize,
    /// Only emit pairs scoring at least this
    #[structopt(long, default_value = "0", parse(try_from_str = parse_score))]
    min_score: f64,

    #[structopt(short = "r", long, default_value = "10", parse(try_from_str = parse_partitions))]
    n_reduce: u64,
    /// Documents per map partition
    #[structopt(long, default_value = "1000", parse(try_from_str = parse_count))]
    split_size: usize,
    /// Directory for intermediate records; must not exist
    #[structopt(long, default_value = "intermediate_output")]
    scratch: PathBuf,
    /// Leave the intermediate records in place
    #[structopt(long)]
    keep_intermediate: bool,

    /// Run every task on the main thread
    #[structopt(long)]
    sequential: bool,
    #[structopt(short, long, default_value = "4", parse(try_from_str = parse_count))]
    workers: usize,
    #[structopt(long, default_value = "4", parse(try_from_str = parse_count))]
    max_attempts: usize,
    #[structopt(long, default_value = "600", parse(try_from_str = parse_count))]
    task_timeout_secs: usize,
}

impl Opt {
    fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            n_reduce: self.n_reduce,
            split_size: self.split_size,
            config: Config {
                min_token_len: self.min_token_len,
                max_doc_freq: self.max_doc_freq,
                max_pair_fanout: self.max_pair_fanout,
                min_score: self.min_score,
            },
            ..PipelineOptions::new(&self.input, &self.output, &self.scratch)
        }
    }

    fn parallel_options(&self) -> Options {
        Options {
            workers: self.workers,
            max_attempts: self.max_attempts,
            task_timeout: Duration::from_secs(self.task_timeout_secs as u64),
        }
    }
}

fn execute(opt: &Opt, options: &PipelineOptions) -> Result<Summary> {
    if opt.sequential {
        run(&Sequential, options)
    } else {
        run(&Parallel::new(opt.parallel_options())?, options)
    }
}

fn main() -> Result<()> {
    init_logger();

    let opt = Opt::from_args();
    let options = opt.pipeline_options();
    options.validate()?;

    ensure!(
        !options.scratch.exists(),
        "scratch location {} already exists",
        options.scratch.display()
    );
    fs::create_dir_all(&options.scratch)
        .wrap_err_with(|| format!("failed to create {}", options.scratch.display()))?;

    let result = execute(&opt, &options);

    if !opt.keep_intermediate {
        if let Err(e) = fs::remove_dir_all(&options.scratch) {
            warn!("failed to remove {}: {}", options.scratch.display(), e);
        }
    }

    let summary = result?;
    println!("Document similarity completed successfully!");
    println!("{}", summary);
    Ok(())
}
