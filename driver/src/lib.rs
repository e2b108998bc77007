pub mod input;
pub mod output;
mod pipeline;

pub use pipeline::{run, PipelineOptions, Summary, SIMILARITY, WORD_EXTRACTION};

pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init()
}
