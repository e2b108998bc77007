pub use eyre::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fmt::Debug, hash::Hash, path::PathBuf, sync::Arc};

pub mod codec;
mod config;

pub use config::Config;

pub type DocId = String;
pub type Token = String;

/// A raw input document. Ids are unique within a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub text: String,
}

/// Why a document id cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadId {
    Blank,
    /// Tabs and line breaks would split an output record.
    Separator,
}

/// Ids must be non-blank and free of tabs and line breaks.
pub fn check_doc_id(id: &str) -> std::result::Result<(), BadId> {
    if id.trim().is_empty() {
        Err(BadId::Blank)
    } else if id.contains(|c| matches!(c, '\t' | '\n' | '\r')) {
        Err(BadId::Separator)
    } else {
        Ok(())
    }
}

/// Anything that can travel between stages through intermediate storage.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug + Send + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Clone + Debug + Send + 'static {}

/// A pair of pure map and reduce functions. Both may be invoked any number of
/// times on the same input, from any thread.
pub trait App: Debug + Send + Sync + 'static {
    type InKey: Record;
    type InValue: Record;
    type Key: Record + Ord + Hash;
    type Value: Record;
    type Output: Record;

    fn map(&self, k: Self::InKey, v: Self::InValue) -> Vec<(Self::Key, Self::Value)>;
    fn reduce(&self, k: &Self::Key, vs: Vec<Self::Value>) -> Option<Self::Output>;
}

/// One map/reduce job over record files.
#[derive(Debug)]
pub struct Job<A: App> {
    pub name: String,
    pub app: Arc<A>,
    /// Each file is one map partition of `(InKey, InValue)` records.
    pub inputs: Vec<PathBuf>,
    /// Receives `n_reduce` part files of `(Key, Output)` records.
    pub output_dir: PathBuf,
    pub n_reduce: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobReport {
    pub outputs: Vec<PathBuf>,
    pub map_tasks: usize,
    pub reduce_tasks: usize,
    pub records_out: usize,
    pub retries: usize,
}

/// Executes jobs: partition-parallel map, group-by-key shuffle, reduce, and
/// storage by path. Retry policy is the implementor's business.
pub trait Substrate {
    fn run<A: App>(&self, job: Job<A>) -> Result<JobReport>;
}
