use std::{fmt, path::PathBuf};
use uuid::Uuid;

pub type TaskId = String;

#[derive(Debug, Clone)]
pub struct MapTask {
    pub index: u64,
    pub file: PathBuf,
    pub n_reduce: u64,
}

#[derive(Debug, Clone)]
pub struct ReduceTask {
    pub index: u64,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum Inner {
    Map(MapTask),
    Reduce(ReduceTask),
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub attempt: usize,
    pub inner: Inner,
}

impl Task {
    pub fn new(inner: Inner) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            attempt: 0,
            inner,
        }
    }

    /// The same work under a fresh id, so a late completion of the previous
    /// attempt cannot be mistaken for this one.
    pub fn retry(self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            attempt: self.attempt + 1,
            inner: self.inner,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Map(map) => write!(f, "map#{}", map.index)?,
            Inner::Reduce(reduce) => write!(f, "reduce#{}", reduce.index)?,
        }
        write!(f, " (attempt {})", self.attempt + 1)
    }
}

#[derive(Debug)]
pub enum TaskOutput {
    Map { index: u64, files: Vec<PathBuf> },
    Reduce { index: u64, file: PathBuf, records: usize },
}
