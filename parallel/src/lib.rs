//! In-process partition-parallel substrate: a coordinator hands map and
//! reduce tasks to a pool of async workers, re-queues tasks that fail, panic
//! or time out, and commits the first successful attempt of every partition.

use common::{App, Job, JobReport, Result, Substrate};
use eyre::{ensure, WrapErr};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

mod coordinator;
mod queue;
mod task;
mod worker;

use coordinator::Coordinator;
pub use queue::Queue;

#[derive(Debug, Clone)]
pub struct Options {
    /// Tasks executed at once.
    pub workers: usize,
    /// Attempts per task before the job fails.
    pub max_attempts: usize,
    /// An attempt running longer is abandoned and retried.
    pub task_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 4,
            task_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug)]
pub struct Parallel {
    opt: Options,
    runtime: Runtime,
}

impl Parallel {
    pub fn new(opt: Options) -> Result<Self> {
        ensure!(opt.workers > 0, "at least one worker is required");
        ensure!(opt.max_attempts > 0, "at least one attempt per task is required");

        let runtime = Builder::new_multi_thread()
            .worker_threads(opt.workers)
            .thread_name("parallel-worker")
            .enable_all()
            .build()
            .wrap_err("failed to start worker runtime")?;
        Ok(Self { opt, runtime })
    }
}

impl Substrate for Parallel {
    fn run<A: App>(&self, job: Job<A>) -> Result<JobReport> {
        let coordinator = Coordinator::new(job, self.opt.clone());
        self.runtime.block_on(coordinator.run())
    }
}
