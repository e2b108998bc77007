use crate::{
    task::{Inner, MapTask, ReduceTask, Task, TaskId, TaskOutput},
    worker, Options, Queue,
};
use common::{App, Job, JobReport, Result};
use dashmap::{mapref::entry::Entry, DashMap};
use eyre::{ensure, eyre, Report, WrapErr};
use futures::future::try_join_all;
use log::{error, info, warn};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{fs, sync::Mutex, time};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

type TaskMap = DashMap<TaskId, Task>;

/// Drives one job through its map and reduce phases. Workers pull tasks from
/// `pending`; a phase ends when every one of its partitions has committed.
/// An empty queue alone says nothing, since a failing task is re-queued only
/// after its attempt returns.
#[derive(Debug)]
pub struct Coordinator<A: App> {
    name: String,
    app: Arc<A>,
    opt: Options,
    inputs: Vec<PathBuf>,
    n_reduce: u64,
    output_dir: PathBuf,
    temp_dir: PathBuf,

    pending: Queue<Task>,
    running: TaskMap,
    map_files: DashMap<u64, Vec<PathBuf>>,
    reduce_files: DashMap<u64, (PathBuf, usize)>,
    /// Partitions of the current phase without a committed output.
    remaining: AtomicUsize,

    retries: AtomicUsize,
    failed: AtomicBool,
    failure: Mutex<Option<Report>>,
}

impl<A: App> Coordinator<A> {
    pub fn new(job: Job<A>, opt: Options) -> Self {
        let Job {
            name,
            app,
            inputs,
            output_dir,
            n_reduce,
        } = job;
        let task_capacity = inputs.len().max(n_reduce as usize);

        Self {
            name,
            app,
            opt,
            inputs,
            n_reduce,
            temp_dir: output_dir.join("_temporary"),
            output_dir,
            pending: Queue::new(task_capacity),
            running: TaskMap::new(),
            map_files: DashMap::new(),
            reduce_files: DashMap::new(),
            remaining: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            failure: Mutex::new(None),
        }
    }

    fn init_map(&self) -> Result<()> {
        self.remaining.store(self.inputs.len(), Ordering::Release);
        let map_tasks = self.inputs.iter().enumerate().map(|(i, path)| MapTask {
            index: i as u64,
            file: path.clone(),
            n_reduce: self.n_reduce,
        });

        for task in map_tasks {
            ensure!(
                self.pending.push(Task::new(Inner::Map(task))),
                "task queue is full"
            );
        }
        Ok(())
    }

    fn init_reduce(&self) -> Result<()> {
        debug_assert!(self.pending.is_empty() && self.running.is_empty());
        self.remaining.store(self.n_reduce as usize, Ordering::Release);

        let mut reduce_tasks: Vec<ReduceTask> = (0..self.n_reduce)
            .map(|index| ReduceTask {
                index,
                files: Vec::with_capacity(self.inputs.len()),
            })
            .collect();
        for index in 0..self.inputs.len() as u64 {
            let files = self
                .map_files
                .get(&index)
                .ok_or_else(|| eyre!("no committed output for map#{}", index))?;
            for (reduce, file) in reduce_tasks.iter_mut().zip(files.iter()) {
                reduce.files.push(file.clone());
            }
        }

        for task in reduce_tasks {
            ensure!(
                self.pending.push(Task::new(Inner::Reduce(task))),
                "task queue is full"
            );
        }
        Ok(())
    }

    pub async fn run(self) -> Result<JobReport> {
        ensure!(self.n_reduce > 0, "{}: at least one reduce partition is required", self.name);
        fs::create_dir_all(&self.temp_dir)
            .await
            .wrap_err_with(|| format!("failed to create {}", self.temp_dir.display()))?;
        let this = Arc::new(self);

        info!("{}: map phase, {} tasks", this.name, this.inputs.len());
        this.init_map()?;
        Arc::clone(&this).run_phase().await?;

        info!("{}: map done, init reduce", this.name);
        this.init_reduce()?;
        Arc::clone(&this).run_phase().await?;

        fs::remove_dir_all(&this.temp_dir)
            .await
            .wrap_err_with(|| format!("failed to remove {}", this.temp_dir.display()))?;

        let mut outputs = Vec::with_capacity(this.n_reduce as usize);
        let mut records_out = 0;
        for index in 0..this.n_reduce {
            let committed = this
                .reduce_files
                .get(&index)
                .ok_or_else(|| eyre!("no committed output for reduce#{}", index))?;
            let (file, records) = committed.value();
            outputs.push(file.clone());
            records_out += records;
        }

        let retries = this.retries.load(Ordering::Acquire);
        info!("{}: all done, {} records, {} retries", this.name, records_out, retries);
        Ok(JobReport {
            outputs,
            map_tasks: this.inputs.len(),
            reduce_tasks: this.n_reduce as usize,
            records_out,
            retries,
        })
    }

    async fn run_phase(self: Arc<Self>) -> Result<()> {
        let workers = (0..self.opt.workers).map(|_| tokio::spawn(Arc::clone(&self).work()));
        try_join_all(workers).await?;

        match self.failure.lock().await.take() {
            Some(report) => Err(report),
            None => Ok(()),
        }
    }

    async fn work(self: Arc<Self>) {
        loop {
            if self.failed.load(Ordering::Acquire) {
                return;
            }
            match self.pending.pop() {
                Some(task) => self.execute(task).await,
                None if self.remaining.load(Ordering::Acquire) == 0 => return,
                None => time::sleep(POLL_INTERVAL).await,
            }
        }
    }

    async fn execute(&self, task: Task) {
        self.running.insert(task.id.clone(), task.clone());
        info!("{}: running {}", self.name, task);

        let result = match time::timeout(self.opt.task_timeout, self.attempt(&task)).await {
            Ok(result) => result,
            Err(_) => Err(eyre!("timed out after {:?}", self.opt.task_timeout)),
        };
        let id = task.id.clone();
        match result {
            Ok(output) => self.commit(&task, output),
            Err(report) => self.retry(task, report).await,
        }
        self.running.remove(&id);
    }

    async fn attempt(&self, task: &Task) -> Result<TaskOutput> {
        let app = Arc::clone(&self.app);
        match &task.inner {
            Inner::Map(map) => {
                let index = map.index;
                let files = worker::run_map(app, map.clone(), &self.temp_dir).await?;
                Ok(TaskOutput::Map { index, files })
            }
            Inner::Reduce(reduce) => {
                let index = reduce.index;
                let (file, records) =
                    worker::run_reduce(app, reduce.clone(), &self.temp_dir, &self.output_dir)
                        .await?;
                Ok(TaskOutput::Reduce {
                    index,
                    file,
                    records,
                })
            }
        }
    }

    /// The first successful attempt of a partition wins.
    fn commit(&self, task: &Task, output: TaskOutput) {
        let first = match output {
            TaskOutput::Map { index, files } => match self.map_files.entry(index) {
                Entry::Vacant(slot) => {
                    slot.insert(files);
                    true
                }
                Entry::Occupied(_) => false,
            },
            TaskOutput::Reduce {
                index,
                file,
                records,
            } => match self.reduce_files.entry(index) {
                Entry::Vacant(slot) => {
                    slot.insert((file, records));
                    true
                }
                Entry::Occupied(_) => false,
            },
        };
        if first {
            self.remaining.fetch_sub(1, Ordering::AcqRel);
        }
        info!("{}: task done: {}", self.name, task);
    }

    async fn retry(&self, task: Task, report: Report) {
        if task.attempt + 1 >= self.opt.max_attempts {
            error!("{}: {} failed, giving up: {:#}", self.name, task, report);
            let attempts = task.attempt + 1;
            self.fail(report.wrap_err(format!("{}: {} failed after {} attempts", self.name, task, attempts)))
                .await;
            return;
        }

        warn!("{}: {} failed, retrying: {:#}", self.name, task, report);
        self.retries.fetch_add(1, Ordering::SeqCst);
        if !self.pending.push(task.retry()) {
            self.fail(eyre!("{}: task queue is full", self.name)).await;
        }
    }

    async fn fail(&self, report: Report) {
        let mut failure = self.failure.lock().await;
        if failure.is_none() {
            *failure = Some(report);
        }
        self.failed.store(true, Ordering::Release);
    }
}
