// src/group/mod.rs

//! Job groups: an ordered set of jobs executed together as one run.
//!
//! - [`dependencies`] resolves `after` declarations once, before running.
//! - [`wait`] implements the polling dependency barrier and its notices.
//! - [`summary`] renders the summary table.
//!
//! A run lives in `<output_dir>/<YYYY-MM-DD_HH.MM.SS>_<group>`. While the
//! run is in progress the directory carries a `.running` suffix, and each job
//! log carries a leading `,` until that job has finished.

pub mod dependencies;
pub mod summary;
pub mod wait;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{HydraError, Result};
use crate::exec::process::format_timestamp;
use crate::job::Job;
use crate::staging::{StagedDir, StagedFile};

pub use dependencies::build_dependencies;
pub use summary::{Summary, SUMMARY_FILE};

/// Write a `:: [timestamp] message` notice line to a job log.
pub(crate) fn notice(log: &File, message: impl fmt::Display) {
    let now = format_timestamp(&Local::now());
    if let Err(err) = writeln!(&*log, ":: [{now}] {message}") {
        warn!(error = %err, "failed to write notice to job log");
    }
}

/// Directory name for a run started at `start`.
pub fn run_identifier(start: &DateTime<Local>, group_name: &str) -> String {
    format!("{}_{}", start.format("%Y-%m-%d_%H.%M.%S"), group_name)
}

/// Log file name of the job at position `number` (1-based).
pub fn log_file_name(number: usize, job_name: &str) -> String {
    format!("{number}.{job_name}.log")
}

#[derive(Debug)]
pub struct JobGroup {
    name: String,
    jobs: Arc<[Job]>,
    output_dir: PathBuf,
    backup_dir: Option<PathBuf>,
    start_time: Option<DateTime<Local>>,
    end_time: Option<DateTime<Local>>,
    started_jobs: usize,
    finished_jobs: Arc<AtomicUsize>,
    failed_jobs: Option<usize>,
    summary_lock: Arc<Mutex<()>>,
}

impl JobGroup {
    /// Create a group whose runs are placed under `output_dir`.
    ///
    /// Fails if the group name is empty or two jobs share a name.
    pub fn new(
        name: impl Into<String>,
        jobs: Vec<Job>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HydraError::ConfigError(
                "job group name must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for job in &jobs {
            if !seen.insert(job.name()) {
                return Err(HydraError::DuplicateJob(job.name().to_string()));
            }
        }

        Ok(Self {
            name,
            jobs: jobs.into(),
            output_dir: output_dir.into(),
            backup_dir: None,
            start_time: None,
            end_time: None,
            started_jobs: 0,
            finished_jobs: Arc::new(AtomicUsize::new(0)),
            failed_jobs: None,
            summary_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get_job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.name() == name)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where this run's logs live: the staged directory while running, the
    /// final directory once the run completed.
    pub fn backup_dir(&self) -> Option<&Path> {
        self.backup_dir.as_deref()
    }

    pub fn start_time(&self) -> Option<DateTime<Local>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Local>> {
        self.end_time
    }

    pub fn started_jobs(&self) -> usize {
        self.started_jobs
    }

    pub fn finished_jobs(&self) -> usize {
        self.finished_jobs.load(Ordering::Acquire)
    }

    /// Number of jobs with a nonzero exit code; `None` until the run ended.
    pub fn failed_jobs(&self) -> Option<usize> {
        self.failed_jobs
    }

    /// Resolve every job's dependencies. Must succeed before [`run`](Self::run)
    /// starts any job; `run` calls it itself.
    pub fn build_dependencies(&self) -> Result<()> {
        build_dependencies(&self.jobs)
    }

    pub fn summary(&self) -> Summary<'_> {
        Summary {
            group_name: &self.name,
            jobs: &self.jobs,
            start_time: self.start_time,
            end_time: self.end_time,
            started_jobs: self.started_jobs,
            failed_jobs: self.failed_jobs,
        }
    }

    /// The summary table as shown on the console.
    pub fn format_results(&self) -> String {
        self.summary().to_string()
    }

    /// Run all jobs. Returns `true` if any job failed.
    ///
    /// Only configuration and filesystem problems are errors; failing
    /// commands are reported through the results and the return value.
    pub async fn run(&mut self) -> Result<bool> {
        if self.start_time.is_some() {
            return Err(HydraError::JobAlreadyRan(self.name.clone()));
        }
        self.build_dependencies()?;

        let start = Local::now();
        self.start_time = Some(start);

        let final_dir = self.output_dir.join(run_identifier(&start, &self.name));
        let staged_dir = StagedDir::create(&final_dir)?;
        self.backup_dir = Some(staged_dir.path().to_path_buf());
        info!(
            group = %self.name,
            jobs = self.jobs.len(),
            dir = %staged_dir.path().display(),
            "starting job group"
        );

        let ctx = Arc::new(RunContext {
            group_name: self.name.clone(),
            jobs: Arc::clone(&self.jobs),
            run_dir: staged_dir.path().to_path_buf(),
            start_time: start,
            finished_jobs: Arc::clone(&self.finished_jobs),
            summary_lock: Arc::clone(&self.summary_lock),
        });
        ctx.run_all().await;

        self.end_time = Some(Local::now());
        let results: Vec<_> = self.jobs.iter().filter_map(Job::result).collect();
        self.started_jobs = results.len();
        let failed = results.iter().filter(|r| !r.success()).count();
        self.failed_jobs = Some(failed);

        write_summary(&self.summary_lock, staged_dir.path(), &self.summary()).await?;

        let final_dir = staged_dir.commit()?;
        info!(
            group = %self.name,
            started = self.started_jobs,
            failed,
            dir = %final_dir.display(),
            "job group finished"
        );
        self.backup_dir = Some(final_dir);

        Ok(failed > 0)
    }
}

/// Rewrite `summary.log` in `dir`, serialized by `lock`.
async fn write_summary(lock: &Mutex<()>, dir: &Path, summary: &Summary<'_>) -> Result<()> {
    let _guard = lock.lock().await;
    let staged = StagedFile::create(dir.join(SUMMARY_FILE))?;
    write!(staged.file(), "{summary}")?;
    staged.commit()?;
    Ok(())
}

/// Counts a job task as finished when dropped, so a task that panics is
/// counted too.
struct FinishedGuard<'a>(&'a AtomicUsize);

impl Drop for FinishedGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

/// State shared by the per-job tasks of one run.
struct RunContext {
    group_name: String,
    jobs: Arc<[Job]>,
    run_dir: PathBuf,
    start_time: DateTime<Local>,
    finished_jobs: Arc<AtomicUsize>,
    summary_lock: Arc<Mutex<()>>,
}

impl RunContext {
    /// Start one task per job and wait for all of them.
    async fn run_all(self: &Arc<Self>) {
        let mut tasks = JoinSet::new();
        let mut task_jobs = HashMap::new();

        for index in 0..self.jobs.len() {
            let ctx = Arc::clone(self);
            let handle = tasks.spawn(async move { ctx.run_job_task(index).await });
            task_jobs.insert(handle.id(), index);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                let index = task_jobs.get(&err.id()).copied();
                error!(job = ?index.map(|i| self.jobs[i].name()), error = %err, "job task aborted");
                if let Some(index) = index {
                    self.jobs[index].record_launch_failure();
                    self.refresh_summary().await;
                }
            }
        }
    }

    async fn run_job_task(&self, index: usize) {
        let job = &self.jobs[index];
        let finished = FinishedGuard(&self.finished_jobs);
        if let Err(err) = self.run_job(index).await {
            error!(job = %job.name(), error = %err, "job execution error");
            job.record_launch_failure();
        }
        drop(finished);
        self.refresh_summary().await;
    }

    async fn run_job(&self, index: usize) -> Result<()> {
        let job = &self.jobs[index];
        let number = index + 1;

        let log = StagedFile::create(self.run_dir.join(log_file_name(number, job.name())))?;
        wait::wait_for_dependencies(&self.jobs, job, log.file()).await;

        notice(log.file(), format_args!("starting job {number}: {job}"));
        info!(job = %job.name(), number, "starting job");

        let log_path = log.final_path().to_path_buf();
        let result = job.run(log.file(), &log_path).await?;

        notice(log.file(), format_args!("finished job {number}: {job}"));
        if job.timed_out() {
            let limit = job.max_duration().unwrap_or_default();
            notice(
                log.file(),
                format_args!(
                    "timeout triggered because job exceeded max time of {}",
                    crate::exec::format_elapsed(limit)
                ),
            );
            warn!(
                job = %job.name(),
                number,
                max_secs = limit.as_secs_f64(),
                "job killed for exceeding its max time"
            );
        }
        log.commit()?;

        info!(
            job = %job.name(),
            number,
            exit_code = result.exit_code,
            elapsed = %crate::exec::format_elapsed(result.elapsed()),
            "job finished"
        );
        Ok(())
    }

    /// Rewrite the live summary. Failures are logged, not propagated: a
    /// missing summary must not fail a job.
    async fn refresh_summary(&self) {
        let summary = Summary {
            group_name: &self.group_name,
            jobs: &self.jobs,
            start_time: Some(self.start_time),
            end_time: None,
            started_jobs: 0,
            failed_jobs: None,
        };
        if let Err(err) = write_summary(&self.summary_lock, &self.run_dir, &summary).await {
            warn!(error = %err, "failed to write summary");
        } else {
            debug!(dir = %self.run_dir.display(), "summary updated");
        }
    }
}
