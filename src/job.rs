// src/job.rs

//! A single named command and its lifecycle state.
//!
//! A `Job` is shared between the tasks of its group while the group runs.
//! Everything that changes after construction (resolved dependencies, log
//! path, result) is written exactly once, so it is held in `OnceLock`s and
//! read without further locking.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use tracing::debug;

use crate::errors::{HydraError, Result};
use crate::exec::{run_process, wrap_command, ProcessResult, TIMEOUT_EXIT_CODE};

/// How a job declares what it runs after.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum After {
    /// Nothing declared: run after the job declared immediately before it.
    #[default]
    Previous,
    /// Explicitly no dependencies; eligible to start immediately.
    Nothing,
    /// Run after exactly these jobs.
    Jobs(Vec<String>),
}

impl From<Option<Vec<String>>> for After {
    fn from(value: Option<Vec<String>>) -> Self {
        match value {
            None => After::Previous,
            Some(names) if names.is_empty() => After::Nothing,
            Some(names) => After::Jobs(names),
        }
    }
}

#[derive(Debug)]
pub struct Job {
    name: String,
    working_directory: PathBuf,
    command: Vec<String>,
    environment: BTreeMap<String, String>,
    max_duration: Option<Duration>,
    after: After,

    /// Indexes into the owning group's job list.
    dependencies: OnceLock<Vec<usize>>,
    log_path: OnceLock<PathBuf>,
    result: OnceLock<ProcessResult>,
}

impl Job {
    pub fn new(
        name: impl Into<String>,
        working_directory: impl Into<PathBuf>,
        command: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            working_directory: working_directory.into(),
            command,
            environment: BTreeMap::new(),
            max_duration: None,
            after: After::Previous,
            dependencies: OnceLock::new(),
            log_path: OnceLock::new(),
            result: OnceLock::new(),
        }
    }

    pub fn with_after(mut self, after: After) -> Self {
        self.after = after;
        self
    }

    pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    pub fn after(&self) -> &After {
        &self.after
    }

    /// Resolved dependencies, or `None` before the group resolved them.
    pub fn dependencies(&self) -> Option<&[usize]> {
        self.dependencies.get().map(Vec::as_slice)
    }

    pub(crate) fn set_dependencies(&self, deps: Vec<usize>) -> bool {
        self.dependencies.set(deps).is_ok()
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.get().map(PathBuf::as_path)
    }

    pub fn result(&self) -> Option<&ProcessResult> {
        self.result.get()
    }

    pub fn is_finished(&self) -> bool {
        self.result.get().is_some()
    }

    /// True when the job had a time limit and the `timeout` wrapper killed it.
    pub fn timed_out(&self) -> bool {
        self.max_duration.is_some()
            && self
                .result()
                .is_some_and(|r| r.exit_code == TIMEOUT_EXIT_CODE)
    }

    /// The argv actually executed, including the timeout wrapper.
    pub fn argv(&self) -> Vec<String> {
        wrap_command(&self.command, self.max_duration)
    }

    /// Run the command once, writing all output to `log`.
    pub async fn run(&self, log: &File, log_path: &Path) -> Result<&ProcessResult> {
        if self.is_finished() || self.log_path.set(log_path.to_path_buf()).is_err() {
            return Err(HydraError::JobAlreadyRan(self.name.clone()));
        }

        let argv = self.argv();
        debug!(job = %self.name, ?argv, "running job command");
        let result = run_process(&argv, &self.working_directory, log, &self.environment).await;
        self.record(result)
    }

    /// Record a launch failure for a job whose task broke down before its
    /// command produced a result. Has no effect on a finished job.
    pub(crate) fn record_launch_failure(&self) {
        self.record_result(ProcessResult::launch_failure(
            self.argv(),
            self.working_directory.clone(),
        ));
    }

    /// Store the job's result. Returns false if it already had one.
    pub(crate) fn record_result(&self, result: ProcessResult) -> bool {
        self.result.set(result).is_ok()
    }

    fn record(&self, result: ProcessResult) -> Result<&ProcessResult> {
        if !self.record_result(result) {
            return Err(HydraError::JobAlreadyRan(self.name.clone()));
        }
        self.result
            .get()
            .ok_or_else(|| HydraError::JobAlreadyRan(self.name.clone()))
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job(\"{}\"", self.name)?;
        match &self.after {
            After::Previous => {}
            After::Nothing => write!(f, " after=[]")?,
            After::Jobs(names) => write!(f, " after={names:?}")?,
        }
        if let Some(result) = self.result() {
            write!(f, " {result}")?;
        }
        if let Some(path) = self.log_path() {
            write!(f, " log={}", path.display())?;
        }
        write!(
            f,
            " cmd={:?} cwd={})",
            self.command,
            self.working_directory.display()
        )
    }
}
