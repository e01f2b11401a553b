#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hydra::group::JobGroup;
use hydra::job::{After, Job};

/// Builder for `Job` to simplify test setup.
///
/// Jobs default to running in the system temp directory.
pub struct JobBuilder {
    name: String,
    cwd: PathBuf,
    command: Vec<String>,
    after: After,
    max_duration: Option<Duration>,
    env: BTreeMap<String, String>,
}

impl JobBuilder {
    pub fn new(name: &str, command: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            cwd: std::env::temp_dir(),
            command: command.iter().map(|s| s.to_string()).collect(),
            after: After::Previous,
            max_duration: None,
            env: BTreeMap::new(),
        }
    }

    /// A job running `script` through `sh -c`.
    pub fn sh(name: &str, script: &str) -> Self {
        Self::new(name, &["sh", "-c", script])
    }

    pub fn after(mut self, dep: &str) -> Self {
        match &mut self.after {
            After::Jobs(deps) => deps.push(dep.to_string()),
            other => *other = After::Jobs(vec![dep.to_string()]),
        }
        self
    }

    pub fn after_nothing(mut self) -> Self {
        self.after = After::Nothing;
        self
    }

    pub fn max_duration(mut self, secs: u64) -> Self {
        self.max_duration = Some(Duration::from_secs(secs));
        self
    }

    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = cwd.as_ref().to_path_buf();
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> Job {
        Job::new(self.name, self.cwd, self.command)
            .with_after(self.after)
            .with_max_duration(self.max_duration)
            .with_environment(self.env)
    }
}

/// Builder for `JobGroup`.
pub struct JobGroupBuilder {
    name: String,
    jobs: Vec<Job>,
}

impl JobGroupBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            jobs: Vec::new(),
        }
    }

    pub fn with_job(mut self, job: JobBuilder) -> Self {
        self.jobs.push(job.build());
        self
    }

    /// Build a group whose runs land in `output_dir`.
    pub fn build(self, output_dir: impl AsRef<Path>) -> JobGroup {
        JobGroup::new(self.name, self.jobs, output_dir.as_ref())
            .expect("Failed to build valid job group from builder")
    }
}
