// src/errors.rs

//! Crate-wide error type.
//!
//! Only configuration problems, instance-lock conflicts and interruption are
//! fatal to a run. A job whose command fails is *not* an error here; it is a
//! `ProcessResult` with a nonzero exit code.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HydraError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("job '{job}' depends on unknown job '{dependency}' in `after`")]
    UnknownDependency { job: String, dependency: String },

    #[error("duplicate job name: {0}")]
    DuplicateJob(String),

    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    #[error("another process is running (lock held on {0})")]
    AlreadyRunning(String),

    #[error("'{0}' has already been run")]
    JobAlreadyRan(String),

    #[error("{0} jobs failed")]
    JobsFailed(usize),

    #[error("received interrupt or terminate signal")]
    Interrupted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HydraError {
    /// True for errors raised while validating a job group before any job
    /// has been started.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HydraError::ConfigError(_)
                | HydraError::UnknownDependency { .. }
                | HydraError::DuplicateJob(_)
                | HydraError::DependencyCycle(_)
                | HydraError::YamlError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HydraError>;
