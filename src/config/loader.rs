// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::JobFile;
use crate::config::validate::to_job_group;
use crate::errors::Result;
use crate::group::JobGroup;

/// Load a job file from a given path and return the raw `JobFile`.
///
/// This only performs YAML deserialization; it does **not** check the jobs
/// or resolve dependencies. Use [`load_job_group`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<JobFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<JobFile> {
    Ok(serde_yaml::from_str(contents)?)
}

/// Load a job file and turn it into a ready-to-run [`JobGroup`] whose runs
/// are placed under `output_dir`.
pub fn load_job_group(path: impl AsRef<Path>, output_dir: &Path) -> Result<JobGroup> {
    let path = path.as_ref();
    let file = load_from_path(path)?;
    let group = to_job_group(file, output_dir)?;
    debug!(
        path = %path.display(),
        group = %group.name(),
        jobs = group.jobs().len(),
        "loaded job file"
    );
    Ok(group)
}
