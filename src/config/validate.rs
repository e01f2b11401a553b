// src/config/validate.rs

use std::path::Path;
use std::time::Duration;

use serde_yaml::Value;

use crate::config::model::{JobConfig, JobFile};
use crate::errors::{HydraError, Result};
use crate::group::JobGroup;
use crate::job::{After, Job};

/// Turn a parsed job file into a [`JobGroup`] rooted at `output_dir`, with
/// its dependencies resolved.
///
/// This checks:
/// - the group has a name
/// - every job has a non-empty `cwd` and `cmd`
/// - `max_time`, when present, is a positive number of seconds
/// - job names are unique
/// - every `after` name exists and the dependencies are acyclic
pub fn to_job_group(file: JobFile, output_dir: &Path) -> Result<JobGroup> {
    let group_name = file.jobgroup.name().trim().to_string();
    if group_name.is_empty() {
        return Err(HydraError::ConfigError(
            "required configuration for [jobgroup] not found".to_string(),
        ));
    }

    let mut jobs = Vec::with_capacity(file.jobs.len());
    for (key, value) in file.jobs {
        let name = job_name(&key)?;
        let config: JobConfig = serde_yaml::from_value(value).map_err(|e| {
            HydraError::ConfigError(format!("job '{name}': {e}"))
        })?;
        jobs.push(to_job(name, config)?);
    }

    let group = JobGroup::new(group_name, jobs, output_dir)?;
    group.build_dependencies()?;
    Ok(group)
}

fn to_job(name: String, config: JobConfig) -> Result<Job> {
    if config.cwd.as_os_str().is_empty() {
        return Err(HydraError::ConfigError(format!(
            "job '{name}': `cwd` must not be empty"
        )));
    }

    let command = config.cmd.into_vec();
    if command.is_empty() {
        return Err(HydraError::ConfigError(format!(
            "job '{name}': `cmd` must not be empty"
        )));
    }

    let max_duration = match config.max_time {
        None => None,
        Some(secs) => Some(parse_max_time(&name, secs)?),
    };

    let after = After::from(config.after.map(|words| words.into_vec()));

    Ok(Job::new(name, config.cwd, command)
        .with_after(after)
        .with_max_duration(max_duration)
        .with_environment(config.env))
}

/// `max_time` in seconds as a `Duration`. Values that overflow a `Duration`
/// or round down to zero are rejected; `timeout 0` means no limit at all.
fn parse_max_time(name: &str, secs: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(HydraError::ConfigError(format!(
            "job '{name}': `max_time` must be a positive number of seconds (got {secs})"
        ))),
    }
}

/// Job names are mapping keys; YAML allows non-string scalars there
/// (an unquoted `true:` is a boolean), so take their text.
fn job_name(key: &Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(HydraError::ConfigError(format!(
            "job names must be scalars, got {other:?}"
        ))),
    }
}
