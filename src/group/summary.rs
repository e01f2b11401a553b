// src/group/summary.rs

//! Fixed-width summary table of a job group's state.
//!
//! Used for the live `summary.log` (rewritten after each job finishes) and
//! for the final console report.

use std::fmt;

use chrono::{DateTime, Local};

use crate::exec::format_elapsed;
use crate::job::Job;

/// Name of the summary file inside a run directory.
pub const SUMMARY_FILE: &str = "summary.log";

/// A borrowed snapshot of everything the table needs.
#[derive(Debug, Clone, Copy)]
pub struct Summary<'a> {
    pub group_name: &'a str,
    pub jobs: &'a [Job],
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
    pub started_jobs: usize,
    pub failed_jobs: Option<usize>,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary for Job Group \"{}\"", self.group_name)?;
        writeln!(f)?;
        write_row(f, "FLAG", "JOB", "EXIT", "ELAPSED", "JOB NAME")?;

        for (idx, job) in self.jobs.iter().enumerate() {
            let number = (idx + 1).to_string();
            match job.result() {
                Some(result) => {
                    let flag = if result.exit_code != 0 { "!" } else { "" };
                    write_row(
                        f,
                        flag,
                        &number,
                        &result.exit_code.to_string(),
                        &format_elapsed(result.elapsed()),
                        job.name(),
                    )?;
                }
                None => {
                    let state = if job.log_path().is_some() {
                        "running"
                    } else {
                        "queued"
                    };
                    write_row(f, "", &number, "", state, job.name())?;
                }
            }
        }

        if let Some(end) = self.end_time {
            let elapsed = self
                .start_time
                .and_then(|start| (end - start).to_std().ok())
                .unwrap_or_default();
            writeln!(f)?;
            writeln!(
                f,
                "{} jobs total in {}",
                self.started_jobs,
                format_elapsed(elapsed)
            )?;
            match self.failed_jobs {
                Some(0) => {}
                Some(n) => writeln!(f, "{n} jobs failed")?,
                None => writeln!(f, "failed job count unknown")?,
            }
        }

        Ok(())
    }
}

fn write_row(
    f: &mut fmt::Formatter<'_>,
    flag: &str,
    number: &str,
    exit_code: &str,
    elapsed: &str,
    name: &str,
) -> fmt::Result {
    writeln!(
        f,
        "{flag:<4}  {number:>3}  {exit_code:>4}  {elapsed:<15}  {name}"
    )
}
