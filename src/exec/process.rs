// src/exec/process.rs

//! Single external command execution.
//!
//! [`run_process`] never fails through the error channel: a command that
//! cannot be launched is reported as a [`ProcessResult`] with
//! [`LAUNCH_FAILURE_EXIT_CODE`], and the reason is written to the output
//! sink.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit code recorded when the process could not be started at all.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;

/// Exit code the `timeout` wrapper uses when it had to kill the command.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Outcome of one finished (or never started) process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub command: Vec<String>,
    pub working_directory: PathBuf,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub exit_code: i32,
}

impl ProcessResult {
    /// Result for a command that never got as far as running.
    pub fn launch_failure(command: Vec<String>, working_directory: PathBuf) -> Self {
        let now = Local::now();
        Self {
            command,
            working_directory,
            start_time: now,
            end_time: now,
            exit_code: LAUNCH_FAILURE_EXIT_CODE,
        }
    }

    pub fn elapsed(&self) -> Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or_default()
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Append the `:: RunResult` trailer describing this result.
    pub fn write_trailer(&self, mut sink: impl Write) -> std::io::Result<()> {
        writeln!(sink, ":: RunResult")?;
        writeln!(sink, ":: {:<12}: {:?}", "command", self.command)?;
        writeln!(sink, ":: {:<12}: {}", "cwd", self.working_directory.display())?;
        writeln!(sink, ":: {:<12}: {}", "start_time", format_timestamp(&self.start_time))?;
        writeln!(sink, ":: {:<12}: {}", "end_time", format_timestamp(&self.end_time))?;
        writeln!(sink, ":: {:<12}: {}", "elapsed_time", format_elapsed(self.elapsed()))?;
        writeln!(sink, ":: {:<12}: {}", "exit_code", self.exit_code)?;
        Ok(())
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProcessResult(exit_code={} elapsed={})",
            self.exit_code,
            format_elapsed(self.elapsed())
        )
    }
}

/// Run `argv` in `cwd`, sending stdout and stderr merged into `sink`.
///
/// The sink is shared with the child through duplicated file handles, so
/// anything the caller writes before and after lands in order around the
/// command output.
pub async fn run_process(
    argv: &[String],
    cwd: &Path,
    sink: &File,
    env: &BTreeMap<String, String>,
) -> ProcessResult {
    let start_time = Local::now();

    let exit_code = match spawn_and_wait(argv, cwd, sink, env).await {
        Ok(status) => exit_code_of(status),
        Err(err) => {
            warn!(command = ?argv, error = %err, "unable to launch process");
            if let Err(write_err) = writeln!(&*sink, "{err}") {
                warn!(error = %write_err, "failed to write launch error to job log");
            }
            LAUNCH_FAILURE_EXIT_CODE
        }
    };

    let result = ProcessResult {
        command: argv.to_vec(),
        working_directory: cwd.to_path_buf(),
        start_time,
        end_time: Local::now(),
        exit_code,
    };

    if let Err(err) = result.write_trailer(sink) {
        warn!(error = %err, "failed to write RunResult trailer");
    }

    result
}

async fn spawn_and_wait(
    argv: &[String],
    cwd: &Path,
    sink: &File,
    env: &BTreeMap<String, String>,
) -> std::io::Result<ExitStatus> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command")
    })?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::from(sink.try_clone()?))
        .stderr(Stdio::from(sink.try_clone()?))
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;
    debug!(command = ?argv, pid = child.id(), "process started");
    child.wait().await
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(LAUNCH_FAILURE_EXIT_CODE)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(LAUNCH_FAILURE_EXIT_CODE)
}

/// Local timestamp with microseconds, as used in job logs.
pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Render a duration as `H:MM:SS`, with `.ffffff` when there are
/// sub-second parts.
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    let micros = d.subsec_micros();
    if micros == 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{h}:{m:02}:{s:02}.{micros:06}")
    }
}
