// src/exec/timeout.rs

//! Time limits are enforced by the external `timeout` utility rather than by
//! us: it kills the command on overrun and exits with
//! [`TIMEOUT_EXIT_CODE`](super::TIMEOUT_EXIT_CODE).

use std::time::Duration;

/// Program used to wrap commands that have a maximum duration.
pub const TIMEOUT_PROGRAM: &str = "timeout";

/// Build the argv to execute, prefixing `timeout <secs>` when a limit is set.
pub fn wrap_command(command: &[String], max_duration: Option<Duration>) -> Vec<String> {
    let mut argv = Vec::with_capacity(command.len() + 2);
    if let Some(limit) = max_duration {
        argv.push(TIMEOUT_PROGRAM.to_string());
        argv.push(format_seconds(limit));
    }
    argv.extend(command.iter().cloned());
    argv
}

fn format_seconds(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        d.as_secs_f64().to_string()
    }
}
