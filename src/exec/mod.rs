// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] runs one external command with merged output capture and
//!   produces a [`ProcessResult`].
//! - [`timeout`] builds the `timeout`-wrapped argv for jobs with a time limit.

pub mod process;
pub mod timeout;

pub use process::{
    format_elapsed, run_process, ProcessResult, LAUNCH_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE,
};
pub use timeout::wrap_command;
