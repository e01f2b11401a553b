// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::lock::LOCK_FILE_NAME;

/// Command-line arguments for `hydra`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hydra",
    version,
    about = "Run groups of dependent commands and keep a durable record of each run.",
    long_about = None
)]
pub struct CliArgs {
    /// Job files (YAML) to run, in order.
    #[arg(value_name = "JOBFILE", required = true)]
    pub jobfiles: Vec<PathBuf>,

    /// Directory under which run directories are created.
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub output_dir: PathBuf,

    /// Lock file guarding against concurrent runs.
    ///
    /// Default: `.hydra.lock` inside the output directory.
    #[arg(long, value_name = "PATH")]
    pub lock_file: Option<PathBuf>,

    /// Do not print the summary report.
    #[arg(long, short)]
    pub quiet: bool,

    /// Load and validate job files, print the jobs, run nothing.
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HYDRA_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    pub fn lock_path(&self) -> PathBuf {
        self.lock_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join(LOCK_FILE_NAME))
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
