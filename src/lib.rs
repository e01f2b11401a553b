// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod group;
pub mod job;
pub mod lock;
pub mod logging;
pub mod staging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_job_group;
use crate::errors::HydraError;
use crate::group::JobGroup;
use crate::job::After;
use crate::lock::InstanceLock;

/// Everything the engine needs from the command line, passed explicitly.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub lock_file: PathBuf,
    pub quiet: bool,
    pub dry_run: bool,
}

impl From<&CliArgs> for RunOptions {
    fn from(args: &CliArgs) -> Self {
        Self {
            output_dir: args.output_dir.clone(),
            lock_file: args.lock_path(),
            quiet: args.quiet,
            dry_run: args.dry_run,
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - job file loading (all files are validated before anything runs)
/// - the single-instance lock
/// - running each job group in turn
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let options = RunOptions::from(&args);
    run_job_files(&args.jobfiles, &options).await
}

pub async fn run_job_files(paths: &[PathBuf], options: &RunOptions) -> Result<()> {
    let mut groups = Vec::with_capacity(paths.len());
    for path in paths {
        let group = load_job_group(path, &options.output_dir)
            .with_context(|| format!("loading job file {:?}", path))?;
        groups.push(group);
    }

    if options.dry_run {
        for group in &groups {
            print_dry_run(group);
        }
        return Ok(());
    }

    let _lock = InstanceLock::acquire(&options.lock_file)?;

    let failed = tokio::select! {
        res = run_groups(&mut groups, options.quiet) => res?,
        _ = shutdown_signal() => {
            warn!("received interrupt or terminate signal; abandoning run");
            return Err(HydraError::Interrupted.into());
        }
    };

    if failed > 0 {
        return Err(HydraError::JobsFailed(failed).into());
    }
    Ok(())
}

/// Run every group in order; returns the total number of failed jobs.
async fn run_groups(groups: &mut [JobGroup], quiet: bool) -> Result<usize> {
    let mut failed = 0;
    for group in groups.iter_mut() {
        group
            .run()
            .await
            .with_context(|| format!("running job group '{}'", group.name()))?;
        failed += group.failed_jobs().unwrap_or(0);

        if !quiet {
            println!();
            print!("{}", group.format_results());
        }
        if let Some(dir) = group.backup_dir() {
            info!(group = %group.name(), dir = %dir.display(), "run recorded");
        }
    }
    Ok(failed)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Simple dry-run output: print jobs, resolved dependencies and commands.
fn print_dry_run(group: &JobGroup) {
    println!("hydra dry-run: job group \"{}\"", group.name());
    println!("  output_dir = {}", group.output_dir().display());
    println!();

    let jobs = group.jobs();
    println!("jobs ({}):", jobs.len());
    for (idx, job) in jobs.iter().enumerate() {
        println!("  {}. {}", idx + 1, job.name());
        println!("      cmd: {:?}", job.argv());
        println!("      cwd: {}", job.working_directory().display());

        let deps: Vec<&str> = job
            .dependencies()
            .unwrap_or_default()
            .iter()
            .map(|&i| jobs[i].name())
            .collect();
        match job.after() {
            After::Previous if deps.is_empty() => {}
            After::Previous => println!("      after: {deps:?} (previous job)"),
            After::Nothing => println!("      after: [] (starts immediately)"),
            After::Jobs(_) => println!("      after: {deps:?}"),
        }
        if !job.environment().is_empty() {
            let keys: Vec<&String> = job.environment().keys().collect();
            println!("      env: {keys:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}
