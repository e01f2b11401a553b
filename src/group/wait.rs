// src/group/wait.rs

//! Dependency wait discipline.
//!
//! A job task polls its dependencies once per second. While it waits it
//! writes notices to its own log: one immediately, then with a gap that
//! grows by 30 seconds per notice up to a 15 minute ceiling.

use std::fs::File;
use std::time::{Duration, Instant};

use tracing::debug;

use super::notice;
use crate::job::Job;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const NOTICE_STEP: Duration = Duration::from_secs(30);
pub const MAX_NOTICE_INTERVAL: Duration = Duration::from_secs(900);

/// Decides when a waiting job should log another progress notice.
#[derive(Debug, Clone, Default)]
pub struct WaitNotifier {
    last: Option<Instant>,
    interval: Duration,
}

/// A notice that is due, carrying the gap until the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    First,
    Update { next_in: Duration },
}

impl WaitNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notice due at `now`, if any, and advances the cadence.
    pub fn poll(&mut self, now: Instant) -> Option<Notice> {
        match self.last {
            None => {
                self.last = Some(now);
                self.interval = NOTICE_STEP;
                Some(Notice::First)
            }
            Some(last) if now.saturating_duration_since(last) >= self.interval => {
                self.last = Some(now);
                self.interval = (self.interval + NOTICE_STEP).min(MAX_NOTICE_INTERVAL);
                Some(Notice::Update {
                    next_in: self.interval,
                })
            }
            Some(_) => None,
        }
    }
}

/// Names of dependencies that have no result yet.
pub fn pending_dependencies<'a>(jobs: &'a [Job], job: &Job) -> Vec<&'a str> {
    job.dependencies()
        .unwrap_or_default()
        .iter()
        .map(|&i| &jobs[i])
        .filter(|dep| !dep.is_finished())
        .map(Job::name)
        .collect()
}

/// Block until every dependency of `job` has a result, logging notices to
/// `log` as the wait goes on.
pub async fn wait_for_dependencies(jobs: &[Job], job: &Job, log: &File) {
    let mut notifier = WaitNotifier::new();

    loop {
        let pending = pending_dependencies(jobs, job);
        if pending.is_empty() {
            return;
        }

        match notifier.poll(Instant::now()) {
            Some(Notice::First) => {
                debug!(job = %job.name(), ?pending, "waiting for dependencies");
                notice(
                    log,
                    format_args!(
                        "waiting for {pending:?} (checking every {} second)",
                        POLL_INTERVAL.as_secs()
                    ),
                );
            }
            Some(Notice::Update { next_in }) => notice(
                log,
                format_args!(
                    "waiting for {pending:?} (next update in {} seconds)",
                    next_in.as_secs()
                ),
            ),
            None => {}
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
