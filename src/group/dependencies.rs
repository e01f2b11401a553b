// src/group/dependencies.rs

//! Resolution of `after` declarations into concrete job references.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{HydraError, Result};
use crate::job::{After, Job};

/// Resolve every job's `after` declaration into indexes of `jobs`.
///
/// Pure: does not touch the jobs. Fails on the first unknown name, on a job
/// naming itself, and on any dependency cycle.
pub fn resolve(jobs: &[Job]) -> Result<Vec<Vec<usize>>> {
    let index: HashMap<&str, usize> = jobs
        .iter()
        .enumerate()
        .map(|(i, job)| (job.name(), i))
        .collect();

    let mut resolved = Vec::with_capacity(jobs.len());

    for (i, job) in jobs.iter().enumerate() {
        let deps = match job.after() {
            After::Nothing => Vec::new(),
            After::Previous => i.checked_sub(1).into_iter().collect(),
            After::Jobs(names) => {
                let mut deps: Vec<usize> = Vec::with_capacity(names.len());
                for name in names {
                    let dep = *index.get(name.as_str()).ok_or_else(|| {
                        HydraError::UnknownDependency {
                            job: job.name().to_string(),
                            dependency: name.clone(),
                        }
                    })?;
                    if dep == i {
                        return Err(HydraError::ConfigError(format!(
                            "job '{}' cannot depend on itself in `after`",
                            job.name()
                        )));
                    }
                    if !deps.contains(&dep) {
                        deps.push(dep);
                    }
                }
                deps
            }
        };
        resolved.push(deps);
    }

    ensure_acyclic(jobs, &resolved)?;
    Ok(resolved)
}

/// Resolve and store dependencies on the jobs.
///
/// Resolution happens once; calling this again after a successful call is a
/// no-op, since resolved dependencies never change.
pub fn build_dependencies(jobs: &[Job]) -> Result<()> {
    if jobs.iter().any(|job| job.dependencies().is_some()) {
        debug!("dependencies already resolved");
        return Ok(());
    }

    let resolved = resolve(jobs)?;
    for (job, deps) in jobs.iter().zip(resolved) {
        debug!(job = %job.name(), ?deps, "resolved dependencies");
        job.set_dependencies(deps);
    }
    Ok(())
}

fn ensure_acyclic(jobs: &[Job], resolved: &[Vec<usize>]) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

    for i in 0..jobs.len() {
        graph.add_node(i);
    }
    for (i, deps) in resolved.iter().enumerate() {
        for &dep in deps {
            graph.add_edge(dep, i, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(HydraError::DependencyCycle(format!(
            "cycle in `after` involving job '{}'",
            jobs[cycle.node_id()].name()
        ))),
    }
}
