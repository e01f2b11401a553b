// src/config/mod.rs

//! Job file loading and validation.
//!
//! Responsibilities:
//! - Define the YAML-backed data model (`model.rs`).
//! - Load a job file from disk (`loader.rs`).
//! - Check it and build a [`JobGroup`](crate::group::JobGroup) from it
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_from_path, load_from_str, load_job_group};
pub use model::{GroupHeader, JobConfig, JobFile, Words};
pub use validate::to_job_group;
