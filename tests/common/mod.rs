#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use hydra::group::{log_file_name, JobGroup};
use hydra::staging::{STAGED_DIR_SUFFIX, STAGED_FILE_MARKER};

/// Names of all entries directly under `dir`, sorted.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// The committed run directory of a finished group.
pub fn run_dir(group: &JobGroup) -> PathBuf {
    let dir = group.backup_dir().expect("group has no run directory").to_path_buf();
    assert!(
        !dir.to_string_lossy().ends_with(STAGED_DIR_SUFFIX),
        "run directory still staged: {}",
        dir.display()
    );
    dir
}

/// Assert nothing in the run directory is left under a staged name.
pub fn assert_all_committed(dir: &Path) {
    for name in entries(dir) {
        assert!(
            !name.starts_with(STAGED_FILE_MARKER),
            "staged file left behind: {name}"
        );
    }
}

/// Contents of the log of job number `number`.
pub fn read_log(dir: &Path, number: usize, name: &str) -> String {
    fs::read_to_string(dir.join(log_file_name(number, name))).unwrap()
}

/// Write `contents` to `name` inside `dir` and return its path.
pub fn write_job_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}
