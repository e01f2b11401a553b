// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// A job file as read from YAML.
///
/// ```yaml
/// jobgroup: nightly
///
/// jobs:
///   snapshot:
///     cwd: /srv
///     cmd: restic backup /srv
///     max_time: 3600
///   verify:
///     cwd: /srv
///     cmd: [restic, check]
///     after: snapshot
/// ```
///
/// `jobs` is kept as a raw mapping so that the document order of the jobs
/// survives deserialization; that order drives default chaining and job
/// numbering.
#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobgroup: GroupHeader,

    #[serde(default)]
    pub jobs: serde_yaml::Mapping,
}

/// `jobgroup: <name>` or `jobgroup: { name: <name> }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GroupHeader {
    Name(String),
    Table { name: String },
}

impl GroupHeader {
    pub fn name(&self) -> &str {
        match self {
            GroupHeader::Name(name) | GroupHeader::Table { name } => name,
        }
    }
}

/// One entry of the `jobs` mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Working directory the command runs in.
    pub cwd: PathBuf,

    /// The command. A string is split on whitespace; use the list form to
    /// keep spaces inside an argument.
    pub cmd: Words,

    /// Dependency declaration:
    /// - absent or null: run after the previous job in the file,
    /// - `[]` (or an empty string): no dependencies,
    /// - a name, a whitespace-separated string of names, or a list.
    #[serde(default)]
    pub after: Option<Words>,

    /// Maximum run time in seconds.
    #[serde(default, alias = "maxtime")]
    pub max_time: Option<f64>,

    /// Extra environment variables for the command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A string split on whitespace, or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Words {
    Line(String),
    List(Vec<String>),
}

impl Words {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Words::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            Words::List(list) => list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_split_on_whitespace() {
        let w: Words = serde_yaml::from_str("\"echo  all done\"").unwrap();
        assert_eq!(w.into_vec(), vec!["echo", "all", "done"]);

        let w: Words = serde_yaml::from_str("[echo, \"all done\"]").unwrap();
        assert_eq!(w.into_vec(), vec!["echo", "all done"]);
    }

    #[test]
    fn header_forms() {
        let f: JobFile = serde_yaml::from_str("jobgroup: a\n").unwrap();
        assert_eq!(f.jobgroup.name(), "a");
        assert!(f.jobs.is_empty());

        let f: JobFile = serde_yaml::from_str("jobgroup:\n  name: b\n").unwrap();
        assert_eq!(f.jobgroup.name(), "b");
    }

    #[test]
    fn after_null_and_absent_are_the_same() {
        let a: JobConfig = serde_yaml::from_str("cwd: /\ncmd: x\nafter:\n").unwrap();
        let b: JobConfig = serde_yaml::from_str("cwd: /\ncmd: x\n").unwrap();
        assert_eq!(a.after, None);
        assert_eq!(b.after, None);

        let c: JobConfig = serde_yaml::from_str("cwd: /\ncmd: x\nafter: []\n").unwrap();
        assert_eq!(c.after, Some(Words::List(vec![])));
    }

    #[test]
    fn maxtime_alias() {
        let j: JobConfig = serde_yaml::from_str("cwd: /\ncmd: x\nmaxtime: 5\n").unwrap();
        assert_eq!(j.max_time, Some(5.0));
    }
}
