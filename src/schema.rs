//! Data model for smoke fixtures and their results.
//!
//! A fixture is a group of files sharing a base name. The scanner tags each
//! file with a [`FileKind`], the assembler folds the tagged files into a
//! [`RawCase`] and then a [`TestCase`], and the runner turns each test case
//! into a [`CaseResult`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// The role a fixture file plays, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// One command token per line.
    Command,
    /// One argument per line.
    Args,
    /// Raw standard input.
    Input,
    /// One acceptable standard output value.
    Output,
    /// One acceptable standard error value.
    Error,
    /// Expected exit status.
    Status,
}

/// How an extension is compared against a rule.
#[derive(Debug, Clone, Copy)]
enum Rule {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Rule {
    fn matches(self, extension: &str) -> bool {
        match self {
            Rule::Exact(expected) => extension == expected,
            Rule::Prefix(prefix) => extension.starts_with(prefix),
        }
    }
}

/// Classification rules, evaluated in order. First match wins.
const RULES: &[(Rule, FileKind)] = &[
    (Rule::Exact("command"), FileKind::Command),
    (Rule::Exact("args"), FileKind::Args),
    (Rule::Exact("in"), FileKind::Input),
    (Rule::Prefix("out"), FileKind::Output),
    (Rule::Prefix("err"), FileKind::Error),
    (Rule::Exact("status"), FileKind::Status),
];

impl FileKind {
    /// Classify a bare extension (without the leading dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        RULES
            .iter()
            .find(|(rule, _)| rule.matches(extension))
            .map(|(_, kind)| *kind)
    }

    /// Classify a path by its final extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// A set of acceptable values for one output stream.
///
/// Stored in file order so reports list alternatives deterministically, but
/// matching is membership: any one alternative is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Expectation(Vec<String>);

impl Expectation {
    pub fn new(alternatives: Vec<String>) -> Self {
        Self(alternatives)
    }

    /// Whether `actual` equals any of the alternatives.
    pub fn accepts(&self, actual: &str) -> bool {
        self.0.iter().any(|alternative| alternative == actual)
    }

    pub fn alternatives(&self) -> &[String] {
        &self.0
    }
}

/// Files grouped under one base name, before any defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct RawCase {
    /// Contents per kind, in sorted file order.
    pub files: BTreeMap<FileKind, Vec<String>>,
    /// Trimmed contents of the root-level `command` file, if the root had one.
    pub inherited_command: Option<String>,
}

impl RawCase {
    /// First file of the given kind.
    pub fn first(&self, kind: FileKind) -> Option<&str> {
        self.files
            .get(&kind)
            .and_then(|contents| contents.first())
            .map(String::as_str)
    }

    /// Every file of the given kind, or `None` when there are none.
    pub fn all(&self, kind: FileKind) -> Option<&[String]> {
        self.files
            .get(&kind)
            .map(Vec::as_slice)
            .filter(|contents| !contents.is_empty())
    }
}

/// A fully assembled smoke test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub name: String,
    pub command: Option<Vec<String>>,
    pub args: Option<Vec<String>>,
    pub input: Option<String>,
    pub expected_output: Option<Expectation>,
    pub expected_error: Option<Expectation>,
    pub expected_status: i32,
}

/// Why a case was never executed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "application", rename_all = "snake_case")]
pub enum CaseError {
    #[error("There is no command.")]
    NoCommand,
    #[error("There are no args or STDIN files.")]
    NoInputFiles,
    #[error("There are no STDOUT or STDERR files.")]
    NoOutputFiles,
    #[error("The application \"{0}\" does not exist.")]
    NonExistentApplication(String),
    #[error("The application \"{0}\" is not executable.")]
    NonExecutableApplication(String),
}

/// One mismatching stream: what happened and everything that was acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff<T> {
    pub actual: T,
    pub expected: Vec<T>,
}

/// Details of a case that ran but did not produce an acceptable result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub args: Vec<String>,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Diff<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Diff<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Diff<String>>,
}

/// The result of a single case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    /// Rejected before execution.
    Ineligible { error: CaseError },
    /// The command could not be run to completion.
    Errored { message: String },
    Mismatched { mismatch: Mismatch },
}

impl Outcome {
    pub fn passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    /// A one-line description of the failure, if any.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            Outcome::Passed => None,
            Outcome::Ineligible { error } => Some(error.to_string()),
            Outcome::Errored { message } => Some(message.clone()),
            Outcome::Mismatched { mismatch } => {
                let mut streams = Vec::new();
                if mismatch.status.is_some() {
                    streams.push("status");
                }
                if mismatch.output.is_some() {
                    streams.push("output");
                }
                if mismatch.error.is_some() {
                    streams.push("error");
                }
                Some(format!("unexpected {}", streams.join(", ")))
            }
        }
    }
}

/// Result of running one test case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Totals over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_results(results: &[CaseResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.total += 1;
            if result.outcome.passed() {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            summary
        })
    }

    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}
