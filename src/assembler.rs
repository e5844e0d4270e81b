//! Case assembler.
//!
//! Groups scanned fixture files by base name and resolves each group into a
//! [`TestCase`].

use crate::loader::{LoadError, ScannedRoot};
use crate::schema::{Expectation, FileKind, RawCase, TestCase};
use std::collections::BTreeMap;
use tracing::debug;

/// Group every scanned file by base name, then by kind.
///
/// The map's ordering is the run order. A name found under several roots
/// keeps the inherited command of the first root.
pub fn group_files(roots: &[ScannedRoot]) -> BTreeMap<String, RawCase> {
    let mut cases: BTreeMap<String, RawCase> = BTreeMap::new();
    for root in roots {
        debug!(root = %root.root, files = root.files.len(), "grouping fixture files");
        for file in &root.files {
            let raw = cases.entry(file.base_name()).or_insert_with(|| RawCase {
                files: BTreeMap::new(),
                inherited_command: root.command.clone(),
            });
            raw.files
                .entry(file.kind)
                .or_default()
                .push(file.contents.clone());
        }
    }
    cases
}

/// Turn scanned roots into test cases in run order.
///
/// `command_override`, when given, replaces the command of every case.
pub fn assemble(
    roots: &[ScannedRoot],
    command_override: Option<&[String]>,
) -> Result<Vec<TestCase>, LoadError> {
    group_files(roots)
        .into_iter()
        .map(|(name, raw)| assemble_case(name, &raw, command_override))
        .collect()
}

/// Resolve one group of files into a test case.
pub fn assemble_case(
    name: String,
    raw: &RawCase,
    command_override: Option<&[String]>,
) -> Result<TestCase, LoadError> {
    let command = match command_override {
        Some(tokens) => Some(tokens.to_vec()),
        None => raw
            .first(FileKind::Command)
            .or(raw.inherited_command.as_deref())
            .map(split_lines),
    };

    let expected_status = match raw.first(FileKind::Status) {
        Some(contents) => {
            contents
                .trim()
                .parse::<i32>()
                .map_err(|_| LoadError::InvalidStatus {
                    case: name.clone(),
                    contents: contents.to_string(),
                })?
        }
        None => 0,
    };

    let case = TestCase {
        command,
        args: raw.first(FileKind::Args).map(split_lines),
        input: raw.first(FileKind::Input).map(str::to_string),
        expected_output: expectation(raw, FileKind::Output),
        expected_error: expectation(raw, FileKind::Error),
        expected_status,
        name,
    };
    debug!(
        name = %case.name,
        command = ?case.command,
        expected_status = case.expected_status,
        "assembled case"
    );
    Ok(case)
}

fn expectation(raw: &RawCase, kind: FileKind) -> Option<Expectation> {
    raw.all(kind).map(|contents| {
        Expectation::new(
            contents
                .iter()
                .map(|value| value.trim().to_string())
                .collect(),
        )
    })
}

/// One token per non-blank line of the trimmed contents.
///
/// Only the contents as a whole are trimmed; spaces inside a line, leading
/// ones included, are part of its token.
fn split_lines(contents: &str) -> Vec<String> {
    contents
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
