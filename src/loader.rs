//! Fixture scanner.
//!
//! Finds the fixture files under each test root and classifies them.

use crate::schema::FileKind;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Error type for scanning and assembly.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A root could not be turned into a glob pattern.
    #[error("invalid test root {pattern:?}: {source}")]
    Glob {
        pattern: String,
        source: glob::PatternError,
    },
    /// A path matched by a glob could not be inspected.
    #[error("failed to scan {}: {source}", .source.path().display())]
    GlobIteration { source: glob::GlobError },
    /// Failed to read a fixture file.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A `.status` file that does not hold an integer.
    #[error("invalid status for case {case:?}: {contents:?}")]
    InvalidStatus { case: String, contents: String },
}

/// The name of the root-level command file.
pub const ROOT_COMMAND_FILENAME: &str = "command";

/// A fixture file with its kind and contents.
#[derive(Debug, Clone)]
pub struct FixtureFile {
    pub path: PathBuf,
    pub kind: FileKind,
    pub contents: String,
}

impl FixtureFile {
    /// The case this file belongs to: its file name without the final
    /// extension. Files from different roots with the same base name belong
    /// to the same case.
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Everything found under one test root.
#[derive(Debug, Clone)]
pub struct ScannedRoot {
    pub root: String,
    /// Trimmed contents of the root-level command file.
    pub command: Option<String>,
    /// Classified files in lexicographic path order.
    pub files: Vec<FixtureFile>,
}

/// Scan every root, in the order given.
pub fn scan_roots(roots: &[String]) -> Result<Vec<ScannedRoot>, LoadError> {
    roots.iter().map(|root| scan_root(root)).collect()
}

/// Scan a single root.
///
/// Both `root/*.*` (a directory of fixtures) and `root.*` (fixtures named
/// after the root) are matched.
pub fn scan_root(root: &str) -> Result<ScannedRoot, LoadError> {
    let root = match root.trim_end_matches(std::path::MAIN_SEPARATOR) {
        "" => root,
        trimmed => trimmed,
    };
    let mut paths = BTreeSet::new();
    for pattern in [format!("{root}/*.*"), format!("{root}.*")] {
        collect_matches(&pattern, &mut paths)?;
    }

    let mut files = Vec::new();
    for path in paths {
        let Some(kind) = FileKind::from_path(&path) else {
            continue;
        };
        let contents = read_file(&path)?;
        files.push(FixtureFile {
            path,
            kind,
            contents,
        });
    }

    let command = find_root_command(Path::new(root))?;
    debug!(
        root,
        files = files.len(),
        inherited_command = command.is_some(),
        "scanned test root"
    );

    Ok(ScannedRoot {
        root: root.to_string(),
        command,
        files,
    })
}

/// Hidden files are only matched when the pattern spells out the dot.
const MATCH_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

fn collect_matches(pattern: &str, paths: &mut BTreeSet<PathBuf>) -> Result<(), LoadError> {
    let matches = glob::glob_with(pattern, MATCH_OPTIONS).map_err(|source| LoadError::Glob {
        pattern: pattern.to_string(),
        source,
    })?;
    for entry in matches {
        let path = entry.map_err(|source| LoadError::GlobIteration { source })?;
        if path.is_dir() {
            warn!(path = %path.display(), "skipping directory matched as a fixture");
            continue;
        }
        paths.insert(path);
    }
    Ok(())
}

/// Locate the command inherited by every case under `root`.
///
/// Looks for `root/command`, then for `command` next to the root. Returns
/// `None` if neither exists.
pub fn find_root_command(root: &Path) -> Result<Option<String>, LoadError> {
    let parent = match root.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let candidates = [
        root.join(ROOT_COMMAND_FILENAME),
        parent.join(ROOT_COMMAND_FILENAME),
    ];

    for candidate in candidates {
        if candidate.is_file() {
            let contents = read_file(&candidate)?;
            return Ok(Some(contents.trim().to_string()));
        }
    }
    Ok(None)
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
