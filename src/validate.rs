//! Pre-execution checks.
//!
//! A case that fails here is reported with the error alone and never spawned.

use crate::schema::{CaseError, TestCase};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Check that a case has everything it needs to run.
///
/// The checks are ordered; the first missing piece is reported.
pub fn check_eligibility(case: &TestCase) -> Result<(), CaseError> {
    if case.command.as_ref().is_none_or(|tokens| tokens.is_empty()) {
        return Err(CaseError::NoCommand);
    }
    if case.args.is_none() && case.input.is_none() {
        return Err(CaseError::NoInputFiles);
    }
    if case.expected_output.is_none() && case.expected_error.is_none() {
        return Err(CaseError::NoOutputFiles);
    }
    Ok(())
}

/// Find the file that running `application` would execute.
///
/// Names containing a path separator are used as paths directly; bare names
/// are looked up in every `PATH` directory.
pub fn resolve_application(application: &str) -> Result<PathBuf, CaseError> {
    resolve_in(application, std::env::var_os("PATH"))
}

fn resolve_in(application: &str, paths: Option<OsString>) -> Result<PathBuf, CaseError> {
    let cwd = std::env::current_dir().unwrap_or_default();
    // `which` skips anything it cannot run, so a failed lookup is rechecked
    // to tell a missing application from one lacking permissions.
    which::which_in(application, paths.as_ref(), &cwd).map_err(|error| {
        debug!(application, %error, "application lookup failed");
        let candidates = candidates(application, paths.as_ref(), &cwd);
        if candidates.iter().any(|path| path.exists()) {
            CaseError::NonExecutableApplication(application.to_string())
        } else {
            CaseError::NonExistentApplication(application.to_string())
        }
    })
}

/// Every path a lookup of `application` would have considered.
fn candidates(application: &str, paths: Option<&OsString>, cwd: &Path) -> Vec<PathBuf> {
    let path = Path::new(application);
    if path.components().count() > 1 || path.is_absolute() {
        return vec![cwd.join(path)];
    }
    paths
        .map(|paths| {
            std::env::split_paths(paths)
                .map(|directory| directory.join(application))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Expectation;
    use tempfile::tempdir;

    fn search_path(directories: &[&Path]) -> Option<OsString> {
        Some(std::env::join_paths(directories).unwrap())
    }

    fn case() -> TestCase {
        TestCase {
            name: "x".to_string(),
            command: Some(vec!["cat".to_string()]),
            args: None,
            input: Some(String::new()),
            expected_output: Some(Expectation::new(vec![String::new()])),
            expected_error: None,
            expected_status: 0,
        }
    }

    #[test]
    fn eligible_case_passes() {
        assert_eq!(check_eligibility(&case()), Ok(()));
    }

    #[test]
    fn missing_command_reported_first() {
        let mut case = case();
        case.command = None;
        case.input = None;
        case.expected_output = None;
        assert_eq!(check_eligibility(&case), Err(CaseError::NoCommand));
    }

    #[test]
    fn empty_command_counts_as_missing() {
        let mut case = case();
        case.command = Some(vec![]);
        assert_eq!(check_eligibility(&case), Err(CaseError::NoCommand));
    }

    #[test]
    fn missing_input_source() {
        let mut case = case();
        case.input = None;
        case.expected_output = None;
        assert_eq!(check_eligibility(&case), Err(CaseError::NoInputFiles));
    }

    #[test]
    fn args_alone_are_an_input_source() {
        let mut case = case();
        case.input = None;
        case.args = Some(vec![]);
        assert_eq!(check_eligibility(&case), Ok(()));
    }

    #[test]
    fn missing_expectation_source() {
        let mut case = case();
        case.expected_output = None;
        assert_eq!(check_eligibility(&case), Err(CaseError::NoOutputFiles));
    }

    #[test]
    fn error_expectation_alone_is_enough() {
        let mut case = case();
        case.expected_output = None;
        case.expected_error = Some(Expectation::new(vec!["oops".to_string()]));
        assert_eq!(check_eligibility(&case), Ok(()));
    }

    #[test]
    fn nonexistent_application() {
        let dir = tempdir().unwrap();
        let result = resolve_in("no-such-app", search_path(&[dir.path()]));
        assert_eq!(
            result,
            Err(CaseError::NonExistentApplication("no-such-app".to_string()))
        );
    }

    #[test]
    fn directory_is_not_executable() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("app")).unwrap();
        let result = resolve_in("app", search_path(&[dir.path()]));
        assert_eq!(
            result,
            Err(CaseError::NonExecutableApplication("app".to_string()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn file_without_execute_bit_is_not_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let app = dir.path().join("app");
        std::fs::write(&app, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&app, std::fs::Permissions::from_mode(0o644)).unwrap();

        let result = resolve_in("app", search_path(&[dir.path()]));
        assert_eq!(
            result,
            Err(CaseError::NonExecutableApplication("app".to_string()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn later_directory_with_executable_wins() {
        use std::os::unix::fs::PermissionsExt;
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        std::fs::write(first.path().join("app"), "").unwrap();
        std::fs::set_permissions(
            first.path().join("app"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();
        let app = second.path().join("app");
        std::fs::write(&app, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&app, std::fs::Permissions::from_mode(0o755)).unwrap();

        let result = resolve_in("app", search_path(&[first.path(), second.path()]));
        assert_eq!(result, Ok(app));
    }

    #[cfg(unix)]
    #[test]
    fn resolves_absolute_path() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let app = dir.path().join("app");
        std::fs::write(&app, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&app, std::fs::Permissions::from_mode(0o755)).unwrap();

        let name = app.display().to_string();
        assert_eq!(resolve_application(&name), Ok(app));
    }

    #[cfg(unix)]
    #[test]
    fn path_without_execute_bit_is_not_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let app = dir.path().join("app");
        std::fs::write(&app, "").unwrap();
        std::fs::set_permissions(&app, std::fs::Permissions::from_mode(0o644)).unwrap();

        let name = app.display().to_string();
        assert_eq!(
            resolve_in(&name, None),
            Err(CaseError::NonExecutableApplication(name.clone()))
        );
    }

    #[test]
    fn empty_search_path_finds_nothing() {
        assert_eq!(
            resolve_in("sh", None),
            Err(CaseError::NonExistentApplication("sh".to_string()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn resolves_through_path() {
        assert!(resolve_application("sh").is_ok());
    }
}
