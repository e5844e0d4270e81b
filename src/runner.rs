//! Test execution engine.
//!
//! Runs each eligible case as a child process and compares what it produced
//! against the acceptable expectations.

use crate::schema::{CaseError, CaseResult, Diff, Expectation, Mismatch, Outcome, TestCase};
use crate::validate::{check_eligibility, resolve_application};
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// What a finished child process produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    /// Trimmed standard output.
    pub stdout: String,
    /// Trimmed standard error.
    pub stderr: String,
}

/// Run every case in order and collect the results.
pub fn run_cases(cases: &[TestCase]) -> Vec<CaseResult> {
    cases.iter().map(run_case).collect()
}

/// Validate, execute and check a single case.
pub fn run_case(case: &TestCase) -> CaseResult {
    let start = Instant::now();
    let outcome = execute(case);
    info!(name = %case.name, passed = outcome.passed(), "case finished");
    CaseResult {
        name: case.name.clone(),
        outcome,
        duration: start.elapsed(),
    }
}

fn execute(case: &TestCase) -> Outcome {
    if let Err(error) = check_eligibility(case) {
        return Outcome::Ineligible { error };
    }
    let Some((application, prefix)) = case.command.as_deref().and_then(|c| c.split_first()) else {
        return Outcome::Ineligible {
            error: CaseError::NoCommand,
        };
    };
    let program = match resolve_application(application) {
        Ok(program) => program,
        Err(error) => return Outcome::Ineligible { error },
    };

    let args: Vec<&str> = prefix
        .iter()
        .chain(case.args.iter().flatten())
        .map(String::as_str)
        .collect();

    match run_command(&program, &args, case.input.as_deref()) {
        Ok(output) => check_expectations(case, &output),
        Err(message) => Outcome::Errored { message },
    }
}

/// Spawn `program` with `args`, feed it `input` and wait for it to exit.
pub fn run_command(
    program: &Path,
    args: &[&str],
    input: Option<&str>,
) -> Result<CommandOutput, String> {
    debug!(program = %program.display(), ?args, "spawning");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn {}: {e}", program.display()))?;

    // Feed stdin from its own thread so a child that fills its output pipes
    // before reading all of its input cannot deadlock us.
    let writer = child.stdin.take().map(|mut stdin| {
        let data = input.unwrap_or_default().as_bytes().to_vec();
        thread::spawn(move || match stdin.write_all(&data) {
            Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
            _ => Ok(()),
        })
    });

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to read output: {e}"))?;

    if let Some(writer) = writer {
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(format!("Failed to write stdin: {e}")),
            Err(_) => return Err("Stdin writer panicked".to_string()),
        }
    }

    Ok(CommandOutput {
        status: exit_code(output.status),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// The exit code, or `128 + signal` for a child killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Compare a finished command against everything the case accepts.
///
/// A stream with no expectation accepts only empty output.
pub fn check_expectations(case: &TestCase, output: &CommandOutput) -> Outcome {
    let status = (output.status != case.expected_status).then(|| Diff {
        actual: output.status,
        expected: vec![case.expected_status],
    });
    let stdout = check_stream(case.expected_output.as_ref(), &output.stdout);
    let stderr = check_stream(case.expected_error.as_ref(), &output.stderr);

    if status.is_none() && stdout.is_none() && stderr.is_none() {
        return Outcome::Passed;
    }

    Outcome::Mismatched {
        mismatch: Mismatch {
            args: case.args.clone().unwrap_or_default(),
            input: case.input.clone().unwrap_or_default(),
            status,
            output: stdout,
            error: stderr,
        },
    }
}

fn check_stream(expectation: Option<&Expectation>, actual: &str) -> Option<Diff<String>> {
    let accepted = match expectation {
        Some(expectation) => expectation.accepts(actual),
        None => actual.is_empty(),
    };
    if accepted {
        return None;
    }
    let expected = match expectation {
        Some(expectation) => expectation.alternatives().to_vec(),
        None => vec![String::new()],
    };
    Some(Diff {
        actual: actual.to_string(),
        expected,
    })
}
