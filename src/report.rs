//! Rendering of case results and the run summary.

use crate::schema::{CaseResult, Diff, Mismatch, Outcome, Summary};
use colored::{Color, Colorize};
use std::fmt::Write as _;
use std::time::Duration;

/// Width of the widest diagnostic label, `expected output:`.
const LABEL_WIDTH: usize = 16;
const INDENT: &str = "  ";

/// Render one case the way it is printed in the human report.
pub fn render_case(result: &CaseResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", result.name);
    match &result.outcome {
        Outcome::Passed => {
            let _ = writeln!(out, "{INDENT}{}", "succeeded".green());
        }
        Outcome::Ineligible { error } => {
            let _ = writeln!(out, "{INDENT}{}", error.to_string().red());
        }
        Outcome::Errored { message } => {
            let _ = writeln!(out, "{INDENT}{}", message.red());
        }
        Outcome::Mismatched { mismatch } => {
            let _ = writeln!(out, "{INDENT}{}", "failed".red());
            render_mismatch(&mut out, mismatch);
        }
    }
    out
}

fn render_mismatch(out: &mut String, mismatch: &Mismatch) {
    if !mismatch.args.is_empty() {
        write_field(out, "args:", &mismatch.args.join("\n"));
    }
    if !mismatch.input.is_empty() {
        write_field(out, "input:", &mismatch.input);
    }
    if let Some(status) = &mismatch.status {
        let diff = Diff {
            actual: status.actual.to_string(),
            expected: status.expected.iter().map(i32::to_string).collect(),
        };
        write_diff(out, "status", &diff);
    }
    if let Some(output) = &mismatch.output {
        write_diff(out, "output", output);
    }
    if let Some(error) = &mismatch.error {
        write_diff(out, "error", error);
    }
}

fn write_diff(out: &mut String, stream: &str, diff: &Diff<String>) {
    write_styled(out, &format!("actual {stream}:"), &diff.actual, Some(Color::Red));
    for (i, expected) in diff.expected.iter().enumerate() {
        let label = if i == 0 {
            format!("expected {stream}:")
        } else {
            "or:".to_string()
        };
        write_styled(out, &label, expected, Some(Color::Green));
    }
}

fn write_field(out: &mut String, label: &str, value: &str) {
    write_styled(out, label, value, None);
}

/// Write `label` right-aligned, then `value` with continuation lines indented
/// to the value column.
fn write_styled(out: &mut String, label: &str, value: &str, color: Option<Color>) {
    let paint = |line: &str| match color {
        Some(color) => line.color(color).to_string(),
        None => line.to_string(),
    };
    let continuation = " ".repeat(INDENT.len() + LABEL_WIDTH + 1);
    let mut lines = value.lines();
    match lines.next() {
        Some(first) => {
            let _ = writeln!(out, "{INDENT}{label:>LABEL_WIDTH$} {}", paint(first));
        }
        None => {
            let _ = writeln!(out, "{INDENT}{label:>LABEL_WIDTH$}");
        }
    }
    for line in lines {
        let _ = writeln!(out, "{continuation}{}", paint(line));
    }
}

/// Render the final summary line.
pub fn render_summary(summary: &Summary) -> String {
    let line = format!(
        "{} {}, {} {}",
        summary.total,
        plural(summary.total, "test"),
        summary.failed,
        plural(summary.failed, "failure")
    );
    if summary.succeeded() {
        line.green().to_string()
    } else {
        line.red().to_string()
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Render the whole run as a JSON document.
pub fn render_json(results: &[CaseResult]) -> Result<String, serde_json::Error> {
    let summary = Summary::from_results(results);
    let output = serde_json::json!({
        "total": summary.total,
        "passed": summary.passed,
        "failed": summary.failed,
        "results": results,
    });
    serde_json::to_string_pretty(&output)
}

/// Format test results as JUnit XML.
pub fn render_junit(results: &[CaseResult], total_time: Duration) -> String {
    let summary = Summary::from_results(results);
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

    let _ = writeln!(
        xml,
        "<testsuites tests=\"{}\" failures=\"{}\" time=\"{:.3}\">",
        summary.total,
        summary.failed,
        total_time.as_secs_f64()
    );
    let _ = writeln!(
        xml,
        "  <testsuite name=\"smoke\" tests=\"{}\" failures=\"{}\" time=\"{:.3}\">",
        summary.total,
        summary.failed,
        total_time.as_secs_f64()
    );

    for result in results {
        let _ = writeln!(
            xml,
            "    <testcase name=\"{}\" time=\"{:.3}\">",
            escape_xml(&result.name),
            result.duration.as_secs_f64()
        );

        if let Some(message) = result.outcome.failure_message() {
            let _ = writeln!(xml, "      <failure message=\"{}\">", escape_xml(&message));
            if let Outcome::Mismatched { mismatch } = &result.outcome {
                let mut details = String::new();
                render_mismatch(&mut details, mismatch);
                let _ = write!(xml, "{}", escape_xml(&details));
            }
            xml.push_str("      </failure>\n");
        }

        xml.push_str("    </testcase>\n");
    }

    xml.push_str("  </testsuite>\n");
    xml.push_str("</testsuites>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CaseError;
    use pretty_assertions::assert_eq;

    fn plain() {
        colored::control::set_override(false);
    }

    fn result(name: &str, outcome: Outcome) -> CaseResult {
        CaseResult {
            name: name.to_string(),
            outcome,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn renders_success() {
        plain();
        assert_eq!(
            render_case(&result("tests/echo", Outcome::Passed)),
            "tests/echo\n  succeeded\n"
        );
    }

    #[test]
    fn renders_structural_error_alone() {
        plain();
        let outcome = Outcome::Ineligible {
            error: CaseError::NoOutputFiles,
        };
        assert_eq!(
            render_case(&result("tests/x", outcome)),
            "tests/x\n  There are no STDOUT or STDERR files.\n"
        );
    }

    #[test]
    fn renders_aligned_mismatch() {
        plain();
        let outcome = Outcome::Mismatched {
            mismatch: Mismatch {
                args: vec!["-n".to_string(), "two words".to_string()],
                input: "line one\nline two".to_string(),
                status: Some(Diff {
                    actual: 0,
                    expected: vec![2],
                }),
                output: Some(Diff {
                    actual: "three".to_string(),
                    expected: vec!["one".to_string(), "two".to_string()],
                }),
                error: None,
            },
        };
        let expected = concat!(
            "tests/x\n",
            "  failed\n",
            "             args: -n\n",
            "                   two words\n",
            "            input: line one\n",
            "                   line two\n",
            "    actual status: 0\n",
            "  expected status: 2\n",
            "    actual output: three\n",
            "  expected output: one\n",
            "               or: two\n",
        );
        assert_eq!(render_case(&result("tests/x", outcome)), expected);
    }

    #[test]
    fn summary_line() {
        plain();
        let summary = Summary {
            total: 3,
            passed: 2,
            failed: 1,
        };
        assert_eq!(render_summary(&summary), "3 tests, 1 failure");
        let summary = Summary {
            total: 1,
            passed: 1,
            failed: 0,
        };
        assert_eq!(render_summary(&summary), "1 test, 0 failures");
    }

    #[test]
    fn json_has_totals_and_results() {
        let results = vec![
            result("a", Outcome::Passed),
            result(
                "b",
                Outcome::Ineligible {
                    error: CaseError::NoCommand,
                },
            ),
        ];
        let json: serde_json::Value = serde_json::from_str(&render_json(&results).unwrap()).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["results"][0]["name"], "a");
        assert_eq!(json["results"][0]["result"], "passed");
        assert_eq!(json["results"][1]["result"], "ineligible");
        assert_eq!(json["results"][1]["error"]["kind"], "no_command");
    }

    #[test]
    fn junit_marks_failures() {
        plain();
        let results = vec![
            result("a", Outcome::Passed),
            result(
                "b<c>",
                Outcome::Errored {
                    message: "Failed to spawn".to_string(),
                },
            ),
        ];
        let xml = render_junit(&results, Duration::ZERO);
        assert!(xml.contains("<testsuites tests=\"2\" failures=\"1\""));
        assert!(xml.contains("<testcase name=\"b&lt;c&gt;\""));
        assert!(xml.contains("<failure message=\"Failed to spawn\">"));
    }

    #[test]
    fn escape_special_characters() {
        assert_eq!(escape_xml("a & \"b\""), "a &amp; &quot;b&quot;");
    }
}
