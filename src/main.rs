mod assembler;
mod loader;
mod report;
mod runner;
mod schema;
mod validate;

use clap::{CommandFactory, Parser, ValueEnum, error::ErrorKind};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with per-case diagnostics
    #[default]
    Human,
    /// Machine-readable JSON output
    Json,
    /// JUnit XML output for CI systems
    Junit,
}

#[derive(Parser)]
#[command(name = "smoke")]
#[command(about = "Runs command-line applications against fixture files")]
#[command(version)]
struct Cli {
    /// Test roots: directories of fixtures, or paths that fixture files are named after
    #[arg(value_name = "TEST-ROOT")]
    roots: Vec<String>,
    /// Command to run for every case, overriding `.command` and `command` files
    #[arg(long, value_name = "COMMAND")]
    command: Option<String>,
    /// Force colored output
    #[arg(short = 'c', long, overrides_with = "no_color")]
    color: bool,
    /// Disable colored output
    #[arg(long, overrides_with = "color")]
    no_color: bool,
    /// Output format
    #[arg(short, long, default_value = "human")]
    output: OutputFormat,
    /// Only run cases whose name contains this substring
    #[arg(short, long)]
    filter: Option<String>,
    /// Log what is being scanned and run
    #[arg(short, long)]
    verbose: bool,
}

/// Errors that stop a run before any summary is printed.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("could not split --command {0:?} into words")]
    InvalidCommand(String),
    #[error("no test cases found in {}", .0.join(", "))]
    NoCases(Vec<String>),
    #[error(transparent)]
    Load(#[from] loader::LoadError),
    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            return match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = error.print();
                    ExitCode::SUCCESS
                }
                _ => {
                    let _ = error.print();
                    ExitCode::FAILURE
                }
            };
        }
    };

    if cli.roots.is_empty() {
        let _ = Cli::command().print_help();
        return ExitCode::from(2);
    }

    let default_filter = if cli.verbose { "smoke=info" } else { "smoke=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let color = match cli.output {
        OutputFormat::Human if cli.color => true,
        OutputFormat::Human if cli.no_color => false,
        OutputFormat::Human => std::io::stdout().is_terminal(),
        OutputFormat::Json | OutputFormat::Junit => false,
    };
    colored::control::set_override(color);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Discover, run and report every case. Returns whether all of them passed.
fn run(cli: &Cli) -> Result<bool, CliError> {
    let command_override = cli
        .command
        .as_ref()
        .map(|command| {
            shlex::split(command).ok_or_else(|| CliError::InvalidCommand(command.clone()))
        })
        .transpose()?;

    let roots = loader::scan_roots(&cli.roots)?;
    let mut cases = assembler::assemble(&roots, command_override.as_deref())?;
    if cases.is_empty() {
        return Err(CliError::NoCases(cli.roots.clone()));
    }
    if let Some(filter) = &cli.filter {
        cases.retain(|case| case.name.contains(filter.as_str()));
        debug!(filter, remaining = cases.len(), "filtered cases");
    }

    let run_start = Instant::now();
    let results = match cli.output {
        OutputFormat::Human => {
            // Print as we go so a hanging case still shows earlier results.
            let mut results = Vec::with_capacity(cases.len());
            for case in &cases {
                let result = runner::run_case(case);
                print!("{}", report::render_case(&result));
                results.push(result);
            }
            results
        }
        OutputFormat::Json | OutputFormat::Junit => runner::run_cases(&cases),
    };
    let summary = schema::Summary::from_results(&results);

    match cli.output {
        OutputFormat::Human => {
            println!("\n{}", report::render_summary(&summary));
        }
        OutputFormat::Json => {
            println!("{}", report::render_json(&results)?);
        }
        OutputFormat::Junit => {
            print!("{}", report::render_junit(&results, run_start.elapsed()));
        }
    }

    Ok(summary.succeeded())
}
