//! The CLI for the wfq packet scheduler.
//!
//! Use cases:
//! $ wfq trace.txt
//! $ cat trace.txt | wfq -o schedule.txt
//! $ wfq -vv trace.txt

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use wfq_core::ScheduleError;

/// Result type for this CLI: library errors are typed, the process boundary flattens
/// them to a message for the operator.
type CliResult<T> = Result<T, String>;

#[derive(Parser, Debug)]
#[command(
    name = "wfq",
    version,
    about = "Run a packet arrival trace through a Weighted Fair Queueing scheduler"
)]
struct Cli {
    /// Trace file to read; omit or pass `-` to read from stdin.
    input: Option<PathBuf>,

    /// File to write the schedule to; omit or pass `-` to write to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase logging verbosity (stack up to -vvv); ignored if --quiet is given.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging regardless of -v.
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    install_logging(&cli);

    match run(cli) {
        Ok(count) => {
            tracing::info!(packets = count, "schedule complete");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn install_logging(cli: &Cli) {
    if cli.quiet {
        return;
    }
    let default_level = match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> CliResult<u64> {
    let mut reader = open_input(&cli.input)?;
    let mut writer = open_output(&cli.output)?;
    let count = run_trace(&mut reader, &mut writer)?;
    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {e}"))?;
    Ok(count)
}

fn is_stdio_placeholder(path: &PathBuf) -> bool {
    path.as_os_str() == "-"
}

fn open_input(path: &Option<PathBuf>) -> CliResult<Box<dyn BufRead>> {
    match path {
        None => Ok(Box::new(io::stdin().lock())),
        Some(path) if is_stdio_placeholder(path) => Ok(Box::new(io::stdin().lock())),
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| format!("Failed to open input file {path:?}: {e}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn open_output(path: &Option<PathBuf>) -> CliResult<Box<dyn Write>> {
    match path {
        None => Ok(Box::new(io::stdout().lock())),
        Some(path) if is_stdio_placeholder(path) => Ok(Box::new(io::stdout().lock())),
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Failed to create output file {path:?}: {e}"))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

fn run_trace<R: BufRead, W: Write>(input: R, mut output: W) -> CliResult<u64> {
    wfq_core::run_to_completion(input, &mut output).map_err(format_schedule_error)
}

fn format_schedule_error(error: ScheduleError) -> String {
    format!("Failed to run schedule: {error}")
}
