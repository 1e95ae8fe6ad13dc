use clap::Parser;
use colored::*;
use procbench::{run_session, ErrorPolicy, OutputWriter, SessionReport};
use std::path::PathBuf;
use std::process::ExitCode;
use tabled::{Table, Tabled};

/// Run process monitoring test cases and write a single JSON output
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Test-case JSON files, run in the order given
    #[clap(required = true, value_name = "TESTCASE")]
    testcases: Vec<PathBuf>,

    /// Output JSON file
    #[clap(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Continue running remaining test cases if one fails (default)
    #[clap(long, overrides_with = "stop_on_error")]
    continue_on_error: bool,

    /// Stop at the first failing test case
    #[clap(long, overrides_with = "continue_on_error")]
    stop_on_error: bool,

    /// Verbose logging
    #[clap(short, long)]
    verbose: bool,
}

impl Args {
    fn policy(&self) -> ErrorPolicy {
        if self.stop_on_error {
            ErrorPolicy::Stop
        } else {
            ErrorPolicy::Continue
        }
    }
}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "test case")]
    id: String,
    status: String,
    #[tabled(rename = "exit")]
    exit_code: String,
    samples: usize,
    #[tabled(rename = "duration")]
    duration: String,
    #[tabled(rename = "peak cpu")]
    cpu_peak: String,
    #[tabled(rename = "peak rss")]
    rss_peak: String,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let writer = OutputWriter::default();
    let report = run_session(&args.testcases, args.policy(), &writer);

    if let Err(err) = report.write(&writer, &args.output) {
        eprintln!("{} writing {}: {}", "[FATAL]".red().bold(), args.output.display(), err);
        return ExitCode::FAILURE;
    }

    print_report(&report);
    println!(
        "Results written to {}",
        args.output.display().to_string().green()
    );

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &SessionReport) {
    if !report.results.is_empty() {
        let rows: Vec<Row> = report
            .results
            .iter()
            .map(|result| Row {
                id: result.testcase.id.clone(),
                status: result.summary.status.to_string(),
                exit_code: match (
                    result.process_info.exit_code,
                    result.process_info.terminated_by_signal,
                ) {
                    (Some(code), _) => code.to_string(),
                    (None, Some(signal)) => format!("signal {}", signal),
                    (None, None) => "-".to_string(),
                },
                samples: result.summary.sample_count,
                duration: format!("{:.2}s", result.summary.duration_sec),
                cpu_peak: result
                    .summary
                    .cpu_peak_percent
                    .map(|c| format!("{:.1}%", c))
                    .unwrap_or_else(|| "-".to_string()),
                rss_peak: result
                    .summary
                    .rss_peak_bytes
                    .map(format_bytes)
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    // Individual failures were already logged as they happened.
    if !report.failures.is_empty() {
        eprintln!(
            "{} test case failure(s), see log above",
            report.failures.len().to_string().red().bold()
        );
    }
    if report.stopped_early {
        eprintln!("{}", "Stopped after the first failure (--stop-on-error)".yellow());
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
