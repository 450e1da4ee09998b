//! Replay a session and report average top-of-book duration per symbol.
//!
//! # Usage
//!
//! ```bash
//! # From stdin
//! decode_feed session.pitch | cargo run --release --bin top_of_book
//!
//! # From a (optionally zstd-compressed) JSON lines file
//! cargo run --release --bin top_of_book -- data/session.jsonl.zst
//!
//! # Count orders still at top when the feed ends, report as JSON
//! cargo run --release --bin top_of_book -- data/session.jsonl \
//!     --close-at-end --json
//! ```

use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use tob_residency::{
    EventDispatcher, JsonLinesSource, OpenOrderPolicy, ReplayConfig, ResidencyReport, Result,
};

/// Command-line arguments
struct Args {
    /// Input file; `None` reads stdin
    input: Option<PathBuf>,
    /// Close orders still at top at the last event time
    close_at_end: bool,
    /// Print the report as JSON instead of the text table
    json: bool,
    /// Log progress every N processed messages
    progress: Option<u64>,
}

fn parse_args() -> std::result::Result<Args, String> {
    let args: Vec<String> = env::args().collect();

    let mut input: Option<PathBuf> = None;
    let mut close_at_end = false;
    let mut json = false;
    let mut progress: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--close-at-end" | "-c" => {
                close_at_end = true;
            }
            "--json" | "-j" => {
                json = true;
            }
            "--progress" | "-p" => {
                i += 1;
                if i >= args.len() {
                    return Err("--progress requires a count".to_string());
                }
                let n = args[i]
                    .parse::<u64>()
                    .map_err(|e| format!("Invalid --progress value {}: {}", args[i], e))?;
                progress = Some(n);
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "-" => {
                input = None;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => {
                if input.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                input = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    Ok(Args {
        input,
        close_at_end,
        json,
        progress,
    })
}

fn print_help() {
    eprintln!(
        r#"
Top-of-Book Residency

Replays decoded order events (one JSON object per line) and prints the
average time each symbol's orders spent at the best price on their side.

USAGE:
    top_of_book [OPTIONS] [INPUT]

ARGS:
    [INPUT]               Event file (.jsonl or .jsonl.zst); omit or use - for stdin

OPTIONS:
    -c, --close-at-end    Close orders still at top at the last event time
                          (default: leave them out of the averages)
    -j, --json            Print the report as JSON instead of the table
    -p, --progress <N>    Log progress every N processed messages
    -h, --help            Print this help message

ENVIRONMENT:
    RUST_LOG              Log filter (default: info)
"#
    );
}

fn print_report(report: &ResidencyReport) {
    println!("symbol avg duration");
    for symbol in &report.symbols {
        if let Some(avg) = symbol.average_secs() {
            println!("{} {:12.2}", symbol.symbol, avg);
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let start = Instant::now();

    let mut config = ReplayConfig::new();
    if args.close_at_end {
        config = config.with_open_order_policy(OpenOrderPolicy::CloseAtStreamEnd);
    }
    if let Some(n) = args.progress {
        config = config.with_progress_interval(n);
    }

    let mut dispatcher = EventDispatcher::with_config(config);
    match &args.input {
        Some(path) => dispatcher.run(JsonLinesSource::open(path)?)?,
        None => dispatcher.run(JsonLinesSource::stdin())?,
    };

    let report = dispatcher.report();
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }

    let summary = format!(
        "Parsed {} message(s) in {:.3} sec(s).",
        dispatcher.stats().messages_processed,
        start.elapsed().as_secs_f64()
    );
    // Keep stdout parseable in JSON mode
    if args.json {
        log::info!("{}", summary);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            process::exit(1);
        }
    };

    if let Err(e) = run(&args) {
        log::error!("Replay failed: {}", e);
        process::exit(if e.is_protocol_violation() { 2 } else { 1 });
    }
}
