use std::path::PathBuf;
use std::process::exit;

use anyhow::Result;
use clap::{Parser as _, Subcommand};
use tracing_subscriber::filter::EnvFilter;

use trace::CallSet;
use trim_tools::trim::{trim_trace, TrimOptions};

/// Tools for working with captured D3D9 API traces.
#[derive(Debug, clap::Parser)]
#[command(name = "apitrace", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new trace by trimming an existing trace.
    Trim(TrimArgs),
}

#[derive(Debug, clap::Args)]
struct TrimArgs {
    /// Trace file to trim.
    trace_file: PathBuf,

    /// Include specified calls in the trimmed output.
    #[arg(long, value_name = "CALLSET")]
    calls: Option<String>,

    /// Include specified frames in the trimmed output.
    #[arg(long, value_name = "FRAMESET")]
    frames: Option<String>,

    /// Only retain calls from the specified thread (can be passed multiple
    /// times).
    #[arg(long = "thread", value_name = "THREAD_ID")]
    threads: Vec<u32>,

    /// Aggregate resource state over this many leading frames and emit it
    /// squashed.
    #[arg(long, value_name = "N", default_value_t = 0)]
    squash_until_frame: u64,

    /// Output trace file.
    #[arg(short, long, value_name = "TRACE_FILE")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("AT_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            exit(code);
        }
    };

    match cli.command {
        Command::Trim(args) => trim(args),
    }
}

fn trim(args: TrimArgs) -> Result<()> {
    let mut calls = match &args.calls {
        Some(text) => text.parse::<CallSet>()?,
        None => CallSet::none(),
    };
    let frames = match &args.frames {
        Some(text) => text.parse::<CallSet>()?,
        None => CallSet::none(),
    };
    // If neither --calls nor --frames was given, default to every call.
    if calls.is_empty() && frames.is_empty() {
        calls = CallSet::all();
    }

    let options = TrimOptions {
        calls,
        frames,
        thread_ids: args.threads.iter().copied().collect(),
        squash_until_frame: args.squash_until_frame,
        output: args.output,
    };

    let summary = trim_trace(&args.trace_file, &options)?;
    println!(
        "Trimmed trace is available as {}",
        summary.output.display()
    );
    Ok(())
}
