use clap::Parser;
use std::path::PathBuf;

/// KV Benchmark Results - aggregate per-worker latency logs of a benchmark run
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Run directory containing time.txt, cmd.txt and per-worker results.csv logs
    #[arg(short = 'd', long)]
    pub dir: PathBuf,

    /// Results file the summary record is appended to (created if absent)
    #[arg(short = 'o', long, default_value = crate::defaults::OUTPUT_FILE)]
    pub output_file: PathBuf,

    /// Also write the full run summary as JSON to this file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Maximum number of worker logs parsed concurrently
    #[arg(short = 'c', long, default_value_t = crate::defaults::CONCURRENCY)]
    pub concurrency: usize,

    /// Percentage of timestamps trimmed from each end of the throughput window
    #[arg(long, default_value_t = crate::defaults::TRIM_PERCENTAGE, value_parser = clap::value_parser!(u32).range(0..50))]
    pub trim_percentage: u32,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
