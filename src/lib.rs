//! # KV Benchmark Results Library
//!
//! Aggregates the per-operation latency logs written by the workers of a
//! distributed key-value load test into run-wide statistics.
//!
//! Every worker writes a `results.csv` log with one `TAG,timestamp,latency`
//! row per operation. This library discovers those logs under a run
//! directory, parses them concurrently, merges them and reports, per operation
//! kind, the throughput over a trimmed time window together with average,
//! p50, p90 and p99 latency and the error rate.
//!
//! ## Architecture Overview
//!
//! - `samples`: operation kinds and the per-kind sample containers
//! - `parser`: one worker log into one sample store
//! - `fan_in`: bounded concurrent parsing of many logs
//! - `aggregator`: merging per-file stores and sorting the result
//! - `stats`: percentiles, averages, trimmed-window throughput
//! - `config`: run metadata (`cmd.txt`, `time.txt`)
//! - `discovery`: locating worker logs
//! - `results`: run summary, report lines, CSV and JSON output
//! - `pipeline`: the end-to-end aggregation
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use kvbench_results::pipeline::{summarize, AggregationConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AggregationConfig::for_run_dir("/data/runs/read");
//!     let summary = summarize(&config).await?;
//!
//!     for line in summary.report_lines() {
//!         println!("{}", line);
//!     }
//!     println!("{}", summary.csv_record());
//!     Ok(())
//! }
//! ```

/// Merging of per-worker sample stores
pub mod aggregator;

/// Command-line interface
pub mod cli;

/// Run metadata files and the benchmark name
pub mod config;

/// Locating worker logs under a run directory
pub mod discovery;

/// Bounded concurrent parsing of worker logs
///
/// Runs the log parser over many files with a fixed number in flight and
/// all-or-nothing error semantics.
pub mod fan_in;

/// Console and file logging setup
pub mod logging;

/// Worker log parsing
pub mod parser;

/// End-to-end aggregation of a run directory
pub mod pipeline;

/// Run summary and output files
///
/// Builds the per-run summary from merged samples and writes it out as
/// report lines, an appended CSV record and an optional JSON document.
pub mod results;

/// Operation kinds and sample containers
pub mod samples;

/// Latency percentiles, averages and trimmed-window throughput
pub mod stats;

pub use aggregator::{merge, MergedResults};
pub use config::BenchConfig;
pub use parser::{parse_results_file, ParseError};
pub use results::RunSummary;
pub use samples::{OperationKind, OperationSamples, SampleStore};
pub use stats::{OperationStats, StatsError, StatsOptions};

/// The current version of the results aggregator
///
/// Populated from Cargo.toml and recorded in JSON reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Worker logs parsed at the same time
    pub const CONCURRENCY: usize = 8;

    /// Percentage of timestamps dropped from each end of the throughput window
    ///
    /// Removes the ramp-up and ramp-down caused by workers starting and
    /// stopping at slightly different times.
    pub const TRIM_PERCENTAGE: u32 = 5;

    /// Running results file the summary record is appended to
    pub const OUTPUT_FILE: &str = "results.csv";

    /// Name of each worker's log inside the run directory tree
    pub const WORKER_LOG_FILE: &str = "results.csv";

    pub const START_TIME_FILE: &str = "time.txt";

    pub const COMMAND_FILE: &str = "cmd.txt";
}
