//! # KV Benchmark Results - Main Entry Point
//!
//! Aggregates the worker logs of one benchmark run directory:
//! 1. **Parse arguments**: run directory, output locations, pool size
//! 2. **Initialize logging**: colored console output, optional log file
//! 3. **Aggregate**: parse, merge and summarize the worker logs
//! 4. **Output**: print the report and append the summary record
//!
//! Any failure aborts the run with a non-zero exit status before the results
//! file is touched.

use anyhow::Result;
use clap::Parser;
use kvbench_results::{
    cli::Args,
    logging::init_logging,
    pipeline::{self, AggregationConfig},
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Held until exit so the file writer flushes.
    let _log_guard = init_logging(args.verbose, args.quiet, args.log_file.as_deref())?;

    info!("Starting KV benchmark results aggregation");
    info!("Configuration: {:?}", args);

    let config = AggregationConfig::from_args(&args);
    match pipeline::run(&config).await {
        Ok(summary) => {
            info!(
                "Aggregated {} worker logs into {} operation summaries",
                summary.files,
                summary.operations.len()
            );
            Ok(())
        }
        Err(e) => {
            error!("Aggregation of {} failed: {:#}", config.run_dir.display(), e);
            Err(e)
        }
    }
}
