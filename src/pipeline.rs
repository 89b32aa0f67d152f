//! # Aggregation Pipeline
//!
//! Runs the whole aggregation for one run directory:
//!
//! 1. **Metadata**: read the start marker (`time.txt`) and driver settings
//!    (`cmd.txt`)
//! 2. **Discovery**: collect the per-worker `results.csv` logs
//! 3. **Fan-in**: parse the logs concurrently into per-file sample stores
//! 4. **Merge**: combine all stores and sort each kind's sequences
//! 5. **Statistics**: build the [`RunSummary`]
//! 6. **Output**: print the report, stage the optional JSON file, append the
//!    CSV record and then move the JSON file into place
//!
//! Nothing is written before step 6, so a failure anywhere earlier leaves the
//! results file untouched. A failed CSV append discards the staged JSON.

use crate::{
    aggregator::merge,
    cli::Args,
    config::{read_bench_config, read_start_time},
    discovery::discover_result_files,
    fan_in::parse_all,
    results::{append_csv_record, stage_json_report, RunSummary},
    stats::StatsOptions,
};
use anyhow::{bail, Result};
use std::path::PathBuf;
use tracing::info;

/// Everything needed to aggregate one run directory.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    pub run_dir: PathBuf,
    pub output_file: PathBuf,
    pub json_output: Option<PathBuf>,
    pub concurrency: usize,
    pub trim_percentage: u32,
}

impl AggregationConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            run_dir: args.dir.clone(),
            output_file: args.output_file.clone(),
            json_output: args.json_output.clone(),
            concurrency: args.concurrency,
            trim_percentage: args.trim_percentage,
        }
    }

    /// Configuration with default output locations for `run_dir`.
    pub fn for_run_dir(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            output_file: PathBuf::from(crate::defaults::OUTPUT_FILE),
            json_output: None,
            concurrency: crate::defaults::CONCURRENCY,
            trim_percentage: crate::defaults::TRIM_PERCENTAGE,
        }
    }
}

/// Aggregate without writing anything.
pub async fn summarize(config: &AggregationConfig) -> Result<RunSummary> {
    let run_dir = &config.run_dir;

    let start_time = read_start_time(&run_dir.join(crate::defaults::START_TIME_FILE))?;
    let bench_config = read_bench_config(&run_dir.join(crate::defaults::COMMAND_FILE))?;
    info!("Benchmark settings: {}", bench_config);

    let files = discover_result_files(run_dir, crate::defaults::WORKER_LOG_FILE)?;
    if files.is_empty() {
        bail!(
            "No {} files found under {}",
            crate::defaults::WORKER_LOG_FILE,
            run_dir.display()
        );
    }
    info!(
        "Parsing {} worker logs with up to {} in flight",
        files.len(),
        config.concurrency
    );

    let stores = parse_all(files, config.concurrency).await?;
    let merged = merge(stores);
    info!("Merged results from {} files", merged.files());

    let options = StatsOptions {
        trim_percentage: config.trim_percentage,
        batch_size: bench_config.batch_size,
    };
    let bench_name = bench_config.bench_name(run_dir);

    Ok(RunSummary::build(
        bench_name,
        start_time,
        bench_config,
        &merged,
        &options,
    ))
}

/// Aggregate, print the report and persist the outputs.
pub async fn run(config: &AggregationConfig) -> Result<RunSummary> {
    let summary = summarize(config).await?;

    println!("### Benchmark {}", summary.config);
    println!("### Starting at {}", summary.start_time);
    println!("### Num clients: {}", summary.config.num_clients);
    println!("### Num threads: {}", summary.config.num_threads);
    println!("### Target RPS: {}", summary.config.target);
    for line in summary.report_lines() {
        println!("{}", line);
    }
    println!("{}", summary.total_line());

    let record = summary.csv_record();
    println!("{}", record);

    let staged_json = match config.json_output {
        Some(ref json_path) => Some(stage_json_report(json_path, &summary)?),
        None => None,
    };
    append_csv_record(&config.output_file, &record)?;
    info!("Results appended to: {:?}", config.output_file);

    if let Some(staged) = staged_json {
        staged.commit()?;
    }

    Ok(summary)
}
