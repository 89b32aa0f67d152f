//! # Run Summary and Outputs
//!
//! Builds a [`RunSummary`] from merged samples and renders it three ways: the
//! console report lines, the single record appended to the running results
//! CSV and an optional pretty-printed JSON document.
//!
//! The JSON report is staged next to its final path and only moved into
//! place once the CSV append has succeeded.

use crate::{
    aggregator::MergedResults,
    config::BenchConfig,
    samples::OperationKind,
    stats::{OperationStats, StatsOptions},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Aggregated outcome of one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub bench_name: String,
    pub start_time: String,
    pub config: BenchConfig,
    pub files: usize,
    pub operations: Vec<OperationStats>,
    /// Kinds that had samples but not enough of a window to measure
    pub omitted: Vec<OperationKind>,
    /// Sum of per-kind throughput, saturating at `u64::MAX`
    pub total_throughput: u64,
}

impl RunSummary {
    /// Compute statistics for every kind with data.
    ///
    /// Kinds without successful samples are left out silently; kinds whose
    /// window is too short to measure are left out with a warning.
    pub fn build(
        bench_name: String,
        start_time: String,
        config: BenchConfig,
        merged: &MergedResults,
        options: &StatsOptions,
    ) -> Self {
        let mut operations = Vec::new();
        let mut omitted = Vec::new();

        for (kind, samples) in merged.iter() {
            match OperationStats::compute(kind, samples, options) {
                Ok(Some(stats)) => operations.push(stats),
                Ok(None) => {
                    if samples.errors() > 0 {
                        warn!(
                            "{} has {} errors but no successful operations, omitting",
                            kind,
                            samples.errors()
                        );
                    }
                }
                Err(err) => {
                    warn!("No throughput data for {}: {}", kind, err);
                    omitted.push(kind);
                }
            }
        }

        let total_throughput = operations
            .iter()
            .fold(0u64, |total, op| total.saturating_add(op.throughput));

        Self {
            bench_name,
            start_time,
            config,
            files: merged.files(),
            operations,
            omitted,
            total_throughput,
        }
    }

    /// Console lines describing each reported operation kind.
    pub fn report_lines(&self) -> Vec<String> {
        self.operations
            .iter()
            .map(|op| {
                format!(
                    "{} {}: ave: {} p50: {} p90 {} p99: {} total_time: {} rps: {} num_errors: {} ({:.2}%)",
                    self.bench_name,
                    op.kind,
                    op.average_ms(),
                    op.p50_ms(),
                    op.p90_ms(),
                    op.p99_ms(),
                    op.window_secs,
                    op.throughput,
                    op.errors,
                    op.error_percentage
                )
            })
            .collect()
    }

    pub fn total_line(&self) -> String {
        format!("{} TOTAL: {} RPS", self.bench_name, self.total_throughput)
    }

    /// The row appended to the running results file, without newline.
    ///
    /// `name,start_time` followed by `rps,avg,p50,p90,p99` for each reported
    /// kind, latencies in milliseconds.
    pub fn csv_record(&self) -> String {
        let mut fields = vec![self.bench_name.clone(), self.start_time.clone()];
        for op in &self.operations {
            fields.extend([
                op.throughput.to_string(),
                op.average_ms().to_string(),
                op.p50_ms().to_string(),
                op.p90_ms().to_string(),
                op.p99_ms().to_string(),
            ]);
        }
        fields.join(",")
    }
}

/// Append `record` as one line to the results file, creating it if needed.
pub fn append_csv_record(path: &Path, record: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Error opening results file {}", path.display()))?;

    writeln!(file, "{}", record)
        .and_then(|_| file.flush())
        .with_context(|| format!("Failed to write to results file {}", path.display()))?;

    debug!("Appended summary record to {}", path.display());
    Ok(())
}

/// JSON document written by `--json-output`
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub summary: RunSummary,
}

/// A JSON report written to a staging file beside its destination.
///
/// [`StagedJsonReport::commit`] renames it into place. Dropping it uncommitted
/// removes the staging file, so a failed run leaves no report behind.
#[derive(Debug)]
pub struct StagedJsonReport {
    staging: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedJsonReport {
    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Move the staged report to its destination, replacing any existing file.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.staging, &self.target).with_context(|| {
            format!(
                "Failed to move JSON report {} into place",
                self.target.display()
            )
        })?;
        self.committed = true;
        info!("JSON report written to: {:?}", self.target);
        Ok(())
    }
}

impl Drop for StagedJsonReport {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(err) = fs::remove_file(&self.staging) {
                warn!(
                    "Could not remove staged JSON report {}: {}",
                    self.staging.display(),
                    err
                );
            }
        }
    }
}

/// Serialize the run summary to `<path>.tmp` without touching `path` itself.
pub fn stage_json_report(path: &Path, summary: &RunSummary) -> Result<StagedJsonReport> {
    let file_name = path
        .file_name()
        .with_context(|| format!("JSON report path {} has no file name", path.display()))?;
    let mut staging_name = file_name.to_os_string();
    staging_name.push(".tmp");
    let staging = path.with_file_name(staging_name);

    let report = JsonReport {
        version: crate::VERSION.to_string(),
        generated_at: chrono::Utc::now(),
        summary: summary.clone(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&staging, json)
        .with_context(|| format!("Failed to write JSON report {}", staging.display()))?;
    debug!("Staged JSON report at {}", staging.display());

    Ok(StagedJsonReport {
        staging,
        target: path.to_path_buf(),
        committed: false,
    })
}

/// Write the run summary as pretty-printed JSON, replacing any existing file.
pub fn write_json_report(path: &Path, summary: &RunSummary) -> Result<()> {
    stage_json_report(path, summary)?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::merge;
    use crate::samples::{Outcome, SampleStore};
    use tempfile::TempDir;

    fn config() -> BenchConfig {
        BenchConfig {
            num_clients: 2,
            num_threads: 16,
            duration: 60,
            keymax: 1000,
            target: 500,
            batch_size: 2,
        }
    }

    fn merged_fixture() -> MergedResults {
        let mut store = SampleStore::new();
        for i in 0..100i64 {
            store.apply(
                OperationKind::Update,
                Outcome::Success,
                i * 1_000_000,
                (i + 1) * 1_000,
            );
        }
        store.apply(OperationKind::Update, Outcome::Error, 0, 0);
        // Errors alone never make a kind reportable.
        store.apply(OperationKind::Delete, Outcome::Error, 0, 0);
        // Three samples within a millisecond cannot produce a window.
        for i in 0..3 {
            store.apply(OperationKind::Read, Outcome::Success, i, 900);
        }
        merge(vec![store])
    }

    fn summary() -> RunSummary {
        RunSummary::build(
            "bench".to_string(),
            "noon".to_string(),
            config(),
            &merged_fixture(),
            &StatsOptions {
                trim_percentage: 5,
                batch_size: 2,
            },
        )
    }

    #[test]
    fn test_build_reports_only_kinds_with_data() {
        let summary = summary();
        assert_eq!(summary.operations.len(), 1);
        assert_eq!(summary.operations[0].kind, OperationKind::Update);
        assert_eq!(summary.omitted, vec![OperationKind::Read]);
        assert_eq!(summary.total_throughput, 2);
        assert_eq!(summary.files, 1);
    }

    #[test]
    fn test_total_throughput_saturates() {
        let mut store = SampleStore::new();
        for kind in [OperationKind::Read, OperationKind::Insert] {
            store.apply(kind, Outcome::Success, 0, 10);
            store.apply(kind, Outcome::Success, 2_000_000, 10);
        }
        let summary = RunSummary::build(
            "bench".to_string(),
            "noon".to_string(),
            config(),
            &merge(vec![store]),
            &StatsOptions {
                trim_percentage: 0,
                batch_size: u64::MAX,
            },
        );

        assert_eq!(summary.operations.len(), 2);
        assert!(summary
            .operations
            .iter()
            .all(|op| op.throughput == u64::MAX));
        assert_eq!(summary.total_throughput, u64::MAX);
    }

    #[test]
    fn test_throughput_overflow_is_omitted() {
        let mut store = SampleStore::new();
        for ts in [0, 0, 1_000_000, 2_000_000] {
            store.apply(OperationKind::Delete, Outcome::Success, ts, 10);
        }
        let summary = RunSummary::build(
            "bench".to_string(),
            "noon".to_string(),
            config(),
            &merge(vec![store]),
            &StatsOptions {
                trim_percentage: 0,
                batch_size: u64::MAX,
            },
        );

        assert!(summary.operations.is_empty());
        assert_eq!(summary.omitted, vec![OperationKind::Delete]);
        assert_eq!(summary.total_throughput, 0);
    }

    #[test]
    fn test_csv_record() {
        assert_eq!(summary().csv_record(), "bench,noon,2,50,51,91,100");

        let empty = RunSummary::build(
            "bench".to_string(),
            "noon".to_string(),
            config(),
            &merge(Vec::new()),
            &StatsOptions::default(),
        );
        assert_eq!(empty.csv_record(), "bench,noon");
    }

    #[test]
    fn test_report_lines() {
        let summary = summary();
        let lines = summary.report_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "bench UPDATE: ave: 50 p50: 51 p90 91 p99: 100 total_time: 89 rps: 2 num_errors: 1 (0.99%)"
        );
        assert_eq!(summary.total_line(), "bench TOTAL: 2 RPS");
    }

    #[test]
    fn test_append_csv_record_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");

        append_csv_record(&path, "a,b").unwrap();
        append_csv_record(&path, "c,d").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\nc,d\n");
    }

    #[test]
    fn test_write_json_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");

        write_json_report(&path, &summary()).unwrap();

        let parsed: JsonReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.version, crate::VERSION);
        assert_eq!(parsed.summary.bench_name, "bench");
        assert_eq!(parsed.summary.operations[0].kind, OperationKind::Update);
        assert!(!dir.path().join("summary.json.tmp").exists());
    }

    #[test]
    fn test_uncommitted_json_report_is_removed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");

        let staged = stage_json_report(&path, &summary()).unwrap();
        let staging = staged.staging_path().to_path_buf();
        assert_eq!(staging, dir.path().join("summary.json.tmp"));
        assert!(staging.exists());
        assert!(!path.exists());

        drop(staged);
        assert!(!staging.exists());
        assert!(!path.exists());
    }
}
