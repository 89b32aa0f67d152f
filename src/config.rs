//! # Run Configuration
//!
//! Reads the metadata files the load-test driver leaves in a run directory:
//!
//! - `cmd.txt`: the driver's command line, e.g.
//!   `run_benchmark.py --num_clients=30 --num_threads=400 ... --batch_size=1`.
//!   Only the integer-valued settings listed in [`REQUIRED_SETTINGS`] are
//!   extracted.
//! - `time.txt`: a free-text start marker that is passed through untouched
//!   apart from newline removal.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::num::ParseIntError;
use std::path::Path;
use thiserror::Error;

/// Settings that must be present in the command file.
pub const REQUIRED_SETTINGS: [&str; 6] = [
    "num_clients",
    "num_threads",
    "duration",
    "keymax",
    "target",
    "batch_size",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to match {0} in command file")]
    MissingKey(String),

    #[error("setting {key}={value} is not an integer: {source}")]
    InvalidValue {
        key: String,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid setting pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Integer settings of the benchmark run that produced the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchConfig {
    pub num_clients: u64,
    pub num_threads: u64,
    pub duration: u64,
    pub keymax: u64,
    pub target: u64,
    pub batch_size: u64,
}

impl BenchConfig {
    /// Build from a map of raw settings as returned by [`extract_settings`].
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| -> Result<u64, ConfigError> {
            let value = settings
                .get(key)
                .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
            value.parse().map_err(|source| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.clone(),
                source,
            })
        };

        Ok(Self {
            num_clients: get("num_clients")?,
            num_threads: get("num_threads")?,
            duration: get("duration")?,
            keymax: get("keymax")?,
            target: get("target")?,
            batch_size: get("batch_size")?,
        })
    }

    /// Label identifying this run in reports and the results file.
    ///
    /// The workload type is the name of the run directory.
    pub fn bench_name(&self, run_dir: &Path) -> String {
        let bench_type = run_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "numclients{:02}_numthreads{:03}_read{}_target{}",
            self.num_clients, self.num_threads, bench_type, self.target
        )
    }
}

impl fmt::Display for BenchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "num_clients={} num_threads={} duration={} keymax={} target={} batch_size={}",
            self.num_clients,
            self.num_threads,
            self.duration,
            self.keymax,
            self.target,
            self.batch_size
        )
    }
}

/// Find the first `<key>=<digits>` occurrence of every required setting.
///
/// Keys are matched as plain substrings, so `xnum_clients=3` also yields
/// `num_clients`.
pub fn extract_settings(command: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut settings = HashMap::new();
    for key in REQUIRED_SETTINGS {
        let pattern = Regex::new(&format!(r"{}=(\d+)", regex::escape(key)))?;
        let value = pattern
            .captures(command)
            .and_then(|captures| captures.get(1))
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        settings.insert(key.to_string(), value.as_str().to_string());
    }
    Ok(settings)
}

/// Read and parse the driver command file.
pub fn read_bench_config(path: &Path) -> Result<BenchConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read command file {}", path.display()))?;
    let command = content.replace('\n', "");
    let settings = extract_settings(&command)
        .with_context(|| format!("Error parsing command file {}", path.display()))?;
    Ok(BenchConfig::from_settings(&settings)?)
}

/// Read the start-time marker with newlines removed.
pub fn read_start_time(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(content.replace('\n', ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const COMMAND: &str = "./scripts/run_benchmark.py --num_clients=30 --num_threads=400 \
        --db_type=http --workload_file=./workloads/read --ops=13333333 --duration=600 \
        --workload_action=run --measurement_type=csv-file --keymax=10000000000 \
        --target=50000 --batch_size=4";

    #[test]
    fn test_extract_settings() {
        let settings = extract_settings(COMMAND).unwrap();
        assert_eq!(settings["num_clients"], "30");
        assert_eq!(settings["keymax"], "10000000000");
        assert_eq!(settings["batch_size"], "4");

        let config = BenchConfig::from_settings(&settings).unwrap();
        assert_eq!(config.num_threads, 400);
        assert_eq!(config.target, 50000);
        assert_eq!(config.duration, 600);
    }

    #[test]
    fn test_extract_skips_non_numeric_occurrence() {
        let command = "--target=auto --num_clients=1 --num_threads=2 --duration=3 \
            --keymax=4 --batch_size=5 --target=77";
        let settings = extract_settings(command).unwrap();
        assert_eq!(settings["target"], "77");
    }

    #[test]
    fn test_extract_matches_key_as_substring() {
        let command = "--xnum_clients=3 --num_threads=2 --duration=3 --keymax=4 \
            --target=5 --batch_size=6 --num_clients=9";
        let settings = extract_settings(command).unwrap();
        assert_eq!(settings["num_clients"], "3");
        assert_eq!(settings["batch_size"], "6");
    }

    #[test]
    fn test_extract_takes_leading_digits_only() {
        let command = "--num_clients=12abc --num_threads=2 --duration=3 --keymax=4 \
            --target=5 --batch_size=6";
        let settings = extract_settings(command).unwrap();
        assert_eq!(settings["num_clients"], "12");
        assert!(matches!(
            extract_settings("--num_clients= 12"),
            Err(ConfigError::MissingKey(ref key)) if key == "num_clients"
        ));
    }

    #[test]
    fn test_missing_setting_fails() {
        let command = COMMAND.replace("--target=50000", "");
        let err = extract_settings(&command).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(ref key) if key == "target"));
    }

    #[test]
    fn test_invalid_value_fails() {
        let mut settings = extract_settings(COMMAND).unwrap();
        settings.insert("target".to_string(), "99999999999999999999999".to_string());
        let err = BenchConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_bench_name() {
        let config = BenchConfig::from_settings(&extract_settings(COMMAND).unwrap()).unwrap();
        let name = config.bench_name(&PathBuf::from("/runs/2024-06-01/mixed"));
        assert_eq!(name, "numclients30_numthreads400_readmixed_target50000");

        let small = BenchConfig {
            num_clients: 2,
            num_threads: 8,
            ..config
        };
        assert_eq!(
            small.bench_name(Path::new("read")),
            "numclients02_numthreads008_readread_target50000"
        );
    }

    #[test]
    fn test_read_files() {
        let dir = TempDir::new().unwrap();
        let cmd_path = dir.path().join("cmd.txt");
        let time_path = dir.path().join("time.txt");
        std::fs::write(&cmd_path, format!("{}\n", COMMAND)).unwrap();
        std::fs::write(&time_path, "2024-06-01T10:00:00Z\n").unwrap();

        let config = read_bench_config(&cmd_path).unwrap();
        assert_eq!(config.batch_size, 4);
        assert_eq!(read_start_time(&time_path).unwrap(), "2024-06-01T10:00:00Z");
        assert!(read_start_time(&dir.path().join("missing.txt")).is_err());
    }
}
