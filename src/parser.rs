//! # Worker Log Parser
//!
//! Reads one worker `results.csv` log into a [`SampleStore`].
//!
//! ## Log Format
//!
//! ```text
//! operation,timestamp,latency      <- header, always skipped
//! READ,1700000000000000,812
//! UPDATE_ERROR,1700000000000350,0
//! ```
//!
//! Lines are split as raw bytes. The header and any line that does not split
//! into exactly three fields are skipped without being decoded. Everything else is strict: a tag outside the eight known
//! operation tags, or a field that is not an integer, aborts the parse.

use crate::samples::{OperationKind, SampleStore};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Fatal problems encountered while reading a worker log.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to open results file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading results file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown operation '{tag}' in {} line {line}", .path.display())]
    UnknownOperation {
        path: PathBuf,
        line: usize,
        tag: String,
    },

    #[error("invalid timestamp '{value}' in {} line {line}: {source}", .path.display())]
    InvalidTimestamp {
        path: PathBuf,
        line: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid latency '{value}' in {} line {line}: {source}", .path.display())]
    InvalidLatency {
        path: PathBuf,
        line: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Open and parse the worker log at `path`.
pub fn parse_results_file(path: &Path) -> Result<SampleStore, ParseError> {
    let file = File::open(path).map_err(|source| ParseError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_results(BufReader::new(file), path)
}

/// Parse a worker log from any buffered reader.
///
/// Lines are handled as raw bytes so the header and malformed lines are
/// skipped without ever being decoded. `source` is only used to label errors
/// and log lines.
pub fn parse_results<R: BufRead>(mut reader: R, source: &Path) -> Result<SampleStore, ParseError> {
    let mut store = SampleStore::new();
    let mut skipped = 0usize;
    let mut buffer = Vec::new();
    let mut line_number = 0usize;

    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .map_err(|err| ParseError::Read {
                path: source.to_path_buf(),
                source: err,
            })?;
        if read == 0 {
            break;
        }
        line_number += 1;
        if line_number == 1 {
            continue;
        }

        let line = trim_line_ending(&buffer);
        let fields: Vec<&[u8]> = line.split(|&byte| byte == b',').collect();
        let [tag, timestamp, latency] = fields.as_slice() else {
            skipped += 1;
            continue;
        };

        let timestamp = parse_integer(timestamp).map_err(|(value, err)| {
            ParseError::InvalidTimestamp {
                path: source.to_path_buf(),
                line: line_number,
                value,
                source: err,
            }
        })?;
        let latency = parse_integer(latency).map_err(|(value, err)| ParseError::InvalidLatency {
            path: source.to_path_buf(),
            line: line_number,
            value,
            source: err,
        })?;

        let tag = String::from_utf8_lossy(tag);
        let (kind, outcome) =
            OperationKind::from_tag(&tag).ok_or_else(|| ParseError::UnknownOperation {
                path: source.to_path_buf(),
                line: line_number,
                tag: tag.to_string(),
            })?;
        store.apply(kind, outcome, timestamp, latency);
    }

    debug!(
        "Parsed {}: {} records, {} malformed lines skipped",
        source.display(),
        store.total_records(),
        skipped
    );
    Ok(store)
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Invalid UTF-8 decodes to replacement characters, which never parse.
fn parse_integer(field: &[u8]) -> Result<i64, (String, ParseIntError)> {
    let text = String::from_utf8_lossy(field);
    text.parse().map_err(|err| (text.into_owned(), err))
}
