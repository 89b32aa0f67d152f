//! # Sample Store
//!
//! Per-operation containers for the raw measurements read from worker logs.
//!
//! Every [`OperationKind`] owns one [`OperationSamples`] slot holding the
//! latencies and timestamps of successful operations plus a counter of failed
//! ones. A successful sample always lands in both sequences at once, so the two
//! sequences of a kind have the same length at all times. Failed operations
//! only bump the counter and carry no timing data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of distinct operation kinds tracked per store.
pub const OPERATION_KINDS: usize = 4;

/// Operation classes emitted by the load generator.
///
/// The declaration order is significant: it is the order in which kinds are
/// reported and the index used for per-kind arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Read,
    Insert,
    Update,
    Delete,
}

/// Whether a logged operation succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

impl OperationKind {
    /// All kinds, in reporting order.
    pub const ALL: [OperationKind; OPERATION_KINDS] = [
        OperationKind::Read,
        OperationKind::Insert,
        OperationKind::Update,
        OperationKind::Delete,
    ];

    /// Position of this kind inside per-kind arrays.
    pub fn index(self) -> usize {
        match self {
            OperationKind::Read => 0,
            OperationKind::Insert => 1,
            OperationKind::Update => 2,
            OperationKind::Delete => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Read => "READ",
            OperationKind::Insert => "INSERT",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }

    /// Classify a log tag such as `READ` or `UPDATE_ERROR`.
    ///
    /// Returns `None` for anything outside the eight known tags.
    pub fn from_tag(tag: &str) -> Option<(OperationKind, Outcome)> {
        let classified = match tag {
            "READ" => (OperationKind::Read, Outcome::Success),
            "READ_ERROR" => (OperationKind::Read, Outcome::Error),
            "INSERT" => (OperationKind::Insert, Outcome::Success),
            "INSERT_ERROR" => (OperationKind::Insert, Outcome::Error),
            "UPDATE" => (OperationKind::Update, Outcome::Success),
            "UPDATE_ERROR" => (OperationKind::Update, Outcome::Error),
            "DELETE" => (OperationKind::Delete, Outcome::Success),
            "DELETE_ERROR" => (OperationKind::Delete, Outcome::Error),
            _ => return None,
        };
        Some(classified)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurements collected for a single operation kind.
///
/// Timestamps and latencies are in microseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSamples {
    latencies: Vec<i64>,
    timestamps: Vec<i64>,
    errors: u64,
}

impl OperationSamples {
    /// Record a successful operation.
    pub fn record(&mut self, timestamp: i64, latency: i64) {
        self.timestamps.push(timestamp);
        self.latencies.push(latency);
    }

    /// Record a failed operation.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn latencies(&self) -> &[i64] {
        &self.latencies
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Number of successful operations.
    pub fn successes(&self) -> usize {
        self.latencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latencies.is_empty() && self.errors == 0
    }

    /// Move every sample of `other` into `self`.
    pub(crate) fn absorb(&mut self, mut other: OperationSamples) {
        self.latencies.append(&mut other.latencies);
        self.timestamps.append(&mut other.timestamps);
        self.errors += other.errors;
    }

    /// Sort latencies and timestamps, each on its own.
    ///
    /// After this call index `i` of one sequence no longer corresponds to
    /// index `i` of the other.
    pub(crate) fn sort_independently(&mut self) {
        self.latencies.sort_unstable();
        self.timestamps.sort_unstable();
    }
}

/// All measurements read from one worker log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleStore {
    kinds: [OperationSamples; OPERATION_KINDS],
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: OperationKind) -> &OperationSamples {
        &self.kinds[kind.index()]
    }

    pub fn get_mut(&mut self, kind: OperationKind) -> &mut OperationSamples {
        &mut self.kinds[kind.index()]
    }

    /// Apply one classified log record.
    pub fn apply(&mut self, kind: OperationKind, outcome: Outcome, timestamp: i64, latency: i64) {
        let samples = self.get_mut(kind);
        match outcome {
            Outcome::Success => samples.record(timestamp, latency),
            Outcome::Error => samples.record_error(),
        }
    }

    /// Successful plus failed operations across every kind.
    pub fn total_records(&self) -> u64 {
        self.kinds
            .iter()
            .map(|s| s.successes() as u64 + s.errors())
            .sum()
    }

    /// Iterate over `(kind, samples)` in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (OperationKind, &OperationSamples)> {
        OperationKind::ALL
            .into_iter()
            .map(move |kind| (kind, &self.kinds[kind.index()]))
    }

    pub(crate) fn into_kinds(self) -> [OperationSamples; OPERATION_KINDS] {
        self.kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_index_matches_declaration_order() {
        for (position, kind) in OperationKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn test_from_tag_classifies_all_known_tags() {
        assert_eq!(
            OperationKind::from_tag("READ"),
            Some((OperationKind::Read, Outcome::Success))
        );
        assert_eq!(
            OperationKind::from_tag("INSERT_ERROR"),
            Some((OperationKind::Insert, Outcome::Error))
        );
        assert_eq!(
            OperationKind::from_tag("UPDATE"),
            Some((OperationKind::Update, Outcome::Success))
        );
        assert_eq!(
            OperationKind::from_tag("DELETE_ERROR"),
            Some((OperationKind::Delete, Outcome::Error))
        );
        assert_eq!(OperationKind::from_tag("read"), None);
        assert_eq!(OperationKind::from_tag("SCAN"), None);
        assert_eq!(OperationKind::from_tag(""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(OperationKind::Read.to_string(), "READ");
        assert_eq!(OperationKind::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_apply_keeps_sequences_paired() {
        let mut store = SampleStore::new();
        store.apply(OperationKind::Read, Outcome::Success, 10, 100);
        store.apply(OperationKind::Read, Outcome::Error, 11, 200);
        store.apply(OperationKind::Update, Outcome::Success, 12, 300);

        for (_, samples) in store.iter() {
            assert_eq!(samples.latencies().len(), samples.timestamps().len());
        }

        let reads = store.get(OperationKind::Read);
        assert_eq!(reads.latencies(), &[100]);
        assert_eq!(reads.timestamps(), &[10]);
        assert_eq!(reads.errors(), 1);
        assert_eq!(store.total_records(), 3);
        assert!(store.get(OperationKind::Delete).is_empty());
    }

    #[test]
    fn test_absorb_and_sort() {
        let mut left = OperationSamples::default();
        left.record(30, 5);
        left.record(10, 1);
        left.record_error();

        let mut right = OperationSamples::default();
        right.record(20, 9);
        right.record_error();

        left.absorb(right);
        left.sort_independently();

        assert_eq!(left.timestamps(), &[10, 20, 30]);
        assert_eq!(left.latencies(), &[1, 5, 9]);
        assert_eq!(left.errors(), 2);
    }
}
