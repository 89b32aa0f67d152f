//! Merging of per-worker sample stores into a single run-wide view.

use crate::samples::{OperationKind, OperationSamples, SampleStore, OPERATION_KINDS};

/// Samples from every worker log of a run, merged per operation kind.
///
/// Latencies and timestamps of each kind are sorted ascending, each
/// sequence on its own, which is what percentile selection and window
/// trimming expect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedResults {
    kinds: [OperationSamples; OPERATION_KINDS],
    files: usize,
}

impl MergedResults {
    pub fn get(&self, kind: OperationKind) -> &OperationSamples {
        &self.kinds[kind.index()]
    }

    /// Number of per-file stores that went into this result.
    pub fn files(&self) -> usize {
        self.files
    }

    pub fn iter(&self) -> impl Iterator<Item = (OperationKind, &OperationSamples)> {
        OperationKind::ALL
            .into_iter()
            .map(move |kind| (kind, &self.kinds[kind.index()]))
    }
}

/// Merge per-file stores into one [`MergedResults`].
///
/// Order of `stores` does not matter. Duplicate values are kept.
pub fn merge<I>(stores: I) -> MergedResults
where
    I: IntoIterator<Item = SampleStore>,
{
    let mut merged = MergedResults::default();

    for store in stores {
        merged.files += 1;
        for (slot, samples) in merged.kinds.iter_mut().zip(store.into_kinds()) {
            slot.absorb(samples);
        }
    }

    for samples in merged.kinds.iter_mut() {
        samples.sort_independently();
    }
    merged
}
