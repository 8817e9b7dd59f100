// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

//! Parallel work-partitioning: one [`Partition`] per thread, overlap-aware.

use tracing::instrument;

use crate::scan::scan_raw;

/// Describes the slice of the region a single worker scans, and the
/// sub-range of that slice it is authoritative for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// Absolute offset where this worker's *scan* range begins (includes
    /// the overlap prefix borrowed from the previous logical chunk).
    pub scan_start: usize,
    /// Absolute offset where this worker's scan range ends (exclusive;
    /// includes the overlap suffix borrowed from the next logical chunk).
    pub scan_end: usize,
    /// Absolute offset at which this worker becomes authoritative. Any
    /// candidate match starting before this belongs to the previous
    /// worker and is discarded.
    pub owned_start: usize,
}

/// Splits `[0, size)` into `worker_count` overlapping partitions such that
/// every pattern occurrence straddling a logical boundary is found by
/// exactly one worker.
///
/// `pattern_len` must be `>= 1`; `worker_count` must be `>= 1`.
pub fn partition(size: usize, pattern_len: usize, worker_count: usize) -> Vec<Partition> {
    debug_assert!(worker_count >= 1);
    debug_assert!(pattern_len >= 1);

    let overlap = pattern_len - 1;
    let chunk = size / worker_count;

    let mut partitions = Vec::with_capacity(worker_count);
    for w in 0..worker_count {
        let logical_start = w * chunk;
        let logical_end = if w + 1 == worker_count {
            size
        } else {
            (w + 1) * chunk
        };

        let scan_start = if w == 0 {
            0
        } else {
            logical_start.saturating_sub(overlap)
        };
        let scan_end = if w + 1 == worker_count {
            size
        } else {
            (logical_end + overlap).min(size)
        };

        partitions.push(Partition {
            scan_start,
            scan_end,
            owned_start: logical_start,
        });
    }
    partitions
}

/// A worker's growable local result buffer, doubling from an initial
/// capacity as it fills.
pub struct LocalBuffer {
    offsets: Vec<u64>,
    cap: usize,
}

impl LocalBuffer {
    pub fn new(initial_capacity: usize, cap: usize) -> Self {
        let mut offsets = Vec::new();
        // Best-effort: a failure here just means we start at capacity 0 and
        // grow one push at a time below, which still honors the contract.
        let _ = offsets.try_reserve(initial_capacity.min(cap));
        LocalBuffer { offsets, cap }
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.offsets
    }

    /// Pushes `offset`, doubling the backing allocation if it is full.
    /// Returns `false` if growth could not be satisfied; the buffer keeps
    /// whatever it already holds.
    fn push(&mut self, offset: u64) -> bool {
        if self.offsets.len() == self.offsets.capacity() {
            let grow_by = self.offsets.capacity().max(64);
            if self.offsets.try_reserve(grow_by).is_err() {
                return false;
            }
        }
        self.offsets.push(offset);
        true
    }
}

/// Runs the raw scanner over `region[partition.scan_start..scan_end)` and
/// discards candidates before `owned_start`, growing the buffer as needed.
/// Returns `false` if a growth allocation failed partway through; the
/// buffer still holds whatever it collected before that point.
#[instrument(level = "trace", skip(region, pattern, buffer))]
pub fn run_partition(
    region: &[u8],
    partition: &Partition,
    pattern: &[u8],
    buffer: &mut LocalBuffer,
) -> bool {
    let slice = &region[partition.scan_start..partition.scan_end];

    // Scratch space sized to the slice's worst case, not the (possibly much
    // larger) global cap: a single partition cannot emit more offsets than
    // it has starting positions.
    let max_possible = slice.len().saturating_sub(pattern.len() - 1).max(1);
    let local_cap = buffer.cap.min(max_possible);

    let mut scratch = Vec::new();
    if scratch.try_reserve(local_cap).is_err() {
        return false;
    }
    scratch.resize(local_cap, 0u64);
    let n = scan_raw(slice, pattern, local_cap, &mut scratch);

    for &rel in &scratch[..n] {
        let abs = partition.scan_start as u64 + rel;
        if abs < partition.owned_start as u64 {
            continue;
        }
        if buffer.offsets.len() == buffer.cap {
            break;
        }
        if !buffer.push(abs) {
            return false;
        }
    }

    true
}
