// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

/// Tunables for the execution policy. None of these affect the offsets a
/// scan produces, only how much work is done in parallel and how eagerly
/// per-worker buffers grow.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Files smaller than this are scanned directly on the calling thread
    /// rather than partitioned across workers.
    pub small_file_threshold: usize,
    /// Overrides the worker count derived from available parallelism.
    /// `None` derives `max(1, ncores - 1)`.
    pub worker_count_override: Option<usize>,
    /// Initial capacity of each worker's local result buffer.
    pub worker_buffer_initial_capacity: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            small_file_threshold: 256 * 1024,
            worker_count_override: None,
            worker_buffer_initial_capacity: 4096,
        }
    }
}

impl ScanOptions {
    pub(crate) fn worker_count(&self) -> usize {
        self.worker_count_override.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1).max(1))
                .unwrap_or(1)
        })
    }
}
