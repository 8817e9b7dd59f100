// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

//! The scan coordinator: owns the region, decides the execution policy,
//! spawns and merges workers, and hands the result to the caller.

use std::path::Path;

use tracing::instrument;

use crate::error::ScanError;
use crate::options::ScanOptions;
use crate::region::Region;
use crate::scan::scan_raw;
use crate::status::Status;
use crate::worker::{partition, run_partition, LocalBuffer};

/// Where the match buffer currently lives.
enum Matches {
    /// Not executed yet.
    None,
    /// Owned by this `Context`; freed on `Drop`.
    Owned(Vec<u64>),
    /// Ownership was transferred to a host finalizer via [`Context::detach`].
    Detached,
}

/// Coordinates a single scan: `init` → `load` → `execute` → (`detach` |
/// drop). Each method validates its own preconditions and returns the
/// status the caller should propagate; no operation panics.
pub struct Context {
    options: ScanOptions,
    pattern: Vec<u8>,
    cap: usize,
    region: Option<Region>,
    matches: Matches,
}

impl Context {
    /// Creates an uninitialized context. Call [`Context::init`] before
    /// anything else.
    pub fn new(options: ScanOptions) -> Self {
        Context {
            options,
            pattern: Vec::new(),
            cap: 0,
            region: None,
            matches: Matches::None,
        }
    }

    /// Validates and stores the pattern and cap.
    pub fn init(&mut self, pattern: &[u8], cap: usize) -> Status {
        if pattern.is_empty() {
            return ScanError::InvalidPattern.status();
        }
        if cap == 0 {
            return ScanError::InvalidCap.status();
        }
        self.pattern = pattern.to_vec();
        self.cap = cap;
        Status::Success
    }

    /// Opens a [`Region`] over `path`, replacing any previously loaded one.
    #[instrument(level = "debug", skip(self, path))]
    pub fn load(&mut self, path: impl AsRef<Path>) -> Status {
        match Region::open(path) {
            Ok(region) => {
                self.region = Some(region);
                Status::Success
            }
            Err(e) => e.status(),
        }
    }

    /// Runs the scan, choosing the sequential or parallel path per
    /// [`ScanOptions`], and populates the match buffer.
    #[instrument(level = "debug", skip(self))]
    pub fn execute(&mut self) -> Status {
        if self.pattern.is_empty() || self.cap == 0 {
            return Status::InvalidArg;
        }
        let Some(region) = self.region.take() else {
            return Status::InvalidArg;
        };

        // Taken out of `self` so the slice below borrows a local value
        // rather than `self`, leaving `self` free to be borrowed mutably
        // by the sequential/parallel paths.
        let data = region.as_slice();
        let status = if data.len() < self.options.small_file_threshold {
            self.execute_sequential(data)
        } else {
            self.execute_parallel(data)
        };

        self.region = Some(region);
        status
    }

    fn execute_sequential(&mut self, data: &[u8]) -> Status {
        let mut out = Vec::new();
        if out.try_reserve(self.cap).is_err() {
            return Status::OutOfBounds;
        }
        out.resize(self.cap, 0u64);

        let n = scan_raw(data, &self.pattern, self.cap, &mut out);
        out.truncate(n);
        self.matches = Matches::Owned(out);
        Status::Success
    }

    fn execute_parallel(&mut self, data: &[u8]) -> Status {
        // `partition` divides `data.len()` into `worker_count` logical chunks
        // of `size / worker_count` bytes each; if that's 0 (more workers
        // than bytes), every chunk's logical start collapses to the same
        // offset and matches would be double-counted. Clamping here keeps
        // `partition` itself a pure, non-degenerate divider.
        let worker_count = self.options.worker_count().max(1).min(data.len().max(1));
        let partitions = partition(data.len(), self.pattern.len(), worker_count);

        let pattern = &self.pattern;
        let cap = self.cap;
        let initial_capacity = self.options.worker_buffer_initial_capacity;

        let mut handles = Vec::with_capacity(partitions.len());
        let mut spawn_failed = false;

        std::thread::scope(|scope| {
            for p in &partitions {
                let builder = std::thread::Builder::new();
                let spawned = builder.spawn_scoped(scope, move || {
                    let mut buffer = LocalBuffer::new(initial_capacity, cap);
                    let completed = run_partition(data, p, pattern, &mut buffer);
                    (buffer.into_vec(), completed)
                });
                match spawned {
                    Ok(h) => handles.push(h),
                    Err(e) => {
                        tracing::warn!(error = %e, "worker spawn failed");
                        spawn_failed = true;
                        break;
                    }
                }
            }
            // Leaving this scope joins every handle pushed above, including
            // any still running after a later spawn failed.
        });

        if spawn_failed {
            return Status::OpenFailed;
        }

        let mut alloc_failed = false;
        let mut worker_results: Vec<Vec<u64>> = Vec::with_capacity(handles.len());
        for h in handles {
            match h.join() {
                Ok((offsets, completed)) => {
                    if !completed {
                        alloc_failed = true;
                    }
                    worker_results.push(offsets);
                }
                Err(_) => {
                    alloc_failed = true;
                    worker_results.push(Vec::new());
                }
            }
        }

        self.merge(worker_results, alloc_failed)
    }

    fn merge(&mut self, worker_results: Vec<Vec<u64>>, alloc_failed: bool) -> Status {
        let total: usize = worker_results.iter().map(Vec::len).sum();
        let n = total.min(self.cap);

        let mut merged = Vec::new();
        if merged.try_reserve(n).is_err() {
            return Status::OutOfBounds;
        }

        for offsets in worker_results {
            if merged.len() == n {
                break;
            }
            let take = (n - merged.len()).min(offsets.len());
            merged.extend_from_slice(&offsets[..take]);
        }

        if alloc_failed && merged.is_empty() {
            tracing::warn!("all workers failed to allocate; returning empty result");
            return Status::OutOfBounds;
        }
        if alloc_failed {
            tracing::warn!("a worker's local allocation failed; result may be truncated");
        }

        self.matches = Matches::Owned(merged);
        Status::Success
    }

    /// The matches collected by the last successful `execute()`. Empty
    /// before execution or after `detach()`.
    pub fn matches(&self) -> &[u64] {
        match &self.matches {
            Matches::Owned(v) => v,
            Matches::None | Matches::Detached => &[],
        }
    }

    pub fn match_count(&self) -> usize {
        self.matches().len()
    }

    /// Transfers ownership of the match buffer to the caller. After this
    /// call, `destroy`/`Drop` will not free it: the caller (typically an
    /// FFI finalizer) is responsible for its lifetime.
    pub fn detach(&mut self) -> Vec<u64> {
        match std::mem::replace(&mut self.matches, Matches::Detached) {
            Matches::Owned(v) => v,
            Matches::None | Matches::Detached => Vec::new(),
        }
    }

    /// Releases the region and frees the match buffer unless it was
    /// detached. Idempotent: calling it (or dropping) twice frees nothing
    /// the second time.
    pub fn destroy(&mut self) {
        self.region = None;
        self.matches = Matches::Detached;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        let mut f = File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn end_to_end_small_file() {
        let (_dir, path) = write_file(
            b"Hello World\nERROR: Something broke\nINFO: All good\nERROR: Another error\n",
        );
        let mut ctx = Context::new(ScanOptions::default());
        assert_eq!(ctx.init(b"ERROR", 100), Status::Success);
        assert_eq!(ctx.load(&path), Status::Success);
        assert_eq!(ctx.execute(), Status::Success);
        assert_eq!(ctx.matches(), &[12, 46]);
        ctx.destroy();
        assert_eq!(ctx.matches(), &[] as &[u64]);
    }

    #[test]
    fn empty_file_yields_zero_matches() {
        let (_dir, path) = write_file(b"");
        let mut ctx = Context::new(ScanOptions::default());
        assert_eq!(ctx.init(b"x", 10), Status::Success);
        assert_eq!(ctx.load(&path), Status::Success);
        assert_eq!(ctx.execute(), Status::Success);
        assert_eq!(ctx.match_count(), 0);
    }

    #[test]
    fn init_rejects_empty_pattern_and_zero_cap() {
        let mut ctx = Context::new(ScanOptions::default());
        assert_eq!(ctx.init(b"", 10), Status::InvalidArg);
        assert_eq!(ctx.init(b"x", 0), Status::InvalidArg);
    }

    #[test]
    fn load_missing_file_is_open_failed() {
        let mut ctx = Context::new(ScanOptions::default());
        ctx.init(b"x", 10);
        assert_eq!(ctx.load("/nonexistent/for/pscan"), Status::OpenFailed);
    }

    #[test]
    fn destroy_is_idempotent() {
        let (_dir, path) = write_file(b"abcabc");
        let mut ctx = Context::new(ScanOptions::default());
        ctx.init(b"abc", 10);
        ctx.load(&path);
        ctx.execute();
        ctx.destroy();
        ctx.destroy();
        assert_eq!(ctx.matches(), &[] as &[u64]);
    }

    #[test]
    fn detach_hands_out_ownership_and_destroy_does_not_refree() {
        let (_dir, path) = write_file(b"abcabc");
        let mut ctx = Context::new(ScanOptions::default());
        ctx.init(b"abc", 10);
        ctx.load(&path);
        ctx.execute();
        let taken = ctx.detach();
        assert_eq!(taken, vec![0, 3]);
        ctx.destroy();
        assert_eq!(ctx.matches(), &[] as &[u64]);
    }

    #[test]
    fn parallel_path_matches_sequential_path() {
        let mut data = Vec::new();
        for i in 0..5000u32 {
            data.extend_from_slice(format!("line {i} filler text here\n").as_bytes());
            if i % 137 == 0 {
                data.extend_from_slice(b"ERROR marker\n");
            }
        }
        let (_dir, path) = write_file(&data);

        let mut sequential = Context::new(ScanOptions {
            small_file_threshold: usize::MAX,
            ..Default::default()
        });
        sequential.init(b"ERROR", 10_000);
        sequential.load(&path);
        assert_eq!(sequential.execute(), Status::Success);

        let mut parallel = Context::new(ScanOptions {
            small_file_threshold: 0,
            worker_count_override: Some(4),
            ..Default::default()
        });
        parallel.init(b"ERROR", 10_000);
        parallel.load(&path);
        assert_eq!(parallel.execute(), Status::Success);

        assert_eq!(sequential.matches(), parallel.matches());
    }

    #[test]
    fn worker_count_larger_than_file_does_not_double_count() {
        let (_dir, path) = write_file(b"abc");
        let mut ctx = Context::new(ScanOptions {
            small_file_threshold: 0,
            worker_count_override: Some(64),
            ..Default::default()
        });
        ctx.init(b"a", 10);
        ctx.load(&path);
        assert_eq!(ctx.execute(), Status::Success);
        assert_eq!(ctx.matches(), &[0]);
    }
}
