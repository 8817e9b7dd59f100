// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

//! The memory-mapped, read-only view of a file that every scan operates over.

use std::fs::File;
use std::path::Path;

use memmap2::{Advice, Mmap, MmapOptions};
use tracing::instrument;

use crate::error::ScanError;

/// An immutable whole-file mapping.
///
/// `Region` owns the open file descriptor for as long as the mapping is
/// alive. Empty files are represented without ever calling `mmap`: a
/// zero-length mapping is not a portable operation, and an empty region has
/// no bytes a scan could read anyway.
pub struct Region {
    mmap: Option<Mmap>,
    // Kept alive alongside `mmap`; some platforms require the descriptor to
    // outlive the mapping, though `memmap2::Mmap` already holds its own.
    _file: File,
    size: usize,
}

impl Region {
    /// Opens `path` read-only and maps its full contents into memory.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ScanError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata = file.metadata().map_err(|source| ScanError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(ScanError::NotARegularFile {
                path: path.to_path_buf(),
            });
        }

        let size = metadata.len() as usize;
        if size == 0 {
            tracing::trace!("empty file, skipping mmap");
            return Ok(Region {
                mmap: None,
                _file: file,
                size: 0,
            });
        }

        // SAFETY: the file is opened read-only above and is not modified by
        // this process for the lifetime of the mapping; external truncation
        // remains a documented hazard (see crate docs).
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|source| ScanError::Mmap {
            path: path.to_path_buf(),
            source,
        })?;

        let _ = mmap.advise(Advice::Sequential);
        let _ = mmap.advise(Advice::WillNeed);

        tracing::trace!(size, "mapped region");
        Ok(Region {
            mmap: Some(mmap),
            _file: file,
            size,
        })
    }

    /// The mapped byte count. `0` for an empty file.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The mapped bytes. Empty for a zero-size file; never touches a mapping
    /// in that case.
    pub fn as_slice(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => mmap,
            None => &[],
        }
    }
}

// `close()` in the spec's vocabulary is just `Drop`: unmapping and closing
// the descriptor happen when `Region` goes out of scope, and dropping twice
// is not possible in safe Rust, which gives idempotence for free.
