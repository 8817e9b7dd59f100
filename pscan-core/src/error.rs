// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use crate::status::Status;

/// Internal diagnostic error carrying the context a [`Status`] discards.
///
/// Every fallible path in the core produces one of these first, then maps it
/// to a [`Status`] at the public boundary via [`ScanError::status`]. Keeping
/// the two separate lets internal code log a path and an `io::Error` while
/// the FFI/CLI surface only ever sees the closed set of status codes.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("a required argument was null")]
    NullArg,

    #[error("pattern must be non-empty and no longer than the file it scans")]
    InvalidPattern,

    #[error("cap must be a positive number of matches")]
    InvalidCap,

    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to query metadata for {path}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a regular file")]
    NotARegularFile { path: PathBuf },

    #[error("failed to map {path} into memory")]
    Mmap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to grow match buffer")]
    Alloc,
}

impl ScanError {
    /// Collapse this diagnostic onto the closed status taxonomy that crosses
    /// the public boundary.
    pub fn status(&self) -> Status {
        match self {
            ScanError::NullArg => Status::NullArg,
            ScanError::InvalidPattern | ScanError::InvalidCap => Status::InvalidArg,
            ScanError::Open { .. } | ScanError::NotARegularFile { .. } => Status::OpenFailed,
            ScanError::Metadata { .. } => Status::OpenFailed,
            ScanError::Mmap { .. } => Status::MmapFailed,
            ScanError::Alloc => Status::OutOfBounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_maps_to_a_failure_status() {
        let errs = [
            ScanError::NullArg,
            ScanError::InvalidPattern,
            ScanError::InvalidCap,
            ScanError::Alloc,
            ScanError::NotARegularFile {
                path: PathBuf::from("/tmp/x"),
            },
        ];
        for e in errs {
            assert!(!e.status().is_success());
        }
    }
}
