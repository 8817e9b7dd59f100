// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::Write;

use pscan_core::{Context, ScanOptions, Status};
use proptest::prelude::*;

fn naive(data: &[u8], pattern: &[u8], cap: usize) -> Vec<u64> {
    let mut out = Vec::new();
    if pattern.is_empty() || data.len() < pattern.len() {
        return out;
    }
    for i in 0..=data.len() - pattern.len() {
        if out.len() == cap {
            break;
        }
        if &data[i..i + pattern.len()] == pattern {
            out.push(i as u64);
        }
    }
    out
}

fn scan_with(options: ScanOptions, data: &[u8], pattern: &[u8], cap: usize) -> Vec<u64> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data");
    let mut f = File::create(&path).unwrap();
    f.write_all(data).unwrap();
    drop(f);

    let mut ctx = Context::new(options);
    ctx.init(pattern, cap);
    ctx.load(&path);
    assert_eq!(ctx.execute(), Status::Success);
    ctx.matches().to_vec()
}

proptest! {
    #[test]
    fn matches_naive_scan_over_small_alphabet(
        data in proptest::collection::vec(0u8..4, 0..2048),
        pattern in proptest::collection::vec(0u8..4, 1..6),
        cap in 1usize..200,
    ) {
        let expected = naive(&data, &pattern, cap);
        let actual = scan_with(ScanOptions::default(), &data, &pattern, cap);
        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn parallel_path_agrees_with_sequential_path(
        data in proptest::collection::vec(0u8..6, 0..8192),
        pattern in proptest::collection::vec(0u8..6, 1..8),
        cap in 1usize..500,
        worker_count in 1usize..8,
    ) {
        let sequential = scan_with(
            ScanOptions { small_file_threshold: usize::MAX, ..Default::default() },
            &data, &pattern, cap,
        );
        let parallel = scan_with(
            ScanOptions {
                small_file_threshold: 0,
                worker_count_override: Some(worker_count),
                ..Default::default()
            },
            &data, &pattern, cap,
        );
        prop_assert_eq!(sequential, parallel);
    }

    #[test]
    fn results_are_sorted_in_range_and_within_cap(
        data in proptest::collection::vec(0u8..4, 1..2048),
        pattern in proptest::collection::vec(0u8..4, 1..5),
        cap in 1usize..100,
    ) {
        let matches = scan_with(ScanOptions::default(), &data, &pattern, cap);
        prop_assert!(matches.len() <= cap);
        for w in matches.windows(2) {
            prop_assert!(w[0] < w[1]);
        }
        for &m in &matches {
            prop_assert!((m as usize) + pattern.len() <= data.len());
        }
    }
}
