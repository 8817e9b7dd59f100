// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

//! The vectorized literal-match algorithm.
//!
//! [`scan_raw`] is a pure function over a byte slice: no allocation, no I/O,
//! no knowledge of files or threads. Everything above it (region, worker,
//! context) exists to feed it the right slice and collect what it writes.

/// Writes ascending offsets of `pattern` within `data` into `out`, stopping
/// at `cap` matches. Returns the number of offsets written.
///
/// `out` must have room for at least `cap` elements. An offset `i` is
/// written whenever `data[i..i + pattern.len()] == pattern`; overlapping
/// occurrences are all reported. Never reads `data[data.len()..]`.
pub fn scan_raw(data: &[u8], pattern: &[u8], cap: usize, out: &mut [u64]) -> usize {
    debug_assert!(out.len() >= cap);

    if cap == 0 || pattern.is_empty() || data.len() < pattern.len() {
        return 0;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("sse2") {
            // SAFETY: sse2 support just checked.
            return unsafe { scan_sse2(data, pattern, cap, out) };
        }
    }

    scan_scalar(data, pattern, cap, out)
}

/// Fallback / non-SSE2 path: `memchr` for the first-byte prefilter, then
/// full verification. Produces byte-for-byte identical output to the
/// vectorized path; only throughput differs.
fn scan_scalar(data: &[u8], pattern: &[u8], cap: usize, out: &mut [u64]) -> usize {
    let p0 = pattern[0];
    let plen = pattern.len();
    let last_start = data.len() - plen;

    let mut count = 0usize;
    let mut pos = 0usize;
    while count < cap && pos <= last_start {
        match memchr::memchr(p0, &data[pos..=last_start]) {
            Some(rel) => {
                let i = pos + rel;
                if data[i..i + plen] == *pattern {
                    out[count] = i as u64;
                    count += 1;
                }
                pos = i + 1;
            }
            None => break,
        }
    }
    count
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn scan_sse2(data: &[u8], pattern: &[u8], cap: usize, out: &mut [u64]) -> usize {
    use std::arch::x86_64::*;

    let plen = pattern.len();
    let last_start = data.len() - plen;
    let mut count = 0usize;

    let first = _mm_set1_epi8(pattern[0] as i8);
    let second = if plen >= 2 {
        Some(_mm_set1_epi8(pattern[1] as i8))
    } else {
        None
    };

    let base = data.as_ptr();

    let mut i = 0usize;
    // `i + 16 <= data.len()` (rather than a precomputed `stride_end` via
    // `saturating_sub`) guards against `data.len() < 16`: a saturating
    // subtraction would floor at 0 and let the loop load 16 bytes past a
    // shorter buffer.
    while i + 16 <= data.len() && count < cap {
        // Unaligned load: `data` carries no alignment guarantee.
        let chunk = _mm_loadu_si128(base.add(i) as *const __m128i);
        let eq = _mm_cmpeq_epi8(chunk, first);
        let mut mask = _mm_movemask_epi8(eq) as u32;

        if let Some(second) = second {
            if i + 17 <= data.len() {
                let chunk2 = _mm_loadu_si128(base.add(i + 1) as *const __m128i);
                let eq2 = _mm_cmpeq_epi8(chunk2, second);
                let mask2 = _mm_movemask_epi8(eq2) as u32;
                mask &= mask2;
            }
        }

        while mask != 0 && count < cap {
            let bit = mask.trailing_zeros() as usize;
            let candidate = i + bit;
            if candidate <= last_start && data[candidate..candidate + plen] == *pattern {
                out[count] = candidate as u64;
                count += 1;
            }
            mask &= mask - 1;
        }

        i += 16;
    }

    // Scalar tail: remaining positions below 16 bytes from the end.
    while i <= last_start && count < cap {
        if data[i..i + plen] == *pattern {
            out[count] = i as u64;
            count += 1;
        }
        i += 1;
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn run(data: &[u8], pattern: &[u8], cap: usize) -> Vec<u64> {
        let mut out = vec![0u64; cap];
        let n = scan_raw(data, pattern, cap, &mut out);
        out.truncate(n);
        out
    }

    #[test]
    fn empty_pattern_yields_nothing() {
        assert_eq!(run(b"hello", b"", 100), Vec::<u64>::new());
    }

    #[test]
    fn pattern_longer_than_data_yields_nothing() {
        assert_eq!(run(b"x", b"xx", 100), Vec::<u64>::new());
    }

    #[test]
    fn overlapping_matches_all_reported() {
        assert_eq!(run(b"aaaa", b"aa", 100), vec![0, 1, 2]);
    }

    #[test]
    fn cap_truncates() {
        assert_eq!(run(b"abcabcabc", b"abc", 2), vec![0, 3]);
    }

    #[test]
    fn single_byte_pattern() {
        assert_eq!(
            run(b"Hello World\nERROR: Something broke\nINFO: All good\nERROR: Another error\n",
                b"ERROR", 100),
            vec![12, 46]
        );
    }

    #[test]
    fn zero_cap_writes_nothing() {
        assert_eq!(run(b"aaaa", b"a", 0), Vec::<u64>::new());
    }

    #[test]
    fn data_shorter_than_one_simd_stride() {
        assert_eq!(run(b"ab", b"ab", 100), vec![0]);
        assert_eq!(run(b"xxxxxxxxxxxxxxx", b"xx", 100).len(), 14);
    }

    #[test]
    fn pattern_straddling_stride_boundary() {
        let mut data = vec![b'x'; 30];
        data[14] = b'A';
        data[15] = b'B';
        assert_eq!(run(&data, b"AB", 100), vec![14]);
    }

    #[test]
    fn matches_naive_scan_on_random_inputs() {
        use proptest::prelude::*;
        use proptest::test_runner::TestRunner;

        let mut runner = TestRunner::default();
        runner
            .run(
                &(
                    proptest::collection::vec(0u8..4, 0..256),
                    proptest::collection::vec(0u8..4, 1..5),
                    1usize..50,
                ),
                |(data, pattern, cap)| {
                    let expected = naive(&data, &pattern, cap);
                    let actual = run(&data, &pattern, cap);
                    prop_assert_eq!(expected, actual);
                    Ok(())
                },
            )
            .unwrap();
    }
}
