//! K-way merging of sorted runs, in memory and out of core.
//!
//! All mergers are driven by a binary min-heap keyed on the head element of
//! each run, with the run index as tiebreaker so equal elements drain in run
//! order and the merge stays stable across runs.

use crate::dataset::Dataset;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Merges `runs.len()` sorted runs laid out inside `src` at `displs` with
/// lengths `lengths`, into one sorted vector.
pub fn kmerge_slices(src: &[i32], lengths: &[u64], displs: &[u64]) -> Vec<i32> {
    assert_eq!(lengths.len(), displs.len());
    let runs: Vec<&[i32]> = lengths
        .iter()
        .zip(displs)
        .map(|(&len, &off)| &src[off as usize..(off + len) as usize])
        .collect();
    kmerge_runs(&runs)
}

/// Merges independent sorted runs into one sorted vector.
pub fn kmerge_runs(runs: &[&[i32]]) -> Vec<i32> {
    let total: usize = runs.iter().map(|r| r.len()).sum();
    let mut out = Vec::with_capacity(total);

    // (head value, run index); Reverse turns the max-heap into a min-heap.
    let mut heap: BinaryHeap<Reverse<(i32, usize)>> = BinaryHeap::with_capacity(runs.len());
    let mut idx = vec![0usize; runs.len()];
    for (run, r) in runs.iter().enumerate() {
        if !r.is_empty() {
            heap.push(Reverse((r[0], run)));
        }
    }

    while let Some(Reverse((val, run))) = heap.pop() {
        out.push(val);
        idx[run] += 1;
        if let Some(&next) = runs[run].get(idx[run]) {
            heap.push(Reverse((next, run)));
        }
    }
    out
}

/// Two-way merge of sorted vectors.
pub fn merge_two(a: &[i32], b: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Out-of-core k-way merge: drains `runs` (each individually sorted, any
/// medium) into `out` using at most `buf_len` elements of memory at once.
///
/// The buffer is split into `k + 1` equal regions: one read window per run
/// plus one output window, so memory use is bounded regardless of run sizes.
pub fn file_kmerge(runs: &mut [Dataset], out: &mut Dataset, buf_len: usize) {
    let k = runs.len();
    assert!(k >= 1);
    let window = buf_len / (k + 1);
    assert!(
        window >= 1,
        "merge buffer of {} elements cannot serve {} runs",
        buf_len,
        k
    );

    let run_len: Vec<u64> = runs.iter().map(|r| r.len()).collect();
    let total: u64 = run_len.iter().sum();

    // One backing buffer, region r at r*window; the last region is output.
    let mut buf = vec![0i32; window * (k + 1)];
    let mut consumed = vec![0u64; k]; // elements taken from each run so far
    let mut fill = vec![0usize; k]; // valid elements in each read window
    let mut at = vec![0usize; k]; // cursor within each read window
    let mut out_fill = 0usize;
    let mut out_off = 0u64;

    let mut heap: BinaryHeap<Reverse<(i32, usize)>> = BinaryHeap::with_capacity(k);
    for run in 0..k {
        let got = runs[run].read_at(0, &mut buf[run * window..(run + 1) * window]) as usize;
        fill[run] = got;
        consumed[run] = got as u64;
        if got > 0 {
            heap.push(Reverse((buf[run * window], run)));
            at[run] = 1;
        }
    }

    let mut written = 0u64;
    while let Some(Reverse((val, run))) = heap.pop() {
        buf[k * window + out_fill] = val;
        out_fill += 1;
        written += 1;
        if out_fill == window {
            out.write_at(out_off, &buf[k * window..(k + 1) * window]);
            out_off += out_fill as u64;
            out_fill = 0;
        }

        // Advance the source run, refilling its window when drained.
        if at[run] == fill[run] {
            let got =
                runs[run].read_at(consumed[run], &mut buf[run * window..(run + 1) * window]) as usize;
            fill[run] = got;
            consumed[run] += got as u64;
            at[run] = 0;
        }
        if at[run] < fill[run] {
            heap.push(Reverse((buf[run * window + at[run]], run)));
            at[run] += 1;
        }
    }

    if out_fill > 0 {
        out.write_at(out_off, &buf[k * window..k * window + out_fill]);
    }
    assert_eq!(written, total, "merge lost elements");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    #[test]
    fn merges_flat_runs() {
        let src = [1, 4, 7, 2, 5, 8, 0, 3, 6];
        let out = kmerge_slices(&src, &[3, 3, 3], &[0, 3, 6]);
        assert_eq!(out, (0..9).collect::<Vec<i32>>());
    }

    #[test]
    fn empty_runs_are_skipped() {
        let out = kmerge_slices(&[5, 9], &[0, 1, 0, 1], &[0, 0, 1, 1]);
        assert_eq!(out, vec![5, 9]);
        assert!(kmerge_runs(&[&[], &[]]).is_empty());
    }

    #[test]
    fn duplicates_survive() {
        let out = kmerge_runs(&[&[1, 3, 3], &[3, 3, 5]]);
        assert_eq!(out, vec![1, 3, 3, 3, 3, 5]);
    }

    #[test]
    fn two_way_merge() {
        assert_eq!(merge_two(&[1, 3, 5], &[2, 4]), vec![1, 2, 3, 4, 5]);
        assert_eq!(merge_two(&[], &[7]), vec![7]);
    }

    #[test]
    fn file_merge_with_tiny_windows() {
        // buf_len 7 with 2 runs gives a window of 2, forcing repeated refills
        // and output flushes.
        let a: Vec<i32> = (0..20).step_by(2).collect();
        let b: Vec<i32> = (1..21).step_by(2).collect();
        let mut runs = vec![Dataset::from_vec(a), Dataset::from_vec(b)];
        let mut out = Dataset::new();
        out.alloc(20, u64::MAX);
        file_kmerge(&mut runs, &mut out, 7);
        assert_eq!(out.take_vec(), (0..20).collect::<Vec<i32>>());
    }

    #[test]
    fn file_merge_across_media() {
        let mut spilled = Dataset::new();
        spilled.alloc(50, 0); // forced to disk
        let evens: Vec<i32> = (0..100).step_by(2).collect();
        spilled.write_at(0, &evens);

        let odds: Vec<i32> = (1..100).step_by(2).collect();
        let mut runs = vec![spilled, Dataset::from_vec(odds)];
        let mut out = Dataset::new();
        out.alloc(100, 0); // output also on disk
        file_kmerge(&mut runs, &mut out, 9);
        assert_eq!(out.take_vec(), (0..100).collect::<Vec<i32>>());
    }

    #[test]
    #[should_panic]
    fn refuses_undersized_buffer() {
        let mut runs = vec![Dataset::from_vec(vec![1]), Dataset::from_vec(vec![2])];
        let mut out = Dataset::new();
        out.alloc(2, u64::MAX);
        file_kmerge(&mut runs, &mut out, 2);
    }
}
