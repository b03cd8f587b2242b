//! Splitter selection and bucket routing.
//!
//! Splitters partition the key space into `n` buckets, one per rank. They are
//! sampled equidistantly from sorted data; when the data is too small to
//! yield `n - 1` distinct positions, random keys stand in so every algorithm
//! still receives a full splitter vector.

use crate::dal::Ctx;
use nanorand::{Rng, WyRand};

/// Picks `n - 1` splitters from `sorted`. Equidistant sampling when the data
/// is long enough, random fallback otherwise.
pub fn choose_splitters(sorted: &[i32], n: usize, rng: &mut WyRand) -> Vec<i32> {
    assert!(n >= 1);
    if sorted.len() >= n {
        (1..n).map(|i| sorted[i * sorted.len() / n]).collect()
    } else {
        let mut s: Vec<i32> = (1..n).map(|_| rng.generate::<i32>()).collect();
        s.sort_unstable();
        s
    }
}

/// Destination bucket for `e` under `splitters` (sorted, length `n - 1`):
/// the first bucket whose splitter is not below `e`. An element equal to a
/// splitter routes to that splitter's own bucket.
pub fn bucket_index(e: i32, splitters: &[i32]) -> usize {
    splitters.partition_point(|&s| s < e)
}

/// Cluster-wide splitter agreement: each rank contributes local splitters,
/// the root re-samples the gathered (and re-sorted) candidates, and the
/// final vector is broadcast so every rank buckets identically.
pub fn select_global_splitters(ctx: &Ctx, local_sorted: &[i32]) -> Vec<i32> {
    let n = ctx.size();
    let mut rng = WyRand::new_seed(ctx.cfg().seed ^ ctx.rank() as u64);
    let local = choose_splitters(local_sorted, n, &mut rng);

    let mut all = ctx.gather_vec(&local, 0);
    let global = if ctx.rank() == 0 {
        all.sort_unstable();
        choose_splitters(&all, n, &mut rng)
    } else {
        Vec::new()
    };
    ctx.bcast_vec(global, 0)
}
