//! Parallel k-way mergesort.
//!
//! Ranks form a k-ary merge tree: in every step the surviving ranks each
//! collect `k - 1` sorted partitions from the ranks about to retire and fuse
//! them with their own, until rank 0 holds the whole sequence. Requires
//! `n == k^q` for some integer `q`.

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::{Dataset, Medium};
use crate::merge::{file_kmerge, kmerge_runs};
use crate::sequential::sequential_sort;
use crate::utils::logk_exact;

const PARAM_K: usize = 0;

/// Ranks this process receives partitions from in the current step.
fn from_who(rank: usize, k: usize, active: usize) -> Vec<usize> {
    let receiving = if active >= k { k - 1 } else { active - 1 };
    (0..receiving)
        .map(|i| {
            if active >= k {
                rank + (1 + i) * (active / k)
            } else {
                rank + 1 + i
            }
        })
        .collect()
}

/// Rank this process sends its partition to in the current step.
fn to_who(rank: usize, k: usize, active: usize) -> usize {
    if active < k {
        0
    } else {
        rank % (active / k)
    }
}

fn do_i_receive(rank: usize, k: usize, active: usize) -> bool {
    rank < active / k || rank == 0
}

fn do_i_send(rank: usize, k: usize, active: usize) -> bool {
    rank >= active / k && rank < active
}

/// Fuses sorted runs into one sorted dataset, in memory when every run is
/// memory-resident and the result fits the budget, out of core otherwise.
fn fusion(ctx: &Ctx, mut runs: Vec<Dataset>) -> Dataset {
    let total: u64 = runs.iter().map(|r| r.len()).sum();
    let in_memory =
        total <= ctx.cfg().mem_budget && runs.iter().all(|r| r.medium() == Medium::Mem);

    if in_memory {
        let slices: Vec<&[i32]> = runs.iter().map(|r| r.as_slice()).collect();
        let merged = Dataset::from_vec(kmerge_runs(&slices));
        for run in &mut runs {
            run.destroy();
        }
        merged
    } else {
        let mut merged = ctx.alloc(total);
        file_kmerge(&mut runs, &mut merged, ctx.cfg().buf_len);
        for run in &mut runs {
            run.destroy();
        }
        merged
    }
}

pub struct KWayMergesort;

impl Algorithm for KWayMergesort {
    fn name(&self) -> &'static str {
        "kmerge"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        let n = ctx.size();
        let rank = ctx.rank();
        let k = ctx.cfg().algo_var[PARAM_K].max(2) as usize;
        assert!(
            logk_exact(n as u64, k as u64).is_some(),
            "kmerge with fan-in {} needs a rank count that is a power of {}, got {}",
            k,
            k,
            n
        );

        let scatter_p = ctx.start_phase("scattering");
        let (counts, displs) = ctx.cfg().deal(n);
        ctx.scatterv(data, &counts, &displs, 0);
        ctx.stop_phase(scatter_p);

        let sorting_p = ctx.start_phase("sorting");
        sequential_sort(ctx, data);

        let mut owned = std::mem::take(data);
        let mut active = n;
        while active > 1 {
            if do_i_receive(rank, k, active) {
                let mut runs = vec![owned];
                for src in from_who(rank, k, active) {
                    runs.push(ctx.recv_unknown(src));
                }
                owned = fusion(ctx, runs);
            } else if do_i_send(rank, k, active) {
                ctx.send(&mut owned, to_who(rank, k, active));
                owned.destroy();
            }
            active /= k;
        }
        *data = owned;
        ctx.stop_phase(sorting_p);
    }
}
