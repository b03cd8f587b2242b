//! Parallel binary mergesort.
//!
//! A special case of the k-way merge tree with fan-in two, kept separate
//! because it supports two partner stencils selectable at run time: variant
//! 0 folds the surviving upper half onto the lower half, variant 1 pairs
//! neighbours at stride `2^step`.

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::{Dataset, Medium};
use crate::merge::{file_kmerge, merge_two};
use crate::sequential::sequential_sort;
use crate::utils::ilog2_exact;

const PARAM_VARIANT: usize = 0;

fn active_procs(n: usize, step: u32) -> usize {
    n / (1 << step)
}

fn from_who(variant: i64, rank: usize, n: usize, step: u32) -> usize {
    match variant {
        1 => rank + (1 << step),
        _ => rank + active_procs(n, step) / 2,
    }
}

fn to_who(variant: i64, rank: usize, n: usize, step: u32) -> usize {
    match variant {
        1 => rank - (1 << step),
        _ => rank - active_procs(n, step) / 2,
    }
}

fn do_i_receive(variant: i64, rank: usize, n: usize, step: u32) -> bool {
    match variant {
        1 => rank % (1 << (step + 1)) == 0,
        _ => rank < active_procs(n, step) / 2,
    }
}

fn do_i_send(variant: i64, rank: usize, n: usize, step: u32) -> bool {
    match variant {
        1 => rank % (1 << (step + 1)) == 1 << step,
        _ => rank >= active_procs(n, step) / 2 && rank < active_procs(n, step),
    }
}

/// Fuses two sorted datasets, staying in memory when both sides are and the
/// result fits the budget.
fn fusion(ctx: &Ctx, mut local: Dataset, mut received: Dataset) -> Dataset {
    let total = local.len() + received.len();
    if total <= ctx.cfg().mem_budget
        && local.medium() == Medium::Mem
        && received.medium() == Medium::Mem
    {
        let merged = Dataset::from_vec(merge_two(local.as_slice(), received.as_slice()));
        local.destroy();
        received.destroy();
        merged
    } else {
        let mut merged = ctx.alloc(total);
        file_kmerge(&mut [local, received], &mut merged, ctx.cfg().buf_len);
        merged
    }
}

pub struct Mergesort;

impl Algorithm for Mergesort {
    fn name(&self) -> &'static str {
        "mergesort"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        let n = ctx.size();
        let rank = ctx.rank();
        let variant = ctx.cfg().algo_var[PARAM_VARIANT];
        assert!(n.is_power_of_two(), "mergesort needs a power-of-two rank count, got {}", n);

        let computation_p = ctx.start_phase("computation");
        ctx.stop_phase(computation_p);

        let scatter_p = ctx.start_phase("scattering");
        let (counts, displs) = ctx.cfg().deal(n);
        ctx.scatterv(data, &counts, &displs, 0);
        ctx.stop_phase(scatter_p);

        let sorting_p = ctx.start_phase("sorting");
        ctx.resume_phase(computation_p);
        let seq_p = ctx.start_phase("sequential sort");
        sequential_sort(ctx, data);
        ctx.stop_phase(seq_p);
        ctx.stop_phase(computation_p);

        let mut local = std::mem::take(data);
        for step in 0..ilog2_exact(n as u64) {
            if do_i_receive(variant, rank, n, step) {
                let received = ctx.recv_unknown(from_who(variant, rank, n, step));
                ctx.resume_phase(computation_p);
                local = fusion(ctx, local, received);
                ctx.stop_phase(computation_p);
            } else if do_i_send(variant, rank, n, step) {
                ctx.send(&mut local, to_who(variant, rank, n, step));
                local.destroy();
            }
        }
        *data = local;
        ctx.stop_phase(sorting_p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halving_stencil_pairs_halves() {
        // n = 8, variant 0, step 0: ranks 4..8 send to 0..4.
        for rank in 4..8 {
            assert!(do_i_send(0, rank, 8, 0));
        }
        for rank in 0..4 {
            assert!(do_i_receive(0, rank, 8, 0));
            assert_eq!(from_who(0, rank, 8, 0), rank + 4);
        }
        // Step 1: ranks 2..4 fold onto 0..2.
        assert!(do_i_send(0, 2, 8, 1));
        assert!(do_i_receive(0, 1, 8, 1));
        assert_eq!(from_who(0, 1, 8, 1), 3);
    }

    #[test]
    fn stride_stencil_pairs_neighbours() {
        // n = 8, variant 1, step 0: odd ranks send to rank - 1.
        for rank in (1..8).step_by(2) {
            assert!(do_i_send(1, rank, 8, 0));
            assert_eq!(to_who(1, rank, 8, 0), rank - 1);
        }
        assert!(do_i_receive(1, 0, 8, 1));
        assert_eq!(from_who(1, 0, 8, 1), 2);
        assert!(do_i_send(1, 2, 8, 1));
        assert_eq!(to_who(1, 2, 8, 1), 0);
    }

    #[test]
    fn both_stencils_match_senders_to_receivers() {
        for variant in [0i64, 1] {
            let n = 16usize;
            for step in 0..4 {
                for sender in 0..n {
                    if do_i_send(variant, sender, n, step) {
                        let dst = to_who(variant, sender, n, step);
                        assert!(do_i_receive(variant, dst, n, step));
                        assert_eq!(from_who(variant, dst, n, step), sender);
                    }
                }
            }
        }
    }
}
