//! Parallel bitonic sort.
//!
//! After an even scatter and a local sort, ranks run `log2(n)` merge stages;
//! stage `i` pairs each rank with the ranks differing in one of the low `i`
//! bits, exchanging whole partitions and keeping either the low or the high
//! half of the merged pair. Requires a power-of-two rank count and an evenly
//! divisible element count, since every exchange assumes equal partitions.

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::Dataset;
use crate::sequential::sequential_sort;
use crate::utils::ilog2_exact;

/// Keeps the `mine.len()` smallest of the two merged sorted sequences.
fn compare_low(theirs: &[i32], mine: &mut [i32]) {
    let mut kept = Vec::with_capacity(mine.len());
    let (mut j, mut k) = (0, 0);
    for _ in 0..mine.len() {
        if k >= theirs.len() || (j < mine.len() && mine[j] <= theirs[k]) {
            kept.push(mine[j]);
            j += 1;
        } else {
            kept.push(theirs[k]);
            k += 1;
        }
    }
    mine.copy_from_slice(&kept);
}

/// Keeps the `mine.len()` largest of the two merged sorted sequences.
fn compare_high(theirs: &[i32], mine: &mut [i32]) {
    let size = mine.len();
    let mut kept = vec![0i32; size];
    let mut j = size as isize - 1;
    let mut k = theirs.len() as isize - 1;
    for i in (0..size).rev() {
        if k < 0 || (j >= 0 && mine[j as usize] >= theirs[k as usize]) {
            kept[i] = mine[j as usize];
            j -= 1;
        } else {
            kept[i] = theirs[k as usize];
            k -= 1;
        }
    }
    mine.copy_from_slice(&kept);
}

pub struct BitonicSort;

impl Algorithm for BitonicSort {
    fn name(&self) -> &'static str {
        "bitonicsort"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        let n = ctx.size();
        let rank = ctx.rank();
        assert!(n.is_power_of_two(), "bitonicsort needs a power-of-two rank count, got {}", n);
        assert_eq!(
            ctx.m() % n as u64,
            0,
            "bitonicsort needs {} elements to divide evenly over {} ranks",
            ctx.m(),
            n
        );
        let local_m = ctx.m() / n as u64;

        let scatter_p = ctx.start_phase("scattering");
        ctx.scatter(data, local_m, 0);
        ctx.stop_phase(scatter_p);

        let local_p = ctx.start_phase("local sorting");
        sequential_sort(ctx, data);
        ctx.stop_phase(local_p);

        let merge_p = ctx.start_phase("parallel merge");
        let stages = ilog2_exact(n as u64);
        let mut recv = Dataset::new();
        let mut mask = 2usize;
        for i in 1..=stages {
            // flag tells whether this rank sits in an ascending or a
            // descending half of the current bitonic sequence.
            let flag: i64 = if rank & mask == 0 { -1 } else { 1 };
            let mut mask2 = 1usize << (i - 1);
            for _ in 0..i {
                let partner = rank ^ mask2;
                let got = ctx.sendrecv(data, local_m, 0, &mut recv, 0, partner);
                assert_eq!(got, local_m, "partner {} sent an uneven partition", partner);

                // Each rank runs the dual operation of its partner.
                if (rank as i64 - partner as i64) * flag > 0 {
                    compare_low(recv.as_slice(), data.as_mut_slice());
                } else {
                    compare_high(recv.as_slice(), data.as_mut_slice());
                }
                mask2 >>= 1;
            }
            mask <<= 1;
        }
        recv.destroy();
        ctx.stop_phase(merge_p);

        let gather_p = ctx.start_phase("gathering");
        ctx.gather(data, local_m, 0);
        ctx.stop_phase(gather_p);
    }
}
