//! Load-balanced pairwise mergesort.
//!
//! Groups of ranks double each round: paired groups exchange their splitter
//! samples, re-bucket their (always sorted) local data against splitters for
//! the merged group, swap buckets pairwise, and two-way merge what they keep
//! with what they receive. After `log2(n)` rounds every rank holds one
//! contiguous slice of the global order, sized within a constant factor of
//! the even share.
//!
//! The bucket swap inside a merged group of `2g` ranks runs `2g - 1`
//! exchange rounds; in round `s` each rank pairs with the member whose group
//! offset differs by XOR `s`, a perfect matching per round.

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::Dataset;
use crate::merge::merge_two;
use crate::splitters::{bucket_index, choose_splitters};
use crate::utils::{ilog2_exact, prefix_displs};
use arbitrary_chunks::ArbitraryChunks;
use nanorand::WyRand;

pub struct LoadBalancedMergesort;

impl Algorithm for LoadBalancedMergesort {
    fn name(&self) -> &'static str {
        "lbmergesort"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        let n = ctx.size();
        let rank = ctx.rank();
        assert!(
            n.is_power_of_two(),
            "lbmergesort needs a power-of-two rank count, got {}",
            n
        );
        let mut rng = WyRand::new_seed(ctx.cfg().seed ^ rank as u64);

        let scatter_p = ctx.start_phase("scattering");
        let (counts, displs) = ctx.cfg().deal(n);
        ctx.scatterv(data, &counts, &displs, 0);
        ctx.stop_phase(scatter_p);

        let local_p = ctx.start_phase("local sorting");
        let mut local = data.take_vec();
        local.sort_unstable();

        // Group splitters accumulate across rounds: after merging with the
        // paired group's they describe the whole merged group's data.
        let mut group_splitters = choose_splitters(&local, n, &mut rng);
        let mut splitters_count = 0usize;
        let mut group_size = 1usize;
        for _ in 1..=ilog2_exact(n as u64) {
            splitters_count += group_size;
            let partner = rank ^ group_size;
            let group_root = rank - rank % group_size;
            let paired_root = if rank & group_size != 0 {
                group_root - group_size
            } else {
                group_root + group_size
            };
            let base = group_root.min(paired_root);

            let received = ctx.comm().exchange_elems(partner, &group_splitters);
            group_splitters = merge_two(&group_splitters, &received);

            // Splitters for this round's merged group of 2g ranks.
            let step_splitters =
                choose_splitters(&group_splitters, splitters_count + 1, &mut rng);

            let mut scounts = vec![0usize; n];
            for &e in &local {
                scounts[base + bucket_index(e, &step_splitters)] += 1;
            }
            // Local data is sorted, so the outgoing buckets are exactly the
            // count-sized chunks in rank order.
            let buckets: Vec<&[i32]> = local.arbitrary_chunks(&scounts).collect();

            let mut received: Vec<i32> = Vec::new();
            let mut sent = 0usize;
            let offset = rank - base;
            for s in 1..2 * group_size {
                let peer = base + (offset ^ s);
                received.extend(ctx.comm().exchange_elems(peer, buckets[peer]));
                sent += buckets[peer].len();
            }
            // Arrival order is schedule order, not sorted order.
            received.sort_unstable();
            let kept = buckets[rank];
            debug_assert_eq!(sent + kept.len(), local.len());
            local = merge_two(&received, kept);

            group_size <<= 1;
        }
        ctx.stop_phase(local_p);

        let gather_p = ctx.start_phase("gathering");
        let len = local.len() as u64;
        *data = Dataset::from_vec(local);
        let all_lens = ctx.gather_counts(&[len], 0);
        let gdispls = prefix_displs(&all_lens);
        ctx.gatherv(data, &all_lens, &gdispls, 0);
        ctx.stop_phase(gather_p);
    }
}
