//! Load-balanced multiway mergesort.
//!
//! Sampled global splitters bucket every rank's sorted partition, then
//! `log2(n)` rounds of pairwise group exchanges deliver each bucket to its
//! owner; the arrival-ordered runs are fused with one n-way merge. The
//! sampling bounds every final bucket by roughly four times the even share.
//!
//! Within a round, the partner sequence rotates through the paired group so
//! that at every instant the exchanges form a perfect matching across the
//! two groups.

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::Dataset;
use crate::merge::kmerge_slices;
use crate::sequential::sequential_sort;
use crate::splitters::{bucket_index, select_global_splitters};
use crate::utils::{ilog2_exact, prefix_displs};

pub struct LoadBalancedKWayMergesort;

impl Algorithm for LoadBalancedKWayMergesort {
    fn name(&self) -> &'static str {
        "lbkmergesort"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        let n = ctx.size();
        let rank = ctx.rank();
        assert!(
            n.is_power_of_two(),
            "lbkmergesort needs a power-of-two rank count, got {}",
            n
        );

        let scatter_p = ctx.start_phase("scattering");
        let (counts, displs) = ctx.cfg().deal(n);
        ctx.scatterv(data, &counts, &displs, 0);
        ctx.stop_phase(scatter_p);

        let local_p = ctx.start_phase("local sorting");
        sequential_sort(ctx, data);
        ctx.stop_phase(local_p);

        let sampling_p = ctx.start_phase("sampling");
        let splitters = select_global_splitters(ctx, data.as_slice());
        ctx.stop_phase(sampling_p);

        let merge_p = ctx.start_phase("parallel multiway merge");
        let mut scounts = vec![0u64; n];
        for &e in data.as_slice() {
            scounts[bucket_index(e, &splitters)] += 1;
        }
        let sdispls = prefix_displs(&scounts);

        // Buckets arrive in partner order, one run per peer plus our own.
        let mut recv = Dataset::new();
        let mut recv_counts = vec![0u64; n];
        let mut z = 0usize;
        let mut data_len = 0u64;
        let mut group_size = 1usize;
        for _ in 1..=ilog2_exact(n as u64) {
            let partner = rank ^ group_size;
            let group_root = rank - rank % group_size;
            let paired_root = if rank & group_size != 0 {
                group_root - group_size
            } else {
                group_root + group_size
            };
            let flag: i64 = if group_root < paired_root { 1 } else { -1 };

            let mut j = partner;
            for h in 1..=group_size {
                let got = ctx.sendrecv(data, scounts[j], sdispls[j], &mut recv, data_len, j);
                data_len += got;
                recv_counts[z] = got;
                z += 1;

                // Next partner in the rotation through the paired group.
                j = ((rank as i64 + h as i64 * flag).rem_euclid(group_size as i64) as usize
                    + group_root)
                    ^ group_size;
            }
            group_size <<= 1;
        }
        // Our own bucket joins as the last run.
        {
            if recv.is_uninit() {
                recv = ctx.alloc(scounts[rank]);
            }
            let own = &data.as_slice()
                [sdispls[rank] as usize..(sdispls[rank] + scounts[rank]) as usize];
            recv.write_at(data_len, own);
            data_len += scounts[rank];
            recv_counts[z] = scounts[rank];
        }

        let rdispls = prefix_displs(&recv_counts);
        *data = Dataset::from_vec(kmerge_slices(recv.as_slice(), &recv_counts, &rdispls));
        recv.destroy();
        ctx.stop_phase(merge_p);

        let gather_p = ctx.start_phase("gathering");
        let all_lens = ctx.gather_counts(&[data_len], 0);
        let gdispls = prefix_displs(&all_lens);
        ctx.gatherv(data, &all_lens, &gdispls, 0);
        ctx.stop_phase(gather_p);
    }
}

#[cfg(test)]
mod tests {
    /// The rotation schedule from the merge phase, reproduced standalone.
    fn round_partners(rank: usize, n: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut group_size = 1usize;
        while group_size < n {
            let partner = rank ^ group_size;
            let group_root = rank - rank % group_size;
            let paired_root = if rank & group_size != 0 {
                group_root - group_size
            } else {
                group_root + group_size
            };
            let flag: i64 = if group_root < paired_root { 1 } else { -1 };
            let mut j = partner;
            for h in 1..=group_size {
                out.push(j);
                j = ((rank as i64 + h as i64 * flag).rem_euclid(group_size as i64) as usize
                    + group_root)
                    ^ group_size;
            }
            group_size <<= 1;
        }
        out
    }

    #[test]
    fn every_pair_exchanges_exactly_once() {
        for n in [2usize, 4, 8, 16] {
            for rank in 0..n {
                let mut partners = round_partners(rank, n);
                partners.sort_unstable();
                let expect: Vec<usize> = (0..n).filter(|&p| p != rank).collect();
                assert_eq!(partners, expect, "rank {} of {}", rank, n);
            }
        }
    }

    #[test]
    fn schedule_is_a_perfect_matching_each_instant() {
        // If a's t-th partner is b, then b's t-th partner must be a,
        // otherwise the synchronous exchange would deadlock.
        for n in [4usize, 8, 16] {
            let schedules: Vec<Vec<usize>> = (0..n).map(|r| round_partners(r, n)).collect();
            for (a, sched) in schedules.iter().enumerate() {
                for (t, &b) in sched.iter().enumerate() {
                    assert_eq!(
                        schedules[b][t], a,
                        "n={}: instant {} pairs {}->{} but {}->{}",
                        n, t, a, b, b, schedules[b][t]
                    );
                }
            }
        }
    }
}
