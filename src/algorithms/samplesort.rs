//! Parallel sample sort.
//!
//! Splitters sampled from every rank's sorted partition carve the key space
//! into `n` buckets; a personalized all-to-all routes each element to its
//! bucket owner, which sorts it locally. Sampling bounds the final bucket
//! size by roughly twice the even share.

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::Dataset;
use crate::sequential::sequential_sort;
use crate::splitters::{bucket_index, select_global_splitters};
use crate::utils::prefix_displs;

pub struct SampleSort;

impl Algorithm for SampleSort {
    fn name(&self) -> &'static str {
        "samplesort"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        let n = ctx.size();

        let scatter_p = ctx.start_phase("scattering");
        let (counts, displs) = ctx.cfg().deal(n);
        ctx.scatterv(data, &counts, &displs, 0);
        ctx.stop_phase(scatter_p);

        // Local data must end up sorted before bucketing so the outgoing
        // elements for each destination are contiguous.
        let local_p = ctx.start_phase("local sorting");
        sequential_sort(ctx, data);
        ctx.stop_phase(local_p);

        let sampling_p = ctx.start_phase("sampling");
        let splitters = select_global_splitters(ctx, data.as_slice());
        ctx.stop_phase(sampling_p);

        let buckets_p = ctx.start_phase("buckets construction");
        let mut scounts = vec![0u64; n];
        for &e in data.as_slice() {
            scounts[bucket_index(e, &splitters)] += 1;
        }
        let sdispls = prefix_displs(&scounts);
        let rcounts = ctx.alltoall_counts(&scounts);
        let rdispls = prefix_displs(&rcounts);
        ctx.alltoallv(data, &scounts, &sdispls, &rcounts, &rdispls);

        sequential_sort(ctx, data);
        ctx.stop_phase(buckets_p);

        let gather_p = ctx.start_phase("gathering");
        let bucket_len = data.len();
        let all_lens = ctx.gather_counts(&[bucket_len], 0);
        let gdispls = prefix_displs(&all_lens);
        ctx.gatherv(data, &all_lens, &gdispls, 0);
        ctx.stop_phase(gather_p);
    }
}
