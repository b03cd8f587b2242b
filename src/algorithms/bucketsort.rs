//! Parallel bucket sort.
//!
//! Like sample sort but with fixed splitters carving the full signed 32-bit
//! key range into `n` equal slices, so no sampling round is needed. Balanced
//! only when the input keys are uniform over the key space.

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::Dataset;
use crate::sequential::sequential_sort;
use crate::splitters::bucket_index;
use crate::utils::prefix_displs;

/// `n - 1` equidistant splitters over the whole `i32` range.
fn range_splitters(n: usize) -> Vec<i32> {
    let width = (1u64 << 32) / n as u64;
    (1..n)
        .map(|i| (i32::MIN as i64 + (i as u64 * width) as i64) as i32)
        .collect()
}

pub struct BucketSort;

impl Algorithm for BucketSort {
    fn name(&self) -> &'static str {
        "bucketsort"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        let n = ctx.size();

        let scatter_p = ctx.start_phase("scattering");
        let (counts, displs) = ctx.cfg().deal(n);
        ctx.scatterv(data, &counts, &displs, 0);
        ctx.stop_phase(scatter_p);

        // Sorted local data keeps each destination's elements contiguous.
        let local_p = ctx.start_phase("local sorting");
        sequential_sort(ctx, data);
        ctx.stop_phase(local_p);

        let buckets_p = ctx.start_phase("buckets construction");
        let splitters = range_splitters(n);
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

#[cfg(test)]
mod tests {
    use super::range_splitters;
    use crate::splitters::bucket_index;

    #[test]
    fn splitters_cover_the_signed_range() {
        let s = range_splitters(4);
        assert_eq!(s, vec![i32::MIN / 2, 0, i32::MAX / 2 + 1]);
        assert_eq!(bucket_index(i32::MIN, &s), 0);
        assert_eq!(bucket_index(-1, &s), 1);
        assert_eq!(bucket_index(1, &s), 2);
        assert_eq!(bucket_index(i32::MAX, &s), 3);
    }

    #[test]
    fn single_bucket_has_no_splitters() {
        assert!(range_splitters(1).is_empty());
    }
}
