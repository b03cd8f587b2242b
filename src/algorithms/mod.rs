//! The distributed sorting algorithms.
//!
//! Every algorithm runs the same way on every rank: the root enters through
//! [`Algorithm::main_sort`] with the full dataset, all other ranks through
//! [`Algorithm::sort`] with nothing, and the algorithm's own communication
//! moves the data around. On return the root's dataset holds the fully
//! sorted sequence (and non-root datasets are consumed).

use crate::dal::Ctx;
use crate::dataset::Dataset;

mod bitonic;
mod bucketsort;
mod kmerge;
mod lbkmergesort;
mod lbmergesort;
mod mergesort;
mod nosort;
mod quicksort;
mod samplesort;
mod sequential;

pub trait Algorithm: Sync {
    fn name(&self) -> &'static str;

    /// The cooperative body, identical on every rank. Non-root ranks start
    /// with an uninitialized dataset.
    fn run(&self, ctx: &Ctx, data: &mut Dataset);

    /// Entry point for non-root ranks.
    fn sort(&self, ctx: &Ctx) {
        let mut data = Dataset::new();
        self.run(ctx, &mut data);
        data.destroy();
    }

    /// Entry point for the root rank, which owns the input and ends up
    /// owning the sorted output.
    fn main_sort(&self, ctx: &Ctx, data: &mut Dataset) {
        self.run(ctx, data);
        assert_eq!(
            data.len(),
            ctx.m(),
            "sorted data ({}) is not as big as it was originally",
            data
        );
    }
}

/// Registry names, in the order they are reported by the launcher.
pub const NAMES: &[&str] = &[
    "bitonicsort",
    "bucketsort",
    "kmerge",
    "lbkmergesort",
    "lbmergesort",
    "mergesort",
    "quicksort",
    "samplesort",
    "sequential",
    "nosort",
];

/// Looks an algorithm up by its registry name.
pub fn by_name(name: &str) -> Option<&'static dyn Algorithm> {
    Some(match name {
        "bitonicsort" => &bitonic::BitonicSort,
        "bucketsort" => &bucketsort::BucketSort,
        "kmerge" => &kmerge::KWayMergesort,
        "lbkmergesort" => &lbkmergesort::LoadBalancedKWayMergesort,
        "lbmergesort" => &lbmergesort::LoadBalancedMergesort,
        "mergesort" => &mergesort::Mergesort,
        "quicksort" => &quicksort::Quicksort,
        "samplesort" => &samplesort::SampleSort,
        "sequential" => &sequential::Sequential,
        "nosort" => &nosort::NoSort,
        _ => return None,
    })
}
