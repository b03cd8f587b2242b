//! Single-rank baseline: the sequential sorter run as an "algorithm".

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::Dataset;
use crate::sequential::sequential_sort;

pub struct Sequential;

impl Algorithm for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        assert_eq!(ctx.size(), 1, "the sequential baseline runs on a single rank");
        let sorting_p = ctx.start_phase("sorting");
        sequential_sort(ctx, data);
        ctx.stop_phase(sorting_p);
    }
}
