//! Communication-only baseline: deals the data out and collects it back
//! without sorting anything, measuring the pure data-movement cost.

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::Dataset;

pub struct NoSort;

impl Algorithm for NoSort {
    fn name(&self) -> &'static str {
        "nosort"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        let n = ctx.size();
        let (counts, displs) = ctx.cfg().deal(n);

        let scatter_p = ctx.start_phase("scattering");
        ctx.scatterv(data, &counts, &displs, 0);
        ctx.stop_phase(scatter_p);

        let gather_p = ctx.start_phase("gathering");
        ctx.gatherv(data, &counts, &displs, 0);
        ctx.stop_phase(gather_p);
    }
}
