//! Single-rank sorting over any dataset medium.

use crate::dal::Ctx;
use crate::dataset::Dataset;
use crate::merge::file_kmerge;
use crate::utils::div_ceil;

/// Sorts `data` in place. Memory-resident datasets are sorted directly;
/// disk-resident ones go through a run-formation pass followed by a k-way
/// merge, using at most `cfg.buf_len` elements of memory at a time.
pub fn sequential_sort(ctx: &Ctx, data: &mut Dataset) {
    match data {
        Dataset::Mem(v) => v.sort_unstable(),
        Dataset::Disk(_) => file_sort(ctx, data),
        Dataset::Uninit => panic!("cannot sort data ({})", data),
    }
}

/// External sort: reads runs of up to `run_size` elements, sorts each in
/// memory, spills them, then k-way merges the runs back into `data`.
fn file_sort(ctx: &Ctx, data: &mut Dataset) {
    let size = data.len();
    let run_size = ctx.cfg().buf_len as u64;
    let k = div_ceil(size, run_size);

    if k <= 1 {
        // The whole dataset fits in one run.
        let mut v = vec![0i32; size as usize];
        let got = data.read_at(0, &mut v);
        assert_eq!(got, size);
        v.sort_unstable();
        data.write_at(0, &v);
        return;
    }
    assert!(
        (k as usize) + 1 <= ctx.cfg().buf_len,
        "dataset of {} elements needs {} runs, beyond what a {}-element buffer can merge",
        size,
        k,
        ctx.cfg().buf_len
    );

    let mut runs = Vec::with_capacity(k as usize);
    let mut buf = vec![0i32; run_size as usize];
    let mut off = 0u64;
    while off < size {
        let want = (size - off).min(run_size) as usize;
        let got = data.read_at(off, &mut buf[..want]);
        assert_eq!(got as usize, want);
        buf[..want].sort_unstable();

        // Runs spill to disk unconditionally; they exist only for the merge.
        let mut run = Dataset::new();
        run.alloc(want as u64, 0);
        run.write_at(0, &buf[..want]);
        runs.push(run);
        off += want as u64;
    }

    file_kmerge(&mut runs, data, ctx.cfg().buf_len);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Cluster;
    use crate::config::RunConfig;
    use crate::dal::Ctx;

    fn on_single_rank(cfg: RunConfig, f: impl Fn(&Ctx) + Sync) {
        Cluster::new(1).run(|comm| {
            let ctx = Ctx::new(comm, cfg.clone());
            f(&ctx);
        });
    }

    #[test]
    fn sorts_in_memory() {
        let cfg = RunConfig::new(6, 0, "sequential");
        on_single_rank(cfg, |ctx| {
            let mut data = Dataset::from_vec(vec![5, 1, 4, 1, 3, 2]);
            sequential_sort(ctx, &mut data);
            assert_eq!(data.as_slice(), &[1, 1, 2, 3, 4, 5]);
        });
    }

    #[test]
    fn sorts_on_disk_with_many_runs() {
        // 100 elements with 16-element runs: 7 runs, uneven tail.
        let cfg = RunConfig::new(100, 0, "sequential")
            .with_mem_budget(0)
            .with_buf_len(16);
        on_single_rank(cfg, |ctx| {
            let mut v: Vec<i32> = (0..100).rev().collect();
            v.swap(3, 77);
            let mut data = Dataset::new();
            data.alloc(100, 0);
            data.write_at(0, &v);

            sequential_sort(ctx, &mut data);
            assert_eq!(data.take_vec(), (0..100).collect::<Vec<i32>>());
        });
    }

    #[test]
    fn single_run_disk_sort() {
        let cfg = RunConfig::new(8, 0, "sequential").with_buf_len(64);
        on_single_rank(cfg, |ctx| {
            let mut data = Dataset::new();
            data.alloc(8, 0);
            data.write_at(0, &[8, 6, 7, 5, 3, 0, 9, 1]);
            sequential_sort(ctx, &mut data);
            assert_eq!(data.take_vec(), vec![0, 1, 3, 5, 6, 7, 8, 9]);
        });
    }
}
