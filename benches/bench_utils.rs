use criterion::{black_box, BatchSize, BenchmarkId, Criterion, Throughput};
use mpsort::algorithms::by_name;
use mpsort::{Cluster, Ctx, Dataset, RunConfig};
use nanorand::{Rng, WyRand};
use std::time::Duration;

pub fn gen_input(len: usize, seed: u64) -> Vec<i32> {
    let mut rng = WyRand::new_seed(seed);
    (0..len).map(|_| rng.generate::<i32>()).collect()
}

/// Runs the full pipeline of one algorithm over a fresh cluster and returns
/// the root's output length, so the work cannot be optimized away.
pub fn run_cluster(algo_name: &str, input: &[i32], n: usize, cfg: &RunConfig) -> usize {
    let algo = by_name(algo_name).unwrap();
    let out = Cluster::new(n).run(|comm| {
        let rank = comm.rank();
        let ctx = Ctx::new(comm, cfg.clone());
        if rank == 0 {
            let mut data = Dataset::from_vec(input.to_vec());
            algo.main_sort(&ctx, &mut data);
            data.len() as usize
        } else {
            algo.sort(&ctx);
            0
        }
    });
    out[0]
}

pub fn bench_algorithms(
    c: &mut Criterion,
    group_name: &str,
    algos: &[&str],
    m: usize,
    n: usize,
) {
    let input = gen_input(m, 0xC0FFEE);
    let mut group = c.benchmark_group(group_name);
    group
        .sample_size(10)
        .warm_up_time(Duration::from_secs(1))
        .throughput(Throughput::Elements(m as u64));

    for &algo in algos {
        let cfg = RunConfig::new(m as u64, 7, algo);
        group.bench_with_input(BenchmarkId::new(algo, m), &input, |b, input| {
            b.iter_batched(
                || input.clone(),
                |input| black_box(run_cluster(algo, &input, n, &cfg)),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}
