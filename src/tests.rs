//! Cross-algorithm integration tests: every algorithm, several cluster
//! sizes, in-memory and spilled datasets.

use crate::config::RunConfig;
use crate::test_utils::{check_sorted_permutation, gen_elems, run_sort, run_with_timeout};
use std::time::Duration;

/// Cluster sizes valid for every algorithm but the sequential baseline.
const POWER_OF_TWO_N: &[usize] = &[2, 4, 8];

fn check_algo(algo: &str, n: usize, m: u64, cfg_tweak: impl Fn(RunConfig) -> RunConfig) {
    let input = gen_elems(m as usize, 0xBEEF ^ m ^ n as u64);
    let cfg = cfg_tweak(RunConfig::new(m, 7, algo));
    let output = run_sort(&input, n, &cfg);
    check_sorted_permutation(&input, &output);
}

#[test]
fn bitonicsort_sorts() {
    for &n in POWER_OF_TWO_N {
        // Element count must divide evenly.
        check_algo("bitonicsort", n, 1 << 10, |c| c);
    }
}

#[test]
fn samplesort_sorts() {
    for &n in POWER_OF_TWO_N {
        check_algo("samplesort", n, 1000, |c| c);
    }
    // Works with non-power-of-two rank counts too.
    check_algo("samplesort", 3, 1001, |c| c);
    check_algo("samplesort", 5, 997, |c| c);
}

#[test]
fn bucketsort_sorts() {
    for &n in POWER_OF_TWO_N {
        check_algo("bucketsort", n, 1000, |c| c);
    }
    check_algo("bucketsort", 6, 1234, |c| c);
}

#[test]
fn kmerge_sorts() {
    // Fan-in two over powers of two.
    for &n in POWER_OF_TWO_N {
        check_algo("kmerge", n, 1000, |c| c.with_algo_var([2, 0, 0]));
    }
    // Fan-in three needs a power-of-three rank count.
    check_algo("kmerge", 9, 1000, |c| c.with_algo_var([3, 0, 0]));
}

#[test]
fn lbkmergesort_sorts() {
    for &n in POWER_OF_TWO_N {
        check_algo("lbkmergesort", n, 1000, |c| c);
    }
}

#[test]
fn lbmergesort_sorts() {
    for &n in POWER_OF_TWO_N {
        check_algo("lbmergesort", n, 1000, |c| c);
    }
}

#[test]
fn mergesort_sorts_both_stencils() {
    for variant in [0i64, 1] {
        for &n in POWER_OF_TWO_N {
            check_algo("mergesort", n, 1000, |c| c.with_algo_var([variant, 0, 0]));
        }
    }
}

#[test]
fn quicksort_sorts_both_stencils() {
    for variant in [0i64, 1] {
        for &n in POWER_OF_TWO_N {
            check_algo("quicksort", n, 1000, |c| c.with_algo_var([variant, 0, 0]));
        }
    }
}

#[test]
fn sequential_baseline_sorts() {
    check_algo("sequential", 1, 1000, |c| c);
}

#[test]
fn single_rank_degenerate_runs() {
    for algo in ["bitonicsort", "samplesort", "bucketsort", "kmerge", "lbkmergesort", "lbmergesort", "mergesort", "quicksort"] {
        check_algo(algo, 1, 512, |c| c);
    }
}

#[test]
fn nosort_preserves_the_data() {
    let input = gen_elems(1000, 3);
    let cfg = RunConfig::new(1000, 7, "nosort");
    let output = run_sort(&input, 4, &cfg);
    let mut a = input.clone();
    let mut b = output;
    assert_eq!(a.len(), b.len());
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
}

#[test]
fn algorithms_agree_on_the_same_input() {
    let m = 2048u64;
    let input = gen_elems(m as usize, 99);
    let mut expect = input.clone();
    expect.sort_unstable();

    for algo in ["bitonicsort", "samplesort", "bucketsort", "kmerge", "lbkmergesort", "lbmergesort", "mergesort", "quicksort"] {
        let cfg = RunConfig::new(m, 5, algo);
        let output = run_sort(&input, 4, &cfg);
        assert_eq!(output, expect, "{} disagrees", algo);
    }
}

#[test]
fn duplicates_heavy_input() {
    // Few distinct keys stress splitter ties and bucket boundaries.
    let m = 1500usize;
    let input: Vec<i32> = gen_elems(m, 21).iter().map(|e| e % 7).collect();
    for algo in ["samplesort", "bucketsort", "lbkmergesort", "lbmergesort", "quicksort"] {
        let cfg = RunConfig::new(m as u64, 1, algo);
        let output = run_sort(&input, 4, &cfg);
        check_sorted_permutation(&input, &output);
    }
}

#[test]
fn already_sorted_and_reversed_inputs() {
    let m = 1024usize;
    let sorted: Vec<i32> = (0..m as i32).collect();
    let reversed: Vec<i32> = (0..m as i32).rev().collect();
    for input in [&sorted, &reversed] {
        for algo in ["bitonicsort", "samplesort", "quicksort", "mergesort"] {
            let cfg = RunConfig::new(m as u64, 2, algo);
            let output = run_sort(input, 4, &cfg);
            check_sorted_permutation(input, &output);
        }
    }
}

#[test]
fn spilled_datasets_sort_out_of_core() {
    // A budget of 64 elements forces every share to disk; only the
    // dataset-streaming algorithms support spilled data, the bucketing ones
    // keep their working set in memory.
    let m = 2000u64;
    let input = gen_elems(m as usize, 17);
    for algo in ["kmerge", "mergesort", "quicksort"] {
        let cfg = RunConfig::new(m, 4, algo)
            .with_mem_budget(64)
            .with_buf_len(64);
        let output = run_sort(&input, 4, &cfg);
        check_sorted_permutation(&input, &output);
    }
}

#[test]
fn spilled_sequential_baseline() {
    let m = 5000u64;
    let input = gen_elems(m as usize, 23);
    let cfg = RunConfig::new(m, 4, "sequential")
        .with_mem_budget(100)
        .with_buf_len(128);
    let output = run_sort(&input, 1, &cfg);
    check_sorted_permutation(&input, &output);
}

#[test]
fn empty_and_tiny_inputs() {
    for m in [0u64, 1, 2, 5] {
        for algo in ["samplesort", "bucketsort", "quicksort", "mergesort", "lbmergesort", "lbkmergesort"] {
            let input = gen_elems(m as usize, m);
            let cfg = RunConfig::new(m, 9, algo);
            let output = run_sort(&input, 2, &cfg);
            check_sorted_permutation(&input, &output);
        }
    }
}

#[test]
fn wide_cluster_does_not_deadlock() {
    // All-to-all heavy algorithms at n = 16 under a short timeout; a
    // scheduling bug would hang instead of failing.
    run_with_timeout(Duration::from_secs(60), || {
        let m = 4096u64;
        let input = gen_elems(m as usize, 31);
        for algo in ["samplesort", "lbkmergesort", "lbmergesort", "bitonicsort"] {
            let cfg = RunConfig::new(m, 13, algo);
            let output = run_sort(&input, 16, &cfg);
            check_sorted_permutation(&input, &output);
        }
    });
}

#[test]
fn uneven_shares_across_ranks() {
    // m chosen so every rank count leaves a remainder.
    for &n in &[2usize, 4, 8] {
        let m = (n * 100 + n - 1) as u64;
        let input = gen_elems(m as usize, n as u64);
        for algo in ["samplesort", "bucketsort", "kmerge", "mergesort", "quicksort", "lbmergesort", "lbkmergesort"] {
            let cfg = RunConfig::new(m, 3, algo);
            let output = run_sort(&input, n, &cfg);
            check_sorted_permutation(&input, &output);
        }
    }
}

#[test]
fn phase_reports_cover_the_pipeline() {
    use crate::algorithms::by_name;
    use crate::cluster::Cluster;
    use crate::dal::Ctx;
    use crate::dataset::Dataset;

    let m = 256u64;
    let input = gen_elems(m as usize, 1);
    let cfg = RunConfig::new(m, 1, "samplesort");
    let reports = Cluster::new(2).run(|comm| {
        let rank = comm.rank();
        let ctx = Ctx::new(comm, cfg.clone());
        let algo = by_name("samplesort").unwrap();
        if rank == 0 {
            let mut data = Dataset::from_vec(input.clone());
            algo.main_sort(&ctx, &mut data);
        } else {
            algo.sort(&ctx);
        }
        ctx.phase_report()
    });
    for report in reports {
        let names: Vec<&str> = report.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["scattering", "local sorting", "sampling", "buckets construction", "gathering"]
        );
    }
}
