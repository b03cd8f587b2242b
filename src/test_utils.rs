//! Shared helpers for the cross-algorithm tests.

use crate::algorithms::by_name;
use crate::cluster::Cluster;
use crate::config::RunConfig;
use crate::dal::Ctx;
use crate::dataset::Dataset;
use nanorand::{Rng, WyRand};
use std::sync::mpsc;
use std::time::Duration;

pub fn gen_elems(len: usize, seed: u64) -> Vec<i32> {
    let mut rng = WyRand::new_seed(seed);
    (0..len).map(|_| rng.generate::<i32>()).collect()
}

/// Runs the full pipeline of `cfg.algo` over `input` on a `n`-rank cluster
/// and returns the root's output.
pub fn run_sort(input: &[i32], n: usize, cfg: &RunConfig) -> Vec<i32> {
    let algo = by_name(&cfg.algo)
        .unwrap_or_else(|| panic!("unknown algorithm \"{}\"", cfg.algo));
    assert_eq!(input.len() as u64, cfg.m);

    let mut out = Cluster::new(n).run(|comm| {
        let rank = comm.rank();
        let ctx = Ctx::new(comm, cfg.clone());
        if rank == 0 {
            let mut data = Dataset::from_vec(input.to_vec());
            algo.main_sort(&ctx, &mut data);
            data.take_vec()
        } else {
            algo.sort(&ctx);
            Vec::new()
        }
    });
    out.swap_remove(0)
}

/// Asserts `output` is a sorted permutation of `input`.
pub fn check_sorted_permutation(input: &[i32], output: &[i32]) {
    assert_eq!(input.len(), output.len());
    assert!(output.windows(2).all(|w| w[0] <= w[1]), "output is not sorted");
    let mut expect = input.to_vec();
    expect.sort_unstable();
    assert_eq!(expect, output, "output is not a permutation of the input");
}

/// Runs `f` on a helper thread and panics if it does not finish within
/// `timeout`; a hung cluster shows up as a test failure instead of a stuck
/// test runner.
pub fn run_with_timeout<F>(timeout: Duration, f: F)
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = std::thread::spawn(move || {
        f();
        let _ = tx.send(());
    });
    match rx.recv_timeout(timeout) {
        Ok(()) => handle.join().unwrap(),
        Err(_) => panic!("cluster did not finish within {:?}, likely deadlocked", timeout),
    }
}
