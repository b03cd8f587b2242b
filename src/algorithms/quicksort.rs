//! Parallel quicksort.
//!
//! Rank 0 starts with everything; at each step every active rank splits its
//! data around a random pivot and ships the upper partition to a rank that
//! activates next step. After `log2(n)` steps each rank sorts its partition
//! sequentially and rank 0 collects them in token order, so no final merge
//! is needed. Partition sizes depend on the pivots, hence the unknown-size
//! transfers throughout.
//!
//! Two stencils are selectable: variant 0 spreads partitions across the rank
//! space (token order equals rank order), variant 1 packs active ranks low
//! (token order is bit-reversed, recovered by `nth_token_owner`).

use super::Algorithm;
use crate::dal::Ctx;
use crate::dataset::Dataset;
use crate::sequential::sequential_sort;
use crate::utils::ilog2_exact;
use nanorand::{Rng, WyRand};

const PARAM_VARIANT: usize = 0;

fn active_procs(step: u32) -> usize {
    1 << step
}

fn from_who(variant: i64, rank: usize, n: usize, step: u32) -> usize {
    match variant {
        1 => rank - active_procs(step),
        _ => rank - n / active_procs(step + 1),
    }
}

fn to_who(variant: i64, rank: usize, n: usize, step: u32) -> usize {
    match variant {
        1 => rank + active_procs(step),
        _ => rank + n / active_procs(step + 1),
    }
}

fn do_i_send(variant: i64, rank: usize, n: usize, step: u32) -> bool {
    match variant {
        1 => rank < active_procs(step),
        _ => rank % (n / active_procs(step)) == 0,
    }
}

fn do_i_receive(variant: i64, rank: usize, n: usize, step: u32) -> bool {
    match variant {
        1 => !do_i_send(variant, rank, n, step) && rank < 2 * active_procs(step),
        _ => !do_i_send(variant, rank, n, step) && rank % (n / active_procs(step + 1)) == 0,
    }
}

/// Rank owning the `token`-th slice of the global order after scattering.
fn nth_token_owner(variant: i64, mut token: usize, n: usize) -> usize {
    match variant {
        1 => {
            let mut owner = 0;
            let mut nodes = n;
            for step in 0..ilog2_exact(n as u64) {
                if token >= nodes / 2 {
                    owner += active_procs(step);
                    token -= nodes / 2;
                }
                nodes /= 2;
            }
            owner
        }
        _ => token,
    }
}

/// Splits `data` into the elements at most the pivot and those above it,
/// staging through bounded buffers so any medium works. Consumes `data`.
fn partition(ctx: &Ctx, data: &mut Dataset, rng: &mut WyRand) -> (Dataset, Dataset) {
    let size = data.len();
    if size == 0 {
        data.destroy();
        return (Dataset::from_vec(Vec::new()), Dataset::from_vec(Vec::new()));
    }

    let pivot = {
        let mut one = [0i32; 1];
        let idx = rng.generate_range(0..size);
        let got = data.read_at(idx, &mut one);
        assert_eq!(got, 1, "cannot read a pivot out of data ({})", data);
        one[0]
    };

    let mut smaller = ctx.alloc(size);
    let mut bigger = ctx.alloc(size);
    let mut small_at = 0u64;
    let mut big_at = 0u64;

    let buf_len = ctx.cfg().buf_len;
    let mut buf = vec![0i32; buf_len.min(size as usize)];
    let mut small_buf = Vec::with_capacity(buf.len());
    let mut big_buf = Vec::with_capacity(buf.len());

    let mut off = 0u64;
    while off < size {
        let got = data.read_at(off, &mut buf) as usize;
        small_buf.clear();
        big_buf.clear();
        for &e in &buf[..got] {
            if e > pivot {
                big_buf.push(e);
            } else {
                small_buf.push(e);
            }
        }
        smaller.write_at(small_at, &small_buf);
        small_at += small_buf.len() as u64;
        bigger.write_at(big_at, &big_buf);
        big_at += big_buf.len() as u64;
        off += got as u64;
    }

    smaller.realloc(small_at);
    bigger.realloc(big_at);
    data.destroy();
    (smaller, bigger)
}

pub struct Quicksort;

impl Algorithm for Quicksort {
    fn name(&self) -> &'static str {
        "quicksort"
    }

    fn run(&self, ctx: &Ctx, data: &mut Dataset) {
        let n = ctx.size();
        let rank = ctx.rank();
        let variant = ctx.cfg().algo_var[PARAM_VARIANT];
        assert!(n.is_power_of_two(), "quicksort needs a power-of-two rank count, got {}", n);
        let mut rng = WyRand::new_seed(ctx.cfg().seed ^ rank as u64);

        let computation_p = ctx.start_phase("computation");
        ctx.stop_phase(computation_p);

        let sorting_p = ctx.start_phase("sorting");
        for step in 0..ilog2_exact(n as u64) {
            if do_i_send(variant, rank, n, step) {
                ctx.resume_phase(computation_p);
                let (smaller, mut bigger) = partition(ctx, data, &mut rng);
                ctx.stop_phase(computation_p);

                ctx.send(&mut bigger, to_who(variant, rank, n, step));
                bigger.destroy();
                *data = smaller;
            }
            if do_i_receive(variant, rank, n, step) {
                assert!(data.is_uninit());
                *data = ctx.recv_unknown(from_who(variant, rank, n, step));
            }
        }

        ctx.resume_phase(computation_p);
        let seq_p = ctx.start_phase("sequential sort");
        sequential_sort(ctx, data);
        ctx.stop_phase(seq_p);
        ctx.stop_phase(computation_p);
        ctx.stop_phase(sorting_p);

        if rank == 0 {
            for token in 1..n {
                ctx.recv_append(data, nth_token_owner(variant, token, n));
            }
        } else {
            ctx.send(data, 0);
            data.destroy();
        }
    }
}
