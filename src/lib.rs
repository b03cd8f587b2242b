//! # mpsort
//!
//! mpsort is a benchmarking framework for distributed sorting: a set of
//! message-passing sorting algorithms (bitonic sort, sample sort, bucket
//! sort, merge trees, load-balanced multiway merges, quicksort) that run
//! over a cluster of cooperating ranks, each owning a partition of the data
//! that may live in memory or spill to disk.
//!
//! The cluster is modelled as one thread per rank connected by a full mesh
//! of rendezvous channels, so the blocking send/receive semantics the
//! algorithms are written against hold for real: a schedule that would
//! deadlock over synchronous message passing deadlocks (and is caught) in
//! the tests.
//!
//! ## Usage
//!
//! ```ignore
//! use mpsort::{algorithms, Cluster, Ctx, Dataset, RunConfig};
//!
//! let cfg = RunConfig::new(1 << 20, 42, "samplesort");
//! let algo = algorithms::by_name(&cfg.algo).unwrap();
//! let sorted = Cluster::new(4).run(|comm| {
//!     let rank = comm.rank();
//!     let ctx = Ctx::new(comm, cfg.clone());
//!     if rank == 0 {
//!         let mut data = Dataset::from_vec(my_input.clone());
//!         algo.main_sort(&ctx, &mut data);
//!         data.take_vec()
//!     } else {
//!         algo.sort(&ctx);
//!         Vec::new()
//!     }
//! });
//! ```

pub mod algorithms;
pub mod cluster;
pub mod config;
pub mod dal;
pub mod dataset;
pub mod io;
pub mod merge;
pub mod phases;
pub mod sequential;
pub mod splitters;
pub mod utils;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

pub use cluster::{Cluster, Comm};
pub use config::RunConfig;
pub use dal::Ctx;
pub use dataset::Dataset;
