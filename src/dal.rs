//! Data abstraction layer: medium-agnostic point-to-point and collective
//! operations over [`Dataset`]s.
//!
//! Every operation streams disk-resident data through a bounded staging
//! buffer, so a transfer never materializes more than `buf_len` elements in
//! memory regardless of dataset size. Memory-resident data is sent directly
//! from its slice.
//!
//! Pairwise operations order their legs by rank (lower rank transmits first)
//! and permutation rounds follow the same rule, which keeps every schedule
//! built on top of this layer deadlock-free over blocking transports.

use crate::cluster::Comm;
use crate::config::RunConfig;
use crate::dataset::{copy_range, Dataset};
use crate::phases::{PhaseHandle, PhaseTimer};
use std::cell::RefCell;
use std::time::Duration;

/// Per-rank execution context: the communicator endpoint, the run
/// configuration, a lazily sized staging buffer for out-of-core transfers,
/// and the phase timer.
pub struct Ctx {
    comm: Comm,
    cfg: RunConfig,
    staging: RefCell<Vec<i32>>,
    phases: RefCell<PhaseTimer>,
}

impl Ctx {
    pub fn new(comm: Comm, cfg: RunConfig) -> Self {
        Self {
            comm,
            cfg,
            staging: RefCell::new(Vec::new()),
            phases: RefCell::new(PhaseTimer::new()),
        }
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn size(&self) -> usize {
        self.comm.size()
    }

    pub fn cfg(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn comm(&self) -> &Comm {
        &self.comm
    }

    /// Total elements across the cluster.
    pub fn m(&self) -> u64 {
        self.cfg.m
    }

    /// This rank's share of an even deal.
    pub fn local_m(&self) -> u64 {
        self.cfg.local_m(self.rank(), self.size())
    }

    /// Allocates a dataset of `size` elements under the configured memory
    /// budget.
    pub fn alloc(&self, size: u64) -> Dataset {
        let mut d = Dataset::new();
        d.alloc(size, self.cfg.mem_budget);
        d
    }

    pub fn start_phase(&self, name: &str) -> PhaseHandle {
        self.phases.borrow_mut().start(name)
    }

    pub fn stop_phase(&self, handle: PhaseHandle) {
        self.phases.borrow_mut().stop(handle);
    }

    pub fn resume_phase(&self, handle: PhaseHandle) {
        self.phases.borrow_mut().resume(handle);
    }

    pub fn phase_report(&self) -> Vec<(String, Duration)> {
        self.phases.borrow().report()
    }

    /// Staging buffer sized to one transfer block, bounded by `buf_len`.
    fn with_staging<R>(&self, f: impl FnOnce(&mut [i32]) -> R) -> R {
        let want = self.comm.block().min(self.cfg.buf_len).max(1);
        let mut staging = self.staging.borrow_mut();
        if staging.len() < want {
            staging.resize(want, 0);
        }
        f(&mut staging[..want])
    }

    // ---- point to point ----

    /// Sends `count` elements of `data` starting at `offset`, as a header
    /// followed by blocks.
    fn send_range(&self, data: &mut Dataset, offset: u64, count: u64, dst: usize) {
        self.comm.send_header(dst, count);
        match data {
            Dataset::Mem(v) => {
                let s = &v[offset as usize..(offset + count) as usize];
                for chunk in s.chunks(self.comm.block()) {
                    self.comm.send_block(dst, chunk);
                }
            }
            _ => self.with_staging(|staging| {
                let mut sent = 0u64;
                while sent < count {
                    let want = ((count - sent) as usize).min(staging.len());
                    let got = data.read_at(offset + sent, &mut staging[..want]);
                    assert_eq!(got as usize, want, "cannot read data ({})", data);
                    self.comm.send_block(dst, &staging[..want]);
                    sent += want as u64;
                }
            }),
        }
    }

    /// Receives `count` elements into `data` at `offset`, block by block.
    fn recv_body(&self, data: &mut Dataset, offset: u64, count: u64, src: usize) {
        let mut recvd = 0u64;
        while recvd < count {
            let block = self.comm.recv_block(src);
            data.write_at(offset + recvd, &block);
            recvd += block.len() as u64;
        }
        assert_eq!(recvd, count, "rank {}: malformed transfer from {}", self.rank(), src);
    }

    /// Sends the whole dataset to `dst`.
    pub fn send(&self, data: &mut Dataset, dst: usize) {
        self.send_range(data, 0, data.len(), dst);
    }

    /// Receives exactly `size` elements from `src` into a fresh dataset.
    pub fn recv(&self, size: u64, src: usize) -> Dataset {
        let count = self.comm.recv_header(src);
        assert_eq!(count, size, "rank {}: expected {} elements from {}", self.rank(), size, src);
        let mut data = self.alloc(size);
        self.recv_body(&mut data, 0, count, src);
        data
    }

    /// Receives a dataset of whatever size the sender announced.
    pub fn recv_unknown(&self, src: usize) -> Dataset {
        let count = self.comm.recv_header(src);
        let mut data = self.alloc(count);
        self.recv_body(&mut data, 0, count, src);
        data
    }

    /// Receives a dataset of unknown size and appends it to `data`, growing
    /// it in place. Returns the number of appended elements.
    pub fn recv_append(&self, data: &mut Dataset, src: usize) -> u64 {
        let count = self.comm.recv_header(src);
        let old = data.len();
        if data.is_uninit() {
            data.alloc(count, self.cfg.mem_budget);
        } else {
            data.realloc(old + count);
        }
        self.recv_body(data, old, count, src);
        count
    }

    /// Simultaneous exchange with `partner`: sends `scount` elements of
    /// `sdata` starting at `sdispl` while receiving into `rdata` at `rdispl`,
    /// growing `rdata` as needed. Returns the number of received elements.
    /// The lower rank of the pair transmits first.
    pub fn sendrecv(
        &self,
        sdata: &mut Dataset,
        scount: u64,
        sdispl: u64,
        rdata: &mut Dataset,
        rdispl: u64,
        partner: usize,
    ) -> u64 {
        assert_ne!(partner, self.rank());
        let recv_leg = |rdata: &mut Dataset| {
            let count = self.comm.recv_header(partner);
            if rdata.is_uninit() {
                rdata.alloc(rdispl + count, self.cfg.mem_budget);
            } else if rdata.len() < rdispl + count {
                rdata.realloc(rdispl + count);
            }
            self.recv_body(rdata, rdispl, count, partner);
            count
        };
        if self.comm.sends_first(partner) {
            self.send_range(sdata, sdispl, scount, partner);
            recv_leg(rdata)
        } else {
            let count = recv_leg(rdata);
            self.send_range(sdata, sdispl, scount, partner);
            count
        }
    }

    // ---- collectives ----

    /// Deals `data` out evenly: each rank ends up owning `size` elements.
    /// The root's `data` must hold exactly `size * n` elements; every other
    /// rank passes an uninitialized dataset.
    pub fn scatter(&self, data: &mut Dataset, size: u64, root: usize) {
        let n = self.size() as u64;
        let counts = vec![size; self.size()];
        let displs: Vec<u64> = (0..n).map(|i| i * size).collect();
        self.scatterv(data, &counts, &displs, root);
    }

    /// Deals `data` out by explicit per-rank counts and displacements.
    /// `counts` and `displs` are only read on the root; receivers learn
    /// their share size from the transfer itself.
    pub fn scatterv(&self, data: &mut Dataset, counts: &[u64], displs: &[u64], root: usize) {
        if self.rank() == root {
            let total: u64 = counts.iter().sum();
            assert!(
                data.len() >= total,
                "cannot scatter {} elements out of data ({})",
                total,
                data
            );
            for dst in 0..self.size() {
                if dst != root {
                    self.send_range(data, displs[dst], counts[dst], dst);
                }
            }
            let mut own = self.alloc(counts[root]);
            let copied = copy_range(data, displs[root], &mut own, 0, counts[root], self.cfg.buf_len);
            assert_eq!(copied, counts[root]);
            *data = own;
        } else {
            assert!(data.is_uninit(), "scattering into a live dataset ({})", data);
            *data = self.recv_unknown(root);
        }
    }

    /// Collects equal shares of `size` elements onto the root.
    pub fn gather(&self, data: &mut Dataset, size: u64, root: usize) {
        let n = self.size() as u64;
        let counts = vec![size; self.size()];
        let displs: Vec<u64> = (0..n).map(|i| i * size).collect();
        self.gatherv(data, &counts, &displs, root);
    }

    /// Collects per-rank shares onto the root, placed at the given
    /// displacements. `counts` and `displs` are only read on the root; every
    /// other rank sends its whole dataset and ends up with it consumed.
    pub fn gatherv(&self, data: &mut Dataset, counts: &[u64], displs: &[u64], root: usize) {
        if self.rank() == root {
            let total: u64 = counts.iter().sum();
            let mut whole = self.alloc(total);
            assert_eq!(data.len(), counts[root], "cannot gather own share of data ({})", data);
            let copied = copy_range(data, 0, &mut whole, displs[root], counts[root], self.cfg.buf_len);
            assert_eq!(copied, counts[root]);
            for src in 0..self.size() {
                if src != root {
                    let count = self.comm.recv_header(src);
                    assert_eq!(count, counts[src], "rank {} sent a share of unexpected size", src);
                    self.recv_body(&mut whole, displs[src], count, src);
                }
            }
            *data = whole;
        } else {
            self.send_range(data, 0, data.len(), root);
            data.destroy();
        }
    }

    /// Exchanges equal `size`-element shares with every rank.
    pub fn alltoall(&self, data: &mut Dataset, size: u64) {
        let n = self.size() as u64;
        let counts = vec![size; self.size()];
        let displs: Vec<u64> = (0..n).map(|i| i * size).collect();
        self.alltoallv(data, &counts, &displs, &counts, &displs);
    }

    /// Personalized all-to-all: sends `scounts[i]` elements at `sdispls[i]`
    /// to each rank `i` and receives `rcounts[i]` at `rdispls[i]`, replacing
    /// `data` with the received layout.
    ///
    /// Runs `n` rotation rounds; in round `r` every rank sends to
    /// `(rank + r) % n` while receiving from `(rank - r) % n`.
    pub fn alltoallv(
        &self,
        data: &mut Dataset,
        scounts: &[u64],
        sdispls: &[u64],
        rcounts: &[u64],
        rdispls: &[u64],
    ) {
        let n = self.size();
        let needed = (0..n).map(|i| rdispls[i] + rcounts[i]).max().unwrap_or(0);
        let mut recv = self.alloc(needed);

        for r in 0..n {
            let dst = (self.rank() + r) % n;
            let src = (self.rank() + n - r) % n;
            if r == 0 {
                let copied = copy_range(
                    data,
                    sdispls[dst],
                    &mut recv,
                    rdispls[src],
                    scounts[dst],
                    self.cfg.buf_len,
                );
                assert_eq!(copied, scounts[dst]);
            } else if self.comm.sends_first(dst) {
                self.send_range(data, sdispls[dst], scounts[dst], dst);
                let count = self.comm.recv_header(src);
                assert_eq!(count, rcounts[src]);
                self.recv_body(&mut recv, rdispls[src], count, src);
            } else {
                let count = self.comm.recv_header(src);
                assert_eq!(count, rcounts[src]);
                self.recv_body(&mut recv, rdispls[src], count, src);
                self.send_range(data, sdispls[dst], scounts[dst], dst);
            }
        }
        *data = recv;
    }

    /// Replicates the root's `size`-element dataset onto every rank.
    pub fn bcast(&self, data: &mut Dataset, size: u64, root: usize) {
        if self.rank() == root {
            assert_eq!(data.len(), size, "cannot broadcast data ({})", data);
            for dst in 0..self.size() {
                if dst != root {
                    self.send_range(data, 0, size, dst);
                }
            }
        } else {
            assert!(data.is_uninit(), "broadcasting into a live dataset ({})", data);
            *data = self.recv(size, root);
        }
    }

    // ---- small typed collectives for metadata ----

    /// Gathers per-rank slices onto the root, concatenated in rank order.
    /// Non-roots get an empty vector back.
    pub fn gather_vec(&self, local: &[i32], root: usize) -> Vec<i32> {
        if self.rank() == root {
            let mut out = Vec::new();
            for src in 0..self.size() {
                if src == root {
                    out.extend_from_slice(local);
                } else {
                    out.extend(self.comm.recv_elems(src));
                }
            }
            out
        } else {
            self.comm.send_elems(root, local);
            Vec::new()
        }
    }

    /// Replicates the root's vector onto every rank.
    pub fn bcast_vec(&self, v: Vec<i32>, root: usize) -> Vec<i32> {
        if self.rank() == root {
            for dst in 0..self.size() {
                if dst != root {
                    self.comm.send_elems(dst, &v);
                }
            }
            v
        } else {
            self.comm.recv_elems(root)
        }
    }

    /// Gathers per-rank count vectors onto the root, concatenated in rank
    /// order.
    pub fn gather_counts(&self, local: &[u64], root: usize) -> Vec<u64> {
        if self.rank() == root {
            let mut out = Vec::new();
            for src in 0..self.size() {
                if src == root {
                    out.extend_from_slice(local);
                } else {
                    out.extend(self.comm.recv_counts(src));
                }
            }
            out
        } else {
            self.comm.send_counts(root, local);
            Vec::new()
        }
    }

    /// All-to-all over single counts: entry `i` of the input goes to rank
    /// `i`; entry `i` of the output came from rank `i`.
    pub fn alltoall_counts(&self, counts: &[u64]) -> Vec<u64> {
        let n = self.size();
        assert_eq!(counts.len(), n);
        let mut out = vec![0u64; n];
        for r in 0..n {
            let dst = (self.rank() + r) % n;
            let src = (self.rank() + n - r) % n;
            let got = self.comm.transfer_counts(dst, &counts[dst..=dst], src);
            out[src] = got[0];
        }
        out
    }
}
