//! Thread-backed process group.
//!
//! Every rank runs on its own thread and owns a [`Comm`] endpoint: a full
//! mesh of zero-capacity (rendezvous) channels, one per ordered rank pair.
//! A rendezvous channel makes every send block until the matching receive is
//! posted, which reproduces the blocking message-passing semantics the
//! deadlock-avoidance schedules in the algorithms are written against; a
//! protocol that would deadlock over synchronous MPI deadlocks here too.
//!
//! Payloads travel as blocks of at most `block` elements. Each element
//! transfer is a count header followed by as many blocks as needed, so a
//! single logical message can carry far more elements than one block (the
//! per-block count stays within 32-bit range, mirroring the `int`-count
//! limit of the underlying primitives this layer models).

use std::panic;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

/// Default per-block element count for link transfers.
pub const DEFAULT_BLOCK: usize = 1 << 16;

enum Packet {
    Elems(Vec<i32>),
    Counts(Vec<u64>),
}

/// One rank's endpoint into the cluster mesh. Owned by exactly one thread.
pub struct Comm {
    rank: usize,
    size: usize,
    block: usize,
    toward: Vec<SyncSender<Packet>>,
    from: Vec<Receiver<Packet>>,
}

impl Comm {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Maximum number of elements carried by a single block.
    pub fn block(&self) -> usize {
        self.block
    }

    fn push(&self, dst: usize, packet: Packet) {
        assert_ne!(dst, self.rank, "rank {} sending to itself", self.rank);
        if self.toward[dst].send(packet).is_err() {
            panic!("rank {}: link to rank {} closed", self.rank, dst);
        }
    }

    fn pull(&self, src: usize) -> Packet {
        assert_ne!(src, self.rank, "rank {} receiving from itself", self.rank);
        match self.from[src].recv() {
            Ok(p) => p,
            Err(_) => panic!("rank {}: link from rank {} closed", self.rank, src),
        }
    }

    /// Announces an upcoming element transfer of `count` elements.
    pub fn send_header(&self, dst: usize, count: u64) {
        self.push(dst, Packet::Counts(vec![count]));
    }

    pub fn recv_header(&self, src: usize) -> u64 {
        match self.pull(src) {
            Packet::Counts(c) if c.len() == 1 => c[0],
            _ => panic!("rank {}: expected transfer header from rank {}", self.rank, src),
        }
    }

    /// Sends one block of at most `block` elements.
    pub fn send_block(&self, dst: usize, elems: &[i32]) {
        debug_assert!(elems.len() <= self.block);
        debug_assert!(elems.len() <= i32::MAX as usize);
        self.push(dst, Packet::Elems(elems.to_vec()));
    }

    pub fn recv_block(&self, src: usize) -> Vec<i32> {
        match self.pull(src) {
            Packet::Elems(e) => e,
            _ => panic!("rank {}: expected element block from rank {}", self.rank, src),
        }
    }

    /// Sends a complete slice: header plus chunked blocks.
    pub fn send_elems(&self, dst: usize, elems: &[i32]) {
        self.send_header(dst, elems.len() as u64);
        for chunk in elems.chunks(self.block) {
            self.send_block(dst, chunk);
        }
    }

    /// Receives a complete slice of whatever length the sender announced.
    pub fn recv_elems(&self, src: usize) -> Vec<i32> {
        let total = self.recv_header(src) as usize;
        let mut out = Vec::with_capacity(total);
        while out.len() < total {
            let block = self.recv_block(src);
            out.extend_from_slice(&block);
        }
        assert_eq!(out.len(), total, "rank {}: malformed transfer from {}", self.rank, src);
        out
    }

    /// Sends a small metadata vector in a single packet.
    pub fn send_counts(&self, dst: usize, counts: &[u64]) {
        self.push(dst, Packet::Counts(counts.to_vec()));
    }

    pub fn recv_counts(&self, src: usize) -> Vec<u64> {
        match self.pull(src) {
            Packet::Counts(c) => c,
            _ => panic!("rank {}: expected counts from rank {}", self.rank, src),
        }
    }

    /// Bidirectional element exchange with one partner. The lower rank of the
    /// pair transmits first while the higher rank receives first, so any
    /// schedule that pairs processes consistently is deadlock-free.
    pub fn exchange_elems(&self, partner: usize, elems: &[i32]) -> Vec<i32> {
        if partner == self.rank {
            return elems.to_vec();
        }
        if self.rank < partner {
            self.send_elems(partner, elems);
            self.recv_elems(partner)
        } else {
            let r = self.recv_elems(partner);
            self.send_elems(partner, elems);
            r
        }
    }

    /// Same pairing rule for metadata vectors.
    pub fn exchange_counts(&self, partner: usize, counts: &[u64]) -> Vec<u64> {
        if partner == self.rank {
            return counts.to_vec();
        }
        if self.rank < partner {
            self.send_counts(partner, counts);
            self.recv_counts(partner)
        } else {
            let r = self.recv_counts(partner);
            self.send_counts(partner, counts);
            r
        }
    }

    /// One round of a permutation schedule: send `counts` to `send_to` while
    /// receiving from `recv_from`. Sending first iff our rank is below the
    /// target's breaks every cycle of the permutation: a chain of processes
    /// blocked in their send has strictly increasing ranks, so it is finite
    /// and ends at a process that has already posted its receive.
    pub fn transfer_counts(&self, send_to: usize, counts: &[u64], recv_from: usize) -> Vec<u64> {
        if send_to == self.rank && recv_from == self.rank {
            return counts.to_vec();
        }
        assert!(send_to != self.rank && recv_from != self.rank);
        if self.rank < send_to {
            self.send_counts(send_to, counts);
            self.recv_counts(recv_from)
        } else {
            let r = self.recv_counts(recv_from);
            self.send_counts(send_to, counts);
            r
        }
    }

    /// Whether this rank must transmit before receiving in a permutation
    /// round targeting `send_to` (see [`Comm::transfer_counts`]).
    pub fn sends_first(&self, send_to: usize) -> bool {
        self.rank < send_to
    }
}

/// Builds the channel mesh for `n` ranks.
fn build_mesh(n: usize, block: usize) -> Vec<Comm> {
    assert!(n >= 1);
    assert!(block >= 1);

    let mut toward: Vec<Vec<SyncSender<Packet>>> = (0..n).map(|_| Vec::new()).collect();
    let mut from: Vec<Vec<Receiver<Packet>>> = (0..n).map(|_| Vec::new()).collect();

    for dst in 0..n {
        for src in 0..n {
            let (tx, rx) = sync_channel(0);
            toward[src].push(tx);
            from[dst].push(rx);
        }
    }

    toward
        .into_iter()
        .zip(from)
        .enumerate()
        .map(|(rank, (tx, rx))| Comm {
            rank,
            size: n,
            block,
            toward: tx,
            from: rx,
        })
        .collect()
}

/// A fixed-size process group. Process count is decided by the launcher (the
/// caller), never by the sorting code.
pub struct Cluster {
    n: usize,
    block: usize,
}

impl Cluster {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            block: DEFAULT_BLOCK,
        }
    }

    /// Overrides the per-block element count; small blocks exercise the
    /// chunking paths on small datasets.
    pub fn with_block(mut self, block: usize) -> Self {
        self.block = block;
        self
    }

    /// Runs `f` once per rank, each on its own thread, and returns the
    /// per-rank results in rank order. A panic on any rank tears down the
    /// whole group: peers blocked on a link to the dead rank observe the
    /// closed channel and panic in turn, and the first panic is resumed on
    /// the caller's thread.
    pub fn run<F, R>(&self, f: F) -> Vec<R>
    where
        F: Fn(Comm) -> R + Sync,
        R: Send,
    {
        let comms = build_mesh(self.n, self.block);
        let f = &f;

        thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| scope.spawn(move || f(comm)))
                .collect();

            let mut results = Vec::with_capacity(self.n);
            let mut failure = None;
            for handle in handles {
                match handle.join() {
                    Ok(r) => results.push(r),
                    Err(e) => failure = failure.or(Some(e)),
                }
            }
            if let Some(e) = failure {
                panic::resume_unwind(e);
            }
            results
        })
    }
}
