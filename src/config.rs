/// Default threshold, in elements, above which a dataset allocation goes to
/// disk instead of primary memory.
pub const DEFAULT_MEM_BUDGET: u64 = 1 << 26;

/// Default length, in elements, of the bounded staging buffer used to chunk
/// disk-backed transfers and to size out-of-core sort runs.
pub const DEFAULT_BUF_LEN: usize = 1 << 20;

/// Per-run configuration shared by every rank of a cluster.
///
/// The process topology (rank, size) is not part of the configuration; it is
/// derived live from the communicator, mirroring how a job launcher rather
/// than the program controls the process count.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Total number of elements to sort across the whole cluster.
    pub m: u64,
    /// Seed for input generation and for any randomized decision inside the
    /// algorithms (pivot picks, splitter fallback). Always explicit, never
    /// ambient state.
    pub seed: u64,
    /// Registry name of the algorithm to run.
    pub algo: String,
    /// Up to three algorithm-specific variables (e.g. the merge fan-in for
    /// the k-way merge tree, or a partner-mapping variant selector).
    pub algo_var: [i64; 3],
    /// Elements a single dataset may hold in memory before spilling to disk.
    pub mem_budget: u64,
    /// Bounded staging/run buffer length in elements.
    pub buf_len: usize,
    pub verbose: bool,
}

impl RunConfig {
    pub fn new(m: u64, seed: u64, algo: &str) -> Self {
        Self {
            m,
            seed,
            algo: algo.to_string(),
            algo_var: [0; 3],
            mem_budget: DEFAULT_MEM_BUDGET,
            buf_len: DEFAULT_BUF_LEN,
            verbose: false,
        }
    }

    pub fn with_algo_var(mut self, algo_var: [i64; 3]) -> Self {
        self.algo_var = algo_var;
        self
    }

    pub fn with_mem_budget(mut self, mem_budget: u64) -> Self {
        self.mem_budget = mem_budget;
        self
    }

    pub fn with_buf_len(mut self, buf_len: usize) -> Self {
        self.buf_len = buf_len;
        self
    }

    /// Number of elements assigned to `rank` out of `n` when the input is
    /// dealt out evenly: the first `m % n` ranks get one extra element.
    pub fn local_m(&self, rank: usize, n: usize) -> u64 {
        let n = n as u64;
        self.m / n + u64::from((rank as u64) < self.m % n)
    }

    /// Largest share any rank can be assigned.
    pub fn max_local_m(&self, n: usize) -> u64 {
        let n = n as u64;
        self.m / n + u64::from(self.m % n > 0)
    }

    /// Per-rank counts and displacements for an even deal of `m` elements.
    pub fn deal(&self, n: usize) -> (Vec<u64>, Vec<u64>) {
        let mut counts = Vec::with_capacity(n);
        let mut displs = Vec::with_capacity(n);
        let mut at = 0u64;
        for rank in 0..n {
            displs.push(at);
            let c = self.local_m(rank, n);
            counts.push(c);
            at += c;
        }
        (counts, displs)
    }
}
