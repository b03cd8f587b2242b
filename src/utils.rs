/// Base-2 logarithm of a power of two.
pub fn ilog2_exact(n: u64) -> u32 {
    assert!(n.is_power_of_two(), "{} is not a power of two", n);
    n.trailing_zeros()
}

/// Returns `q` such that `k^q == n`, or `None` if `n` is not an exact power
/// of `k`.
pub fn logk_exact(n: u64, k: u64) -> Option<u32> {
    assert!(k >= 2);
    let mut q = 0;
    let mut acc = 1u64;
    while acc < n {
        acc = acc.checked_mul(k)?;
        q += 1;
    }
    (acc == n).then_some(q)
}

pub fn div_ceil(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

/// Exclusive prefix sum: the displacement of each count in a packed layout.
pub fn prefix_displs(counts: &[u64]) -> Vec<u64> {
    let mut displs = Vec::with_capacity(counts.len());
    let mut at = 0u64;
    for &c in counts {
        displs.push(at);
        at += c;
    }
    displs
}
