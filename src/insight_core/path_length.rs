//! Path length normalisation for isolation trees.

/// `k`-th harmonic number, `H(0) = 0`
pub fn harmonic(k: usize) -> f64 {
    (1..=k).map(|i| 1.0 / i as f64).sum()
}

/// Expected path length to isolate one point among `m` under random partitioning
///
/// `c(m) = 2·H(m-1) - 2·(m-1)/m`, with `c(0) = c(1) = 0`. Used both as the
/// leaf correction for unresolved leaves and as the score normaliser `c(ψ)`.
pub fn average_path_length(m: usize) -> f64 {
    if m <= 1 {
        return 0.0;
    }
    let m_f = m as f64;
    2.0 * harmonic(m - 1) - 2.0 * (m_f - 1.0) / m_f
}

/// Height limit for trees built from `sample_size` points, `⌈log2(ψ)⌉`
pub fn height_limit(sample_size: usize) -> usize {
    if sample_size <= 1 {
        return 0;
    }
    (sample_size as f64).log2().ceil() as usize
}
