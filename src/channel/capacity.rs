//! Capacity figures for reporting achieved rates against the channel limit

/// h(p) in bits; 0 at the endpoints.
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -p * p.log2() - (1.0 - p) * (1.0 - p).log2()
}

/// Capacity of a BSC with the given crossover probability, 1 - h(p).
pub fn bsc_capacity(crossover: f64) -> f64 {
    1.0 - binary_entropy(crossover)
}

/// Per-channel-use capacity of the block channel seen by the coded scheme.
///
/// Each use carries one of 2^k symbols over `block_len` bits, and is wrong
/// with probability `block_error`, spread evenly over the other symbols.
pub fn coded_capacity(block_len: usize, message_len: usize, block_error: f64) -> f64 {
    if block_len == 0 {
        return 0.0;
    }
    let k = message_len as f64;
    let others = (2f64.powi(message_len as i32) - 1.0).max(1.0);
    let symbol_capacity = k - binary_entropy(block_error) - block_error * others.log2();
    (symbol_capacity / block_len as f64).max(0.0)
}
