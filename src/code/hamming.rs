//! Systematic Hamming code
//!
//! Positions are numbered 1..=n from the first transmitted bit. Powers of
//! two hold parity, every other position holds a message bit in order.
//! Parity bit 2^i covers every position with bit i set, so the syndrome
//! of a single flipped bit is that bit's position. Message lengths that
//! are not of the form 2^r - r - 1 give a shortened code whose syndrome
//! can name positions past the end of the block.

use bitvec::prelude::*;

use super::{BlockCode, CodeError};

/// Smallest r with 2^r >= k + r + 1.
pub fn redundant_bits(message_len: usize) -> usize {
    let mut r = 0;
    while (1usize << r) < message_len + r + 1 {
        r += 1;
    }
    r
}

/// Hamming code for k-bit messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HammingCode {
    message_len: usize,
    redundancy: usize,
}

impl HammingCode {
    /// Code for `message_len`-bit blocks.
    pub fn new(message_len: usize) -> Result<Self, CodeError> {
        if message_len == 0 {
            return Err(CodeError::EmptyMessage);
        }
        Ok(Self {
            message_len,
            redundancy: redundant_bits(message_len),
        })
    }

    /// Number of parity bits (r).
    pub fn redundancy(&self) -> usize {
        self.redundancy
    }

    /// Parity positions are exact powers of two (1-indexed).
    #[inline]
    pub fn is_parity_position(position: usize) -> bool {
        position.is_power_of_two()
    }

    /// Recompute `redundancy` parity checks over `received` and assemble
    /// them into a syndrome. Works on truncated words too: positions
    /// beyond `received.len()` simply do not take part.
    pub fn detect_error(received: &BitSlice, redundancy: usize) -> usize {
        (0..redundancy).fold(0, |syndrome, i| {
            let mask = 1usize << i;
            let parity = received
                .iter()
                .by_vals()
                .enumerate()
                .filter(|(idx, bit)| *bit && (idx + 1) & mask != 0)
                .count()
                % 2
                == 1;
            if parity {
                syndrome | mask
            } else {
                syndrome
            }
        })
    }

    /// Number of error patterns of each weight that produce each syndrome.
    pub fn error_spectrum(&self) -> ErrorSpectrum {
        ErrorSpectrum::for_code(self)
    }
}

impl BlockCode for HammingCode {
    fn message_len(&self) -> usize {
        self.message_len
    }

    fn block_len(&self) -> usize {
        self.message_len + self.redundancy
    }

    fn encode(&self, message: &BitSlice) -> Result<BitVec, CodeError> {
        if message.len() != self.message_len {
            return Err(CodeError::MessageLength {
                expected: self.message_len,
                actual: message.len(),
            });
        }
        let n = self.block_len();
        let mut codeword = bitvec![0; n];
        let mut bits = message.iter().by_vals();
        for position in 1..=n {
            if !Self::is_parity_position(position) {
                let bit = bits.next().unwrap_or(false);
                codeword.set(position - 1, bit);
            }
        }
        // parity slots are still zero, so the check over the whole word
        // equals the check over the message positions it covers
        let checks = Self::detect_error(&codeword, self.redundancy);
        for i in 0..self.redundancy {
            let mask = 1usize << i;
            codeword.set(mask - 1, checks & mask != 0);
        }
        Ok(codeword)
    }

    fn syndrome(&self, received: &BitSlice) -> usize {
        Self::detect_error(received, self.redundancy)
    }

    fn decode(&self, codeword: &BitSlice) -> BitVec {
        codeword
            .iter()
            .by_vals()
            .enumerate()
            .filter(|(idx, _)| !Self::is_parity_position(idx + 1))
            .map(|(_, bit)| bit)
            .collect()
    }
}

/// Weight/syndrome histogram of all error patterns on an n-bit block.
///
/// `count(w, s)` is the number of patterns flipping exactly `w` bits whose
/// syndrome is `s`. The syndrome of a pattern is the XOR of its positions,
/// independent of the codeword sent.
#[derive(Debug, Clone)]
pub struct ErrorSpectrum {
    block_len: usize,
    counts: Vec<Vec<u128>>,
}

impl ErrorSpectrum {
    fn for_code(code: &HammingCode) -> Self {
        let n = code.block_len();
        let syndromes = 1usize << code.redundancy();
        let mut counts = vec![vec![0u128; syndromes]; n + 1];
        counts[0][0] = 1;
        for position in 1..=n {
            let mut next = counts.clone();
            for weight in 0..position {
                for syndrome in 0..syndromes {
                    let c = counts[weight][syndrome];
                    if c != 0 {
                        next[weight + 1][syndrome ^ position] += c;
                    }
                }
            }
            counts = next;
        }
        Self {
            block_len: n,
            counts,
        }
    }

    /// Block length the spectrum was built for.
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Patterns of weight `weight` with syndrome `syndrome`.
    pub fn count(&self, weight: usize, syndrome: usize) -> u128 {
        self.counts
            .get(weight)
            .and_then(|row| row.get(syndrome))
            .copied()
            .unwrap_or(0)
    }

    /// Probability that the decoder accepts a block and gets it wrong.
    pub fn accepted_wrong_probability(&self, crossover: f64) -> f64 {
        self.multi_error_probability(crossover, |syndrome| syndrome <= self.block_len)
    }

    /// Probability that the syndrome points past the end of the block.
    pub fn rejected_probability(&self, crossover: f64) -> f64 {
        self.multi_error_probability(crossover, |syndrome| syndrome > self.block_len)
    }

    // weight 0 and 1 are always decoded correctly
    fn multi_error_probability(&self, crossover: f64, keep: impl Fn(usize) -> bool) -> f64 {
        let n = self.block_len;
        (2..=n)
            .map(|weight| {
                let patterns: u128 = self.counts[weight]
                    .iter()
                    .enumerate()
                    .filter(|(syndrome, _)| keep(*syndrome))
                    .map(|(_, c)| *c)
                    .sum();
                patterns as f64
                    * crossover.powi(weight as i32)
                    * (1.0 - crossover).powi((n - weight) as i32)
            })
            .sum()
    }
}
