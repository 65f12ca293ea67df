//! Seeded binary symmetric channel and a scripted stand-in
//!
//! All randomness comes from the injected RNG (ChaCha8 by default), so a
//! seed fully determines the flips applied to every word.

use std::collections::VecDeque;

use bitvec::prelude::*;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{Channel, ChannelError};

/// Which positions of a word are exposed to bit flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorModel {
    /// Every bit flips independently with the crossover probability.
    #[default]
    Independent,
    /// Exactly this many distinct positions are drawn uniformly per word,
    /// and each drawn position flips with the crossover probability.
    Positions(usize),
}

/// Memoryless BSC with an injectable random source.
#[derive(Debug, Clone)]
pub struct BinarySymmetricChannel<R = ChaCha8Rng> {
    crossover: f64,
    model: ErrorModel,
    rng: R,
    bits_sent: u64,
    bits_flipped: u64,
}

impl BinarySymmetricChannel<ChaCha8Rng> {
    /// Channel driven by `ChaCha8Rng::seed_from_u64(seed)`.
    pub fn seeded(crossover: f64, seed: u64) -> Result<Self, ChannelError> {
        Self::new(crossover, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> BinarySymmetricChannel<R> {
    /// Channel with an explicit random source.
    pub fn new(crossover: f64, rng: R) -> Result<Self, ChannelError> {
        if !(0.0..=1.0).contains(&crossover) {
            return Err(ChannelError::InvalidCrossover(crossover));
        }
        Ok(Self {
            crossover,
            model: ErrorModel::Independent,
            rng,
            bits_sent: 0,
            bits_flipped: 0,
        })
    }

    /// Replace the error model.
    pub fn with_error_model(mut self, model: ErrorModel) -> Self {
        self.model = model;
        self
    }

    /// Per-bit flip probability.
    pub fn crossover(&self) -> f64 {
        self.crossover
    }

    /// Active error model.
    pub fn error_model(&self) -> ErrorModel {
        self.model
    }

    /// Bits pushed through so far.
    pub fn bits_sent(&self) -> u64 {
        self.bits_sent
    }

    /// Bits flipped so far.
    pub fn bits_flipped(&self) -> u64 {
        self.bits_flipped
    }

    /// Empirical flip rate, 0 before anything was sent.
    pub fn observed_crossover(&self) -> f64 {
        if self.bits_sent == 0 {
            0.0
        } else {
            self.bits_flipped as f64 / self.bits_sent as f64
        }
    }

    fn maybe_flip(&mut self, word: &mut BitSlice, idx: usize) {
        if self.rng.gen_bool(self.crossover) {
            let bit = !word[idx];
            word.set(idx, bit);
            self.bits_flipped += 1;
        }
    }
}

impl<R: Rng> Channel for BinarySymmetricChannel<R> {
    fn transmit(&mut self, sent: &BitSlice) -> Result<BitVec, ChannelError> {
        let mut received = sent.to_bitvec();
        let len = received.len();
        match self.model {
            ErrorModel::Independent => {
                for idx in 0..len {
                    self.maybe_flip(&mut received, idx);
                }
            }
            ErrorModel::Positions(count) => {
                if count > len {
                    return Err(ChannelError::TooManyPositions {
                        requested: count,
                        available: len,
                    });
                }
                let positions = index::sample(&mut self.rng, len, count);
                for idx in positions.iter() {
                    self.maybe_flip(&mut received, idx);
                }
            }
        }
        self.bits_sent += len as u64;
        Ok(received)
    }
}

/// Deterministic channel replaying a fixed list of flip sets.
///
/// Each transmission consumes the next set of 1-indexed positions to flip;
/// once the script is exhausted words pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChannel {
    script: VecDeque<Vec<usize>>,
}

impl ScriptedChannel {
    /// Channel that flips `script[i]` on the i-th word.
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Vec<usize>>,
    {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Transmissions left in the script.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Channel for ScriptedChannel {
    fn transmit(&mut self, sent: &BitSlice) -> Result<BitVec, ChannelError> {
        let mut received = sent.to_bitvec();
        if let Some(flips) = self.script.pop_front() {
            for position in flips {
                if position == 0 || position > received.len() {
                    return Err(ChannelError::TooManyPositions {
                        requested: position,
                        available: received.len(),
                    });
                }
                let bit = !received[position - 1];
                received.set(position - 1, bit);
            }
        }
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noiseless_and_inverting_extremes() {
        let word = bitvec![1, 0, 1, 1, 0];
        let mut clean = BinarySymmetricChannel::seeded(0.0, 7).unwrap();
        assert_eq!(clean.transmit(&word).unwrap(), word);

        let mut inverting = BinarySymmetricChannel::seeded(1.0, 7).unwrap();
        assert_eq!(inverting.transmit(&word).unwrap(), !word.clone());
        assert_eq!(inverting.bits_flipped(), 5);
    }

    #[test]
    fn same_seed_same_noise() {
        let word = bitvec![0; 64];
        let mut a = BinarySymmetricChannel::seeded(0.3, 99).unwrap();
        let mut b = BinarySymmetricChannel::seeded(0.3, 99).unwrap();
        for _ in 0..10 {
            assert_eq!(a.transmit(&word).unwrap(), b.transmit(&word).unwrap());
        }
    }

    #[test]
    fn flip_rate_tracks_crossover() {
        let word = bitvec![0; 1000];
        let mut channel = BinarySymmetricChannel::seeded(0.2, 1).unwrap();
        for _ in 0..20 {
            channel.transmit(&word).unwrap();
        }
        assert!((channel.observed_crossover() - 0.2).abs() < 0.02);
    }

    #[test]
    fn position_model_bounds_flips() {
        let word = bitvec![0; 7];
        let mut channel = BinarySymmetricChannel::seeded(1.0, 3)
            .unwrap()
            .with_error_model(ErrorModel::Positions(2));
        let received = channel.transmit(&word).unwrap();
        assert_eq!(received.count_ones(), 2);

        let mut greedy = BinarySymmetricChannel::seeded(0.5, 3)
            .unwrap()
            .with_error_model(ErrorModel::Positions(8));
        assert_eq!(
            greedy.transmit(&word),
            Err(ChannelError::TooManyPositions {
                requested: 8,
                available: 7
            })
        );
    }

    #[test]
    fn rejects_invalid_crossover() {
        assert_eq!(
            BinarySymmetricChannel::seeded(1.5, 0).unwrap_err(),
            ChannelError::InvalidCrossover(1.5)
        );
    }

    #[test]
    fn scripted_flips_then_passes_through() {
        let word = bitvec![0, 0, 0, 0];
        let mut channel = ScriptedChannel::new(vec![vec![1, 4], vec![]]);
        assert_eq!(channel.transmit(&word).unwrap(), bitvec![1, 0, 0, 1]);
        assert_eq!(channel.transmit(&word).unwrap(), word);
        assert_eq!(channel.remaining(), 0);
        assert_eq!(channel.transmit(&word).unwrap(), word);
    }
}
