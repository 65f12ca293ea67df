//! Memoryless binary symmetric channel
//!
//! The channel is the only source of randomness in a transmission. It sits
//! behind the [`Channel`] trait so that seeded, scripted or recorded noise
//! can be swapped in without touching the schemes.

mod bsc;
mod capacity;

pub use bsc::{BinarySymmetricChannel, ErrorModel, ScriptedChannel};
pub use capacity::{binary_entropy, bsc_capacity, coded_capacity};

use bitvec::prelude::*;
use thiserror::Error;

/// Errors raised while pushing a word through a channel.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChannelError {
    /// Crossover probability must lie in [0, 1].
    #[error("crossover probability {0} outside [0, 1]")]
    InvalidCrossover(f64),

    /// The error model asks for more corrupted positions than the word has.
    #[error("cannot corrupt {requested} positions of a {available}-bit word")]
    TooManyPositions {
        /// Positions requested by the error model.
        requested: usize,
        /// Length of the word being sent.
        available: usize,
    },
}

/// A noisy forward link: takes the sent word, returns the received word.
pub trait Channel {
    /// Transmit one word.
    fn transmit(&mut self, sent: &BitSlice) -> Result<BitVec, ChannelError>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn transmit(&mut self, sent: &BitSlice) -> Result<BitVec, ChannelError> {
        (**self).transmit(sent)
    }
}
