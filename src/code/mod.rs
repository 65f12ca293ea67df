//! Block codes on the forward path of the coded scheme
//!
//! The coded scheme only needs three things from a code: systematic
//! encoding of a k-bit block, a syndrome that names the position of a
//! single flipped bit, and extraction of the message bits. [`BlockCode`]
//! captures that contract; [`HammingCode`] is the stock implementation.

mod estimator;
mod hamming;

pub use estimator::{
    AcceptedBlockError, BlockErrorEstimator, DecoderFailure, EstimatorKind, RawCrossover,
};
pub use hamming::{redundant_bits, ErrorSpectrum, HammingCode};

use bitvec::prelude::*;
use thiserror::Error;

/// Errors raised by block code operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// A code needs at least one message bit.
    #[error("message length must be at least one bit")]
    EmptyMessage,

    /// Message handed to `encode` has the wrong length.
    #[error("expected a {expected}-bit message, got {actual} bits")]
    MessageLength {
        /// Message length of the code.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// Received word handed to `correct` has the wrong length.
    #[error("expected a {expected}-bit block, got {actual} bits")]
    BlockLength {
        /// Block length of the code.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
}

/// Result of running the decoder on a received block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    /// Syndrome was zero; the block is taken as sent.
    Clean(BitVec),
    /// One bit was flipped back before decoding.
    Corrected {
        /// 1-indexed position that was flipped.
        position: usize,
        /// Decoded message bits.
        message: BitVec,
    },
    /// Syndrome points past the end of the block; nothing can be decoded.
    Uncorrectable {
        /// Offending syndrome value.
        syndrome: usize,
    },
}

impl Correction {
    /// Decoded message, if the block was accepted.
    pub fn message(&self) -> Option<&BitSlice> {
        match self {
            Correction::Clean(message) | Correction::Corrected { message, .. } => {
                Some(message.as_bitslice())
            }
            Correction::Uncorrectable { .. } => None,
        }
    }

    /// `false` only for [`Correction::Uncorrectable`].
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Correction::Uncorrectable { .. })
    }
}

/// Systematic linear block code with single-error syndrome decoding.
pub trait BlockCode {
    /// Message bits per block (k).
    fn message_len(&self) -> usize;

    /// Transmitted bits per block (n).
    fn block_len(&self) -> usize;

    /// Encode a k-bit message into an n-bit codeword.
    fn encode(&self, message: &BitSlice) -> Result<BitVec, CodeError>;

    /// Syndrome of a received word: 0 for "no error", otherwise the
    /// 1-indexed position of the suspected flipped bit.
    fn syndrome(&self, received: &BitSlice) -> usize;

    /// Strip redundancy from a codeword.
    fn decode(&self, codeword: &BitSlice) -> BitVec;

    /// Detect, correct at most one bit, and decode.
    fn correct(&self, received: &BitSlice) -> Result<Correction, CodeError> {
        if received.len() != self.block_len() {
            return Err(CodeError::BlockLength {
                expected: self.block_len(),
                actual: received.len(),
            });
        }
        let syndrome = self.syndrome(received);
        if syndrome == 0 {
            return Ok(Correction::Clean(self.decode(received)));
        }
        if syndrome > received.len() {
            return Ok(Correction::Uncorrectable { syndrome });
        }
        let mut repaired = received.to_bitvec();
        let flipped = !repaired[syndrome - 1];
        repaired.set(syndrome - 1, flipped);
        Ok(Correction::Corrected {
            position: syndrome,
            message: self.decode(&repaired),
        })
    }
}
