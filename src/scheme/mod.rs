//! Feedback transmission loops
//!
//! Both schemes share the same round skeleton: derive a symbol from the
//! posterior, push it through the channel, fold the noisy feedback into the
//! posterior, re-centre the tree on the new median, then test the stopping
//! rules. [`SchemeState`] carries everything a round mutates so callers can
//! drive the loop themselves with `step`, or hand it to `transmit`.

mod message;
mod mpms;
mod pms;

pub use message::{
    bit_string, dyadic_cell, leading_bits, Message, DEFAULT_VALUE_BITS, MAX_MESSAGE_BITS,
    MAX_VALUE_BITS,
};
pub use mpms::CodedPosteriorMatchingScheme;
pub use pms::PosteriorMatchingScheme;

use bitvec::prelude::*;
use tracing::{info, warn};

use crate::numeric::Real;
use crate::tree::PartitionTree;
use crate::{SchemeConfig, SchemeError};

/// Lifecycle of one transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchemeStatus {
    /// More rounds are needed.
    Running,
    /// A stopping rule fired.
    Converged,
    /// The round budget ran out first.
    Exhausted,
}

/// What the receiver made of one round's channel output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Feedback {
    /// Uncoded scheme: the received bit.
    Bit(bool),
    /// Coded scheme: the accepted block index.
    Block {
        /// Decoded block, read as a binary number.
        index: u64,
        /// Position flipped back by the decoder, if any.
        corrected: Option<usize>,
    },
    /// Coded scheme: the block could not be decoded and was ignored.
    Skipped {
        /// Syndrome that pointed past the end of the block.
        syndrome: usize,
    },
}

/// Trace of one round.
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// 1-based round number.
    pub round: usize,
    /// Word handed to the channel.
    pub sent: BitVec,
    /// Word that came out of it.
    pub received: BitVec,
    /// How the receiver interpreted it.
    pub feedback: Feedback,
    /// Posterior median after the round.
    pub estimate: Real,
    /// Status after the round.
    pub status: SchemeStatus,
}

/// Mutable state of one transmission.
#[derive(Debug, Clone)]
pub struct SchemeState {
    pub(crate) tree: PartitionTree,
    pub(crate) message: Message,
    pub(crate) target: Real,
    pub(crate) estimate: Real,
    pub(crate) round: usize,
    pub(crate) status: SchemeStatus,
    pub(crate) decoded_bits: usize,
}

impl SchemeState {
    pub(crate) fn new(message: &Message, config: &SchemeConfig) -> Self {
        let tree = PartitionTree::with_tolerance(config.tolerance.clone());
        Self {
            tree,
            message: message.clone(),
            target: message.target(),
            estimate: Real::half(),
            round: 0,
            status: SchemeStatus::Running,
            decoded_bits: message.bit_len().unwrap_or(config.value_bits),
        }
    }

    /// Receiver's posterior.
    pub fn tree(&self) -> &PartitionTree {
        &self.tree
    }

    /// Message being sent.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Value the sender steers towards.
    pub fn target(&self) -> &Real {
        &self.target
    }

    /// Current posterior median.
    pub fn estimate(&self) -> &Real {
        &self.estimate
    }

    /// Rounds completed, skipped rounds included.
    pub fn round(&self) -> usize {
        self.round
    }

    /// Current status.
    pub fn status(&self) -> SchemeStatus {
        self.status
    }

    /// Whether another `step` is allowed.
    pub fn is_running(&self) -> bool {
        self.status == SchemeStatus::Running
    }

    /// Receiver's current reading of the message.
    pub fn decoded(&self) -> BitVec {
        leading_bits(&self.estimate, self.decoded_bits)
    }

    pub(crate) fn ensure_running(&self) -> Result<(), SchemeError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(SchemeError::NotRunning(self.status))
        }
    }

    /// Posterior mass of the dyadic cell the estimate falls in.
    pub fn decoded_cell_mass(&self) -> Result<Real, SchemeError> {
        let (lower, upper) = dyadic_cell(&self.decoded());
        Ok(self.tree.interval_mass(&lower, &upper)?)
    }

    /// Count the round and apply the stopping rules.
    ///
    /// `informative` is false for rounds whose feedback was discarded; the
    /// posterior did not move, so only the budget is checked.
    pub(crate) fn close_round(
        &mut self,
        previous: &Real,
        config: &SchemeConfig,
        informative: bool,
    ) -> Result<(), SchemeError> {
        self.round += 1;
        if informative && self.has_converged(previous, config)? {
            self.status = SchemeStatus::Converged;
            info!(
                rounds = self.round,
                estimate = self.estimate.to_f64(),
                "posterior converged"
            );
        } else if self.round >= config.max_rounds {
            self.status = SchemeStatus::Exhausted;
            warn!(
                rounds = self.round,
                estimate = self.estimate.to_f64(),
                "round budget exhausted before convergence"
            );
        }
        Ok(())
    }

    fn has_converged(&self, previous: &Real, config: &SchemeConfig) -> Result<bool, SchemeError> {
        match self.message {
            Message::Bits(_) => {
                let threshold = Real::try_from(1.0 - config.target_error)
                    .map_err(|err| SchemeError::InvalidConfiguration(err.to_string()))?;
                Ok(self.decoded_cell_mass()? >= threshold)
            }
            Message::Value(_) => Ok(self
                .estimate
                .approx_eq(previous, &config.convergence_tolerance)),
        }
    }

    pub(crate) fn into_transmission(self, block_length: usize, message_bits: usize) -> Transmission {
        Transmission {
            decoded: self.decoded(),
            estimate: self.estimate,
            rounds: self.round,
            block_length,
            message_bits,
            status: self.status,
        }
    }
}

/// Outcome handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transmission {
    /// Decoded bit string.
    pub decoded: BitVec,
    /// Final posterior median.
    pub estimate: Real,
    /// Rounds used, skipped rounds included.
    pub rounds: usize,
    /// Channel bits per round (1 uncoded, n coded).
    pub block_length: usize,
    /// Message bits per round (1 uncoded, k coded).
    pub message_bits: usize,
    /// Final status.
    pub status: SchemeStatus,
}

impl Transmission {
    /// Decoded bits as a `0`/`1` string.
    pub fn decoded_string(&self) -> String {
        bit_string(&self.decoded)
    }

    /// `true` if a stopping rule fired before the budget ran out.
    pub fn converged(&self) -> bool {
        self.status == SchemeStatus::Converged
    }

    /// Total bits pushed through the channel.
    pub fn channel_uses(&self) -> usize {
        self.rounds * self.block_length
    }

    /// Message bits delivered per channel use.
    pub fn rate(&self, message_bits: usize) -> f64 {
        match self.channel_uses() {
            0 => 0.0,
            uses => message_bits as f64 / uses as f64,
        }
    }
}
