//! # Posterior Matching over a Binary Symmetric Channel
//!
//! Feedback transmission of a message value through a noisy binary channel.
//! The receiver keeps its posterior over the value as a probability-weighted
//! partition of [0, 1); the sender, who sees the receiver's feedback, keeps
//! pushing the bit (or block) that best splits that posterior.
//!
//! ## Components
//!
//! 1. **Partition tree**: arena splay tree with lazy quantile / CDF queries
//! 2. **Block code**: systematic Hamming code with syndrome correction
//! 3. **Channel**: seeded memoryless BSC behind a trait
//! 4. **Schemes**: one bit per round (PMS) or one coded block per round (MPMS)
//!
//! ## Usage Example
//!
//! ```no_run
//! use posterior_matching::{Message, PosteriorMatchingScheme};
//!
//! let scheme = PosteriorMatchingScheme::new(0.2)?;
//! let message = Message::parse_bits("1001")?;
//! let result = scheme.transmit_seeded(&message, 7)?;
//! println!("{} after {} channel uses", result.decoded_string(), result.channel_uses());
//! # Ok::<(), posterior_matching::SchemeError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod channel; // Binary symmetric channel and capacity helpers
pub mod code; // Hamming code and block-error estimators
pub mod numeric; // Extended-precision reals
pub mod scheme; // PMS / MPMS transmission loops
pub mod tree; // Weighted partition splay tree

pub use channel::{BinarySymmetricChannel, Channel, ChannelError, ErrorModel};
pub use code::{BlockCode, BlockErrorEstimator, CodeError, Correction, EstimatorKind, HammingCode};
pub use numeric::Real;
pub use scheme::{
    CodedPosteriorMatchingScheme, Feedback, Message, PosteriorMatchingScheme, RoundReport,
    SchemeState, SchemeStatus, Transmission, DEFAULT_VALUE_BITS,
};
pub use tree::{PartitionTree, TreeError};

use thiserror::Error;

/// Largest supported block length k; the update touches 2^k bins.
pub const MAX_BLOCK_LENGTH: usize = 16;

/// Parameters shared by both schemes
#[derive(Debug, Clone)]
pub struct SchemeConfig {
    /// Per-bit flip probability of the channel
    pub crossover: f64,

    /// Stop once the decoded cell holds at least `1 - target_error` of the
    /// posterior
    pub target_error: f64,

    /// Round budget; running out is reported, not raised
    pub max_rounds: usize,

    /// Boundary tolerance for tree queries
    pub tolerance: Real,

    /// Value messages stop once successive estimates move less than this
    pub convergence_tolerance: Real,

    /// Message bits per block (k) for the coded scheme
    pub block_length: usize,

    /// Effective block-error estimator for the coded scheme
    pub estimator: EstimatorKind,

    /// Restrict channel noise to this many positions per block
    pub error_positions: Option<usize>,

    /// Decoded length for value messages
    pub value_bits: usize,
}

impl SchemeConfig {
    /// Defaults for a channel with the given crossover probability.
    pub fn for_crossover(crossover: f64) -> Self {
        Self {
            crossover,
            ..Self::default()
        }
    }

    /// Set the target error probability.
    pub fn with_target_error(mut self, target_error: f64) -> Self {
        self.target_error = target_error;
        self
    }

    /// Set the round budget.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set the tree boundary tolerance.
    pub fn with_tolerance(mut self, tolerance: Real) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the estimate-movement threshold for value messages.
    pub fn with_convergence_tolerance(mut self, tolerance: Real) -> Self {
        self.convergence_tolerance = tolerance;
        self
    }

    /// Set k for the coded scheme.
    pub fn with_block_length(mut self, block_length: usize) -> Self {
        self.block_length = block_length;
        self
    }

    /// Pick the block-error estimator.
    pub fn with_estimator(mut self, estimator: EstimatorKind) -> Self {
        self.estimator = estimator;
        self
    }

    /// Limit channel noise to `count` positions per block.
    pub fn with_error_positions(mut self, count: usize) -> Self {
        self.error_positions = Some(count);
        self
    }

    /// Set the decoded length for value messages.
    pub fn with_value_bits(mut self, bits: usize) -> Self {
        self.value_bits = bits;
        self
    }

    /// Reject parameters no scheme can run with.
    pub fn validate(&self) -> Result<(), SchemeError> {
        if !(0.0..0.5).contains(&self.crossover) {
            return Err(SchemeError::InvalidConfiguration(format!(
                "crossover probability {} must lie in [0, 0.5)",
                self.crossover
            )));
        }
        if !(self.target_error > 0.0 && self.target_error < 1.0) {
            return Err(SchemeError::InvalidConfiguration(format!(
                "target error probability {} must lie in (0, 1)",
                self.target_error
            )));
        }
        if self.max_rounds == 0 {
            return Err(SchemeError::InvalidConfiguration(
                "round budget must be at least 1".to_string(),
            ));
        }
        if self.tolerance.is_negative() || self.tolerance.is_zero() {
            return Err(SchemeError::InvalidConfiguration(format!(
                "tolerance {} must be positive",
                self.tolerance
            )));
        }
        if !(1..=MAX_BLOCK_LENGTH).contains(&self.block_length) {
            return Err(SchemeError::InvalidConfiguration(format!(
                "block length {} must lie in 1..={MAX_BLOCK_LENGTH}",
                self.block_length
            )));
        }
        if !(1..=scheme::MAX_VALUE_BITS).contains(&self.value_bits) {
            return Err(SchemeError::InvalidConfiguration(format!(
                "value bits {} must lie in 1..={}",
                self.value_bits,
                scheme::MAX_VALUE_BITS
            )));
        }
        Ok(())
    }
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            crossover: 0.1,
            target_error: 0.01,
            max_rounds: 500,
            tolerance: Real::default_tolerance(),
            convergence_tolerance: Real::try_from(1e-12).unwrap_or_else(|_| Real::zero()),
            block_length: 4,
            estimator: EstimatorKind::default(),
            error_positions: None,
            value_bits: DEFAULT_VALUE_BITS,
        }
    }
}

/// Errors that can occur while setting up or running a transmission
#[derive(Error, Debug)]
pub enum SchemeError {
    /// Configuration rejected before any round ran
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Message cannot be transmitted
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// `step` called on a state that already terminated
    #[error("Transmission already finished ({0:?})")]
    NotRunning(SchemeStatus),

    /// Posterior tree rejected a query
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Block code rejected a word
    #[error(transparent)]
    Code(#[from] CodeError),

    /// Channel rejected a word
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
