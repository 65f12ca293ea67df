//! Effective block-error probability for the coded posterior update
//!
//! The coded scheme scales the probability bin named by the decoded block
//! up by `1 - rho` and spreads `rho` over the other bins. `rho` is not the
//! bit crossover probability; it depends on the code and on how the
//! decoder treats blocks it cannot correct. Estimators are pluggable.

use std::fmt;
use std::str::FromStr;

use super::{BlockCode, HammingCode};

/// Estimates the probability that an accepted block is wrong.
pub trait BlockErrorEstimator: fmt::Debug + Send + Sync {
    /// Short label for logs and reports.
    fn name(&self) -> &'static str;

    /// `rho` for the given bit crossover probability and code.
    fn block_error_probability(&self, crossover: f64, code: &HammingCode) -> f64;
}

/// P(block wrong | block accepted), exact for single-error syndrome
/// decoding: patterns of two or more flips whose syndrome lands inside
/// the block are accepted and wrong, the rest are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptedBlockError;

impl BlockErrorEstimator for AcceptedBlockError {
    fn name(&self) -> &'static str {
        "accepted"
    }

    fn block_error_probability(&self, crossover: f64, code: &HammingCode) -> f64 {
        let spectrum = code.error_spectrum();
        let wrong = spectrum.accepted_wrong_probability(crossover);
        let accepted = 1.0 - spectrum.rejected_probability(crossover);
        if accepted <= 0.0 {
            return 1.0;
        }
        (wrong / accepted).clamp(0.0, 1.0)
    }
}

/// P(more than one flip in the block), ignoring rejections.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderFailure;

impl BlockErrorEstimator for DecoderFailure {
    fn name(&self) -> &'static str {
        "decoder-failure"
    }

    fn block_error_probability(&self, crossover: f64, code: &HammingCode) -> f64 {
        let n = code.block_len() as i32;
        let clean = (1.0 - crossover).powi(n);
        let single = n as f64 * crossover * (1.0 - crossover).powi(n - 1);
        (1.0 - clean - single).clamp(0.0, 1.0)
    }
}

/// Uses the bit crossover probability unchanged (mismatched baseline).
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCrossover;

impl BlockErrorEstimator for RawCrossover {
    fn name(&self) -> &'static str {
        "crossover"
    }

    fn block_error_probability(&self, crossover: f64, _code: &HammingCode) -> f64 {
        crossover
    }
}

/// Built-in estimator selection, usable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EstimatorKind {
    /// [`AcceptedBlockError`]
    #[default]
    Accepted,
    /// [`DecoderFailure`]
    DecoderFailure,
    /// [`RawCrossover`]
    Crossover,
}

impl EstimatorKind {
    /// Instantiate the estimator.
    pub fn build(self) -> Box<dyn BlockErrorEstimator> {
        match self {
            EstimatorKind::Accepted => Box::new(AcceptedBlockError),
            EstimatorKind::DecoderFailure => Box::new(DecoderFailure),
            EstimatorKind::Crossover => Box::new(RawCrossover),
        }
    }
}

impl FromStr for EstimatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(EstimatorKind::Accepted),
            "decoder-failure" => Ok(EstimatorKind::DecoderFailure),
            "crossover" => Ok(EstimatorKind::Crossover),
            other => Err(format!(
                "unknown estimator '{other}' (expected accepted, decoder-failure or crossover)"
            )),
        }
    }
}
