//! One bit per round
//!
//! The sender transmits whether the target lies at or above the receiver's
//! current median. Whatever bit arrives, the receiver's posterior is split
//! exactly at that median, so the update only has to reweight the root
//! split to `(1 - e, e)` or `(e, 1 - e)` and look for the new median.

use bitvec::prelude::*;
use tracing::debug;

use super::{Feedback, Message, RoundReport, SchemeState};
use crate::channel::{BinarySymmetricChannel, Channel};
use crate::numeric::Real;
use crate::scheme::Transmission;
use crate::{SchemeConfig, SchemeError};

/// Posterior matching over an uncoded BSC.
#[derive(Debug, Clone)]
pub struct PosteriorMatchingScheme {
    config: SchemeConfig,
    stay: Real,
    cross: Real,
}

impl PosteriorMatchingScheme {
    /// Scheme with default parameters for the given crossover probability.
    pub fn new(crossover: f64) -> Result<Self, SchemeError> {
        Self::with_config(SchemeConfig::for_crossover(crossover))
    }

    /// Scheme with explicit parameters.
    pub fn with_config(config: SchemeConfig) -> Result<Self, SchemeError> {
        config.validate()?;
        let cross = Real::try_from(config.crossover)
            .map_err(|err| SchemeError::InvalidConfiguration(err.to_string()))?;
        Ok(Self {
            stay: cross.complement(),
            cross,
            config,
        })
    }

    /// Active parameters.
    pub fn config(&self) -> &SchemeConfig {
        &self.config
    }

    /// Fresh state for `message`: uniform posterior, estimate 1/2.
    pub fn start(&self, message: &Message) -> SchemeState {
        SchemeState::new(message, &self.config)
    }

    /// Run one round through `channel`.
    pub fn step<C>(&self, state: &mut SchemeState, channel: &mut C) -> Result<RoundReport, SchemeError>
    where
        C: Channel + ?Sized,
    {
        state.ensure_running()?;

        // the root split sits at the current median
        let bit = state.target >= state.estimate;
        let sent: BitVec = std::iter::once(bit).collect();
        let received = channel.transmit(&sent)?;
        let heard = received.first().map(|b| *b).unwrap_or(bit);

        let root = state.tree.root();
        let left = if heard { self.cross.clone() } else { self.stay.clone() };
        state.tree.set_split(root, left)?;

        let median = recenter(state)?;
        let previous = std::mem::replace(&mut state.estimate, median);
        state.close_round(&previous, &self.config, true)?;
        debug!(
            round = state.round,
            sent = bit,
            heard,
            estimate = state.estimate.to_f64(),
            "pms round"
        );

        Ok(RoundReport {
            round: state.round,
            sent,
            received,
            feedback: Feedback::Bit(heard),
            estimate: state.estimate.clone(),
            status: state.status,
        })
    }

    /// Run rounds until a stopping rule fires or the budget runs out.
    pub fn transmit<C>(&self, message: &Message, channel: &mut C) -> Result<Transmission, SchemeError>
    where
        C: Channel + ?Sized,
    {
        let mut state = self.start(message);
        while state.is_running() {
            self.step(&mut state, channel)?;
        }
        Ok(state.into_transmission(1, 1))
    }

    /// [`transmit`](Self::transmit) over a BSC seeded with `seed`.
    pub fn transmit_seeded(&self, message: &Message, seed: u64) -> Result<Transmission, SchemeError> {
        let mut channel = BinarySymmetricChannel::seeded(self.config.crossover, seed)?;
        self.transmit(message, &mut channel)
    }
}

/// Find the posterior median, splay its split to the root and return it.
pub(crate) fn recenter(state: &mut SchemeState) -> Result<Real, SchemeError> {
    let median = state.tree.quantile(&Real::half())?;
    if let Some(split) = state.tree.parent(median) {
        state.tree.rotate_to_root(split);
    }
    Ok(state.tree.boundary(median).clone())
}
