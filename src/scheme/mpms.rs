//! One Hamming-coded block per round
//!
//! The posterior's CDF axis is cut into M = 2^k equal bins; the sender
//! transmits the index of the bin holding the target. An accepted block
//! names bin `y`, which is taken to be right with probability `1 - rho` and
//! any one of the other `M - 1` bins with probability `rho / (M - 1)`.
//!
//! The tree cannot hold a three-way split, so the reweighting happens in
//! two binary steps: the split at `y / M` is splayed to the root and gets
//! the weight of everything below the bin, then the split at `(y + 1) / M`
//! is splayed up to the root's right child and divides the bin from
//! everything above it.

use tracing::{debug, warn};

use super::message::{bits_to_index, index_to_bits};
use super::pms::recenter;
use super::{Feedback, Message, RoundReport, SchemeState, Transmission};
use crate::channel::{BinarySymmetricChannel, Channel, ErrorModel};
use crate::code::{BlockCode, BlockErrorEstimator, Correction, HammingCode};
use crate::numeric::Real;
use crate::tree::{NodeId, PartitionTree, TreeError};
use crate::{SchemeConfig, SchemeError};

/// Posterior matching with a Hamming code on the forward link.
#[derive(Debug)]
pub struct CodedPosteriorMatchingScheme {
    config: SchemeConfig,
    code: HammingCode,
    estimator: Box<dyn BlockErrorEstimator>,
    rho: f64,
    block_error: Real,
}

impl CodedPosteriorMatchingScheme {
    /// Scheme with default parameters (k = 4, the (7,4) code).
    pub fn new(crossover: f64, target_error: f64) -> Result<Self, SchemeError> {
        Self::with_config(SchemeConfig::for_crossover(crossover).with_target_error(target_error))
    }

    /// Scheme with explicit parameters.
    pub fn with_config(config: SchemeConfig) -> Result<Self, SchemeError> {
        config.validate()?;
        let code = HammingCode::new(config.block_length)?;
        if let Some(count) = config.error_positions {
            if count > code.block_len() {
                return Err(SchemeError::InvalidConfiguration(format!(
                    "{count} error positions requested on a {}-bit block",
                    code.block_len()
                )));
            }
        }
        let estimator = config.estimator.build();
        Self::assemble(config, code, estimator)
    }

    /// Swap in a different block-error estimator.
    pub fn with_estimator(self, estimator: Box<dyn BlockErrorEstimator>) -> Result<Self, SchemeError> {
        Self::assemble(self.config, self.code, estimator)
    }

    fn assemble(
        config: SchemeConfig,
        code: HammingCode,
        estimator: Box<dyn BlockErrorEstimator>,
    ) -> Result<Self, SchemeError> {
        let rho = estimator.block_error_probability(config.crossover, &code);
        let bins = (1u64 << code.message_len()) as f64;
        if !(0.0..(bins - 1.0) / bins).contains(&rho) {
            return Err(SchemeError::InvalidConfiguration(format!(
                "{} block-error probability {rho:.6} leaves a {}-bit block no information",
                estimator.name(),
                code.message_len()
            )));
        }
        let block_error =
            Real::try_from(rho).map_err(|err| SchemeError::InvalidConfiguration(err.to_string()))?;
        debug!(
            estimator = estimator.name(),
            rho,
            n = code.block_len(),
            k = code.message_len(),
            "coded scheme ready"
        );
        Ok(Self {
            config,
            code,
            estimator,
            rho,
            block_error,
        })
    }

    /// Active parameters.
    pub fn config(&self) -> &SchemeConfig {
        &self.config
    }

    /// Code used on the forward link.
    pub fn code(&self) -> &HammingCode {
        &self.code
    }

    /// Name of the block-error estimator in use.
    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    /// Effective probability that an accepted block is wrong.
    pub fn block_error_probability(&self) -> f64 {
        self.rho
    }

    /// Fresh state for `message`.
    pub fn start(&self, message: &Message) -> SchemeState {
        SchemeState::new(message, &self.config)
    }

    /// Run one round through `channel`.
    pub fn step<C>(&self, state: &mut SchemeState, channel: &mut C) -> Result<RoundReport, SchemeError>
    where
        C: Channel + ?Sized,
    {
        state.ensure_running()?;

        let k = self.code.message_len();
        let last = (1u64 << k) - 1;
        let below = state.tree.cdf(&state.target)?;
        let index = below.floor_scaled(k as u32).min(last);
        let sent = self.code.encode(&index_to_bits(index, k))?;
        let received = channel.transmit(&sent)?;

        let feedback = match self.code.correct(&received)? {
            Correction::Uncorrectable { syndrome } => {
                warn!(round = state.round + 1, syndrome, "uncorrectable block skipped");
                Feedback::Skipped { syndrome }
            }
            accepted => {
                let corrected = match &accepted {
                    Correction::Corrected { position, .. } => Some(*position),
                    _ => None,
                };
                let decoded = accepted.message().map(bits_to_index).unwrap_or(index);
                self.update(&mut state.tree, decoded)?;
                Feedback::Block {
                    index: decoded,
                    corrected,
                }
            }
        };

        let informative = !matches!(feedback, Feedback::Skipped { .. });
        let previous = state.estimate.clone();
        if informative {
            state.estimate = recenter(state)?;
        }
        state.close_round(&previous, &self.config, informative)?;
        debug!(
            round = state.round,
            sent = index,
            feedback = ?feedback,
            estimate = state.estimate.to_f64(),
            "mpms round"
        );

        Ok(RoundReport {
            round: state.round,
            sent,
            received,
            feedback,
            estimate: state.estimate.clone(),
            status: state.status,
        })
    }

    /// Reweight the posterior after bin `index` was received.
    fn update(&self, tree: &mut PartitionTree, index: u64) -> Result<(), SchemeError> {
        let k = self.code.message_len() as u32;
        let bins = 1u64 << k;
        let last = bins - 1;
        let rho = &self.block_error;
        let keep = rho.complement();
        let unit = rho / &Real::from(last);

        // both boundaries are located before any mass moves
        let lower = (index > 0)
            .then(|| split_at(tree, &Real::dyadic(index, k)))
            .transpose()?;
        let upper = (index < last)
            .then(|| split_at(tree, &Real::dyadic(index + 1, k)))
            .transpose()?;

        match (lower, upper) {
            (None, Some(upper)) => {
                tree.rotate_to_root(upper);
                tree.set_split(upper, keep)?;
            }
            (Some(lower), None) => {
                tree.rotate_to_root(lower);
                tree.set_split(lower, rho.clone())?;
            }
            (Some(lower), Some(upper)) => {
                tree.rotate_to_root(lower);
                tree.set_split(lower, &unit * &Real::from(index))?;
                tree.splay(upper, Some(lower));
                let above = &unit * &Real::from(last - index);
                let total = &keep + &above;
                tree.set_split(upper, keep / total)?;
            }
            (None, None) => unreachable!("a block carries at least two bins"),
        }
        Ok(())
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
        Ok(state.into_transmission(self.code.block_len(), self.code.message_len()))
    }

    /// [`transmit`](Self::transmit) over a BSC seeded with `seed`, using
    /// the configured error model.
    pub fn transmit_seeded(&self, message: &Message, seed: u64) -> Result<Transmission, SchemeError> {
        let model = self
            .config
            .error_positions
            .map_or(ErrorModel::Independent, ErrorModel::Positions);
        let mut channel =
            BinarySymmetricChannel::seeded(self.config.crossover, seed)?.with_error_model(model);
        self.transmit(message, &mut channel)
    }
}

/// Internal node splitting the posterior at CDF level `probability`.
fn split_at(tree: &mut PartitionTree, probability: &Real) -> Result<NodeId, SchemeError> {
    let node = tree.quantile(probability)?;
    let split = tree
        .parent(node)
        .ok_or_else(|| TreeError::InvariantViolation(format!("quantile {node} has no parent")))?;
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ScriptedChannel;
    use crate::code::RawCrossover;
    use crate::scheme::SchemeStatus;

    #[derive(Debug)]
    struct Hopeless;

    impl BlockErrorEstimator for Hopeless {
        fn name(&self) -> &'static str {
            "hopeless"
        }

        fn block_error_probability(&self, _crossover: f64, _code: &HammingCode) -> f64 {
            0.95
        }
    }

    fn bin_masses(tree: &PartitionTree, k: u32) -> Vec<f64> {
        let edges: Vec<Real> = (0..=(1u64 << k)).map(|i| Real::dyadic(i, k)).collect();
        edges
            .windows(2)
            .map(|w| tree.interval_mass(&w[0], &w[1]).unwrap().to_f64())
            .collect()
    }

    #[test]
    fn default_scheme_uses_seven_four_code() {
        let scheme = CodedPosteriorMatchingScheme::new(0.05, 0.01).unwrap();
        assert_eq!(scheme.code().block_len(), 7);
        assert_eq!(scheme.estimator_name(), "accepted");
        let rho = scheme.block_error_probability();
        assert!(rho > 0.0 && rho < 0.1);
    }

    #[test]
    fn update_reweights_three_zones() {
        let config = SchemeConfig::for_crossover(0.1).with_block_length(2);
        let scheme = CodedPosteriorMatchingScheme::with_config(config)
            .unwrap()
            .with_estimator(Box::new(RawCrossover))
            .unwrap();
        let mut tree = PartitionTree::new();
        scheme.update(&mut tree, 1).unwrap();
        tree.check_invariants().unwrap();

        // 4 bins of 1/4 each: bin 1 gets 0.9, the others 0.1 / 3
        let masses = bin_masses(&tree, 2);
        let other = 0.1 / 3.0;
        for (bin, mass) in masses.iter().enumerate() {
            let expected = if bin == 1 { 0.9 } else { other };
            assert!((mass - expected).abs() < 1e-12, "bin {bin}: {mass}");
        }
    }

    #[test]
    fn update_at_the_edges() {
        let config = SchemeConfig::for_crossover(0.2).with_block_length(1);
        let scheme = CodedPosteriorMatchingScheme::with_config(config)
            .unwrap()
            .with_estimator(Box::new(RawCrossover))
            .unwrap();

        let mut tree = PartitionTree::new();
        scheme.update(&mut tree, 0).unwrap();
        let masses = bin_masses(&tree, 1);
        assert!((masses[0] - 0.8).abs() < 1e-12);

        let mut tree = PartitionTree::new();
        scheme.update(&mut tree, 1).unwrap();
        let masses = bin_masses(&tree, 1);
        assert!((masses[1] - 0.8).abs() < 1e-12);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn uncorrectable_round_leaves_tree_untouched() {
        // k = 5 gives a shortened (9,5) code; flipping positions 6 and 9
        // yields syndrome 15, which names no position
        let config = SchemeConfig::for_crossover(0.1).with_block_length(5);
        let scheme = CodedPosteriorMatchingScheme::with_config(config).unwrap();
        let message = Message::parse_bits("10110").unwrap();
        let mut state = scheme.start(&message);
        let mut channel = ScriptedChannel::new(vec![vec![], vec![6, 9]]);

        scheme.step(&mut state, &mut channel).unwrap();
        let leaves = state.tree().leaves();
        let nodes = state.tree().node_count();
        let estimate = state.estimate().clone();

        let report = scheme.step(&mut state, &mut channel).unwrap();
        assert_eq!(report.feedback, Feedback::Skipped { syndrome: 15 });
        assert_eq!(report.round, 2);
        assert_eq!(state.round(), 2);
        assert_eq!(state.tree().leaves(), leaves);
        assert_eq!(state.tree().node_count(), nodes);
        assert_eq!(state.estimate(), &estimate);
        assert_eq!(state.status(), SchemeStatus::Running);
    }

    #[test]
    fn single_flip_is_corrected() {
        let scheme = CodedPosteriorMatchingScheme::new(0.1, 0.01).unwrap();
        let message = Message::parse_bits("0111").unwrap();
        let mut state = scheme.start(&message);
        let mut channel = ScriptedChannel::new(vec![vec![3]]);
        let report = scheme.step(&mut state, &mut channel).unwrap();
        // uniform prior: target 0.46875 sits in bin 7
        assert_eq!(
            report.feedback,
            Feedback::Block {
                index: 7,
                corrected: Some(3)
            }
        );
    }

    #[test]
    fn rejects_useless_configurations() {
        let too_many = SchemeConfig::for_crossover(0.1).with_error_positions(8);
        assert!(matches!(
            CodedPosteriorMatchingScheme::with_config(too_many),
            Err(SchemeError::InvalidConfiguration(_))
        ));

        let scheme = CodedPosteriorMatchingScheme::new(0.1, 0.01).unwrap();
        assert!(matches!(
            scheme.with_estimator(Box::new(Hopeless)),
            Err(SchemeError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn noiseless_transmission_converges() {
        let scheme = CodedPosteriorMatchingScheme::new(0.01, 0.01).unwrap();
        let message = Message::parse_bits("110010").unwrap();
        let result = scheme
            .transmit(&message, &mut ScriptedChannel::default())
            .unwrap();
        assert!(result.converged());
        assert_eq!(result.decoded_string(), "110010");
        assert_eq!(result.block_length, 7);
        assert_eq!(result.channel_uses(), result.rounds * 7);
    }
}
