use std::collections::HashSet;

use blake3::Hasher;
use posterior_matching::channel::BinarySymmetricChannel;
use posterior_matching::{CodedPosteriorMatchingScheme, Message, PosteriorMatchingScheme};

fn fingerprint_pms(seed: u64) -> blake3::Hash {
    let scheme = PosteriorMatchingScheme::new(0.2).expect("valid configuration");
    let message = Message::parse_bits("1001").expect("binary message");
    let mut state = scheme.start(&message);
    let mut channel = BinarySymmetricChannel::seeded(0.2, seed).expect("valid crossover");

    let mut hasher = Hasher::new();
    while state.is_running() {
        let report = scheme.step(&mut state, &mut channel).expect("round runs");
        hasher.update(format!("{:?}|{}\n", report.received, report.estimate).as_bytes());
    }
    for leaf in state.tree().leaves() {
        hasher.update(format!("{}:{}:{}\n", leaf.start, leaf.length, leaf.mass).as_bytes());
    }
    hasher.finalize()
}

#[test]
fn pms_is_deterministic_for_a_seed() {
    let fingerprints: HashSet<_> = (0..5).map(|_| fingerprint_pms(1234)).collect();
    assert_eq!(fingerprints.len(), 1, "outputs diverged across runs");
}

#[test]
fn different_seeds_see_different_noise() {
    let fingerprints: HashSet<_> = (0..5).map(fingerprint_pms).collect();
    assert!(fingerprints.len() > 1);
}

#[test]
fn mpms_is_deterministic_for_a_seed() {
    let scheme = CodedPosteriorMatchingScheme::new(0.1, 0.01).expect("valid configuration");
    let message = Message::parse_bits("011010").expect("binary message");

    let mut fingerprints = HashSet::new();
    for _ in 0..5 {
        let result = scheme.transmit_seeded(&message, 99).expect("transmission runs");
        let rendered = format!(
            "{}|{}|{}|{:?}",
            result.decoded_string(),
            result.estimate,
            result.rounds,
            result.status
        );
        fingerprints.insert(blake3::hash(rendered.as_bytes()));
    }
    assert_eq!(fingerprints.len(), 1, "outputs diverged across runs");
}
