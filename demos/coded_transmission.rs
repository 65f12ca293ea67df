//! Compare block lengths for coded posterior matching on the same channel.

use posterior_matching::channel::coded_capacity;
use posterior_matching::code::BlockCode;
use posterior_matching::{CodedPosteriorMatchingScheme, Message, SchemeConfig};

fn main() -> anyhow::Result<()> {
    let crossover = 0.1;
    let message = Message::parse_bits("110100101101")?;
    let trials = 20;

    for block_length in [1usize, 2, 4, 8] {
        let config = SchemeConfig::for_crossover(crossover).with_block_length(block_length);
        let scheme = CodedPosteriorMatchingScheme::with_config(config)?;
        let n = scheme.code().block_len();
        let rho = scheme.block_error_probability();

        let mut correct = 0;
        let mut uses = 0;
        for seed in 0..trials {
            let result = scheme.transmit_seeded(&message, seed)?;
            if result.converged() && result.decoded_string() == "110100101101" {
                correct += 1;
            }
            uses += result.channel_uses();
        }
        println!(
            "({n:2},{block_length}) rho={rho:.4} capacity={:.4} correct={correct}/{trials} mean channel uses={:.1}",
            coded_capacity(n, block_length, rho),
            uses as f64 / trials as f64
        );
    }
    Ok(())
}
