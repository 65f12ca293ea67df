//! Send a short bit string one bit per round and print every round.

use posterior_matching::channel::BinarySymmetricChannel;
use posterior_matching::scheme::bit_string;
use posterior_matching::{Feedback, Message, PosteriorMatchingScheme};

fn main() -> anyhow::Result<()> {
    let crossover = 0.2;
    let scheme = PosteriorMatchingScheme::new(crossover)?;
    let message = Message::parse_bits("1001")?;
    let mut channel = BinarySymmetricChannel::seeded(crossover, 2024)?;

    let mut state = scheme.start(&message);
    println!("target {} (value {})", message, state.target());
    while state.is_running() {
        let report = scheme.step(&mut state, &mut channel)?;
        let heard = match report.feedback {
            Feedback::Bit(bit) => u8::from(bit),
            _ => unreachable!("uncoded rounds carry one bit"),
        };
        println!(
            "round {:3}: sent {} heard {} estimate {:.12}",
            report.round,
            bit_string(&report.sent),
            heard,
            report.estimate
        );
    }

    println!(
        "{:?} after {} rounds: decoded {} (cell mass {:.6})",
        state.status(),
        state.round(),
        bit_string(&state.decoded()),
        state.decoded_cell_mass()?
    );
    println!(
        "channel flipped {} of {} bits",
        channel.bits_flipped(),
        channel.bits_sent()
    );
    Ok(())
}
