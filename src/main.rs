use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use posterior_matching::channel::{bsc_capacity, coded_capacity};
use posterior_matching::code::redundant_bits;
use posterior_matching::scheme::bit_string;
use posterior_matching::{
    BlockCode, BlockErrorEstimator, CodedPosteriorMatchingScheme, Correction, EstimatorKind,
    HammingCode, Message, PosteriorMatchingScheme, SchemeConfig, Transmission,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pmsim", about = "Posterior matching feedback transmission over a BSC")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a message one bit per channel use.
    Pms {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Send a message one Hamming-coded block per round.
    Mpms {
        #[command(flatten)]
        run: RunArgs,
        /// Message bits per block (k).
        #[arg(long, default_value_t = 4)]
        block_length: usize,
        /// Block-error estimator: accepted, decoder-failure or crossover.
        #[arg(long, default_value = "accepted")]
        estimator: EstimatorKind,
        /// Corrupt only this many positions per block.
        #[arg(long)]
        error_positions: Option<usize>,
    },
    /// Encode a block, optionally flip positions, and run the decoder.
    Hamming {
        /// Message bits, e.g. 1001.
        message: String,
        /// 1-indexed positions to flip before decoding.
        #[arg(long, value_delimiter = ',')]
        flip: Vec<usize>,
    },
    /// Print BSC and coded-channel capacities.
    Capacity {
        /// Crossover probability.
        crossover: f64,
        /// Message bits per block (k) for the coded figure.
        #[arg(long, default_value_t = 4)]
        block_length: usize,
        /// Block-error estimator for the coded figure.
        #[arg(long, default_value = "accepted")]
        estimator: EstimatorKind,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Bit string (e.g. 1001), or a value in [0, 1) with --value.
    message: String,
    /// Treat MESSAGE as a real value instead of a bit string.
    #[arg(long)]
    value: bool,
    /// Channel crossover probability.
    #[arg(long, default_value_t = 0.2)]
    crossover: f64,
    /// Target decoding error probability.
    #[arg(long, default_value_t = 0.01)]
    target_error: f64,
    /// Round budget.
    #[arg(long, default_value_t = 500)]
    max_rounds: usize,
    /// Seed of the first trial.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Independent trials with consecutive seeds.
    #[arg(long, default_value_t = 1)]
    trials: u64,
}

impl RunArgs {
    fn message(&self) -> Result<Message> {
        let message = if self.value {
            let value: f64 = self
                .message
                .parse()
                .with_context(|| format!("'{}' is not a number", self.message))?;
            Message::from_value(value)?
        } else {
            Message::parse_bits(&self.message)?
        };
        Ok(message)
    }

    fn config(&self) -> SchemeConfig {
        SchemeConfig::for_crossover(self.crossover)
            .with_target_error(self.target_error)
            .with_max_rounds(self.max_rounds)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pms { run } => run_pms(run)?,
        Commands::Mpms {
            run,
            block_length,
            estimator,
            error_positions,
        } => run_mpms(run, block_length, estimator, error_positions)?,
        Commands::Hamming { message, flip } => run_hamming(&message, &flip)?,
        Commands::Capacity {
            crossover,
            block_length,
            estimator,
        } => run_capacity(crossover, block_length, estimator)?,
    }

    Ok(())
}

fn run_pms(run: RunArgs) -> Result<()> {
    let message = run.message()?;
    let scheme = PosteriorMatchingScheme::with_config(run.config())
        .context("failed to configure posterior matching scheme")?;
    let results = (run.seed..run.seed + run.trials)
        .map(|seed| {
            scheme
                .transmit_seeded(&message, seed)
                .with_context(|| format!("transmission failed for seed {seed}"))
        })
        .collect::<Result<Vec<_>>>()?;
    report(&message, &results);
    Ok(())
}

fn run_mpms(
    run: RunArgs,
    block_length: usize,
    estimator: EstimatorKind,
    error_positions: Option<usize>,
) -> Result<()> {
    let message = run.message()?;
    let mut config = run
        .config()
        .with_block_length(block_length)
        .with_estimator(estimator);
    if let Some(count) = error_positions {
        config = config.with_error_positions(count);
    }
    let scheme = CodedPosteriorMatchingScheme::with_config(config)
        .context("failed to configure coded posterior matching scheme")?;
    println!(
        "code=({}, {})\testimator={}\trho={:.6}",
        scheme.code().block_len(),
        scheme.code().message_len(),
        scheme.estimator_name(),
        scheme.block_error_probability()
    );
    let results = (run.seed..run.seed + run.trials)
        .map(|seed| {
            scheme
                .transmit_seeded(&message, seed)
                .with_context(|| format!("transmission failed for seed {seed}"))
        })
        .collect::<Result<Vec<_>>>()?;
    report(&message, &results);
    Ok(())
}

fn report(message: &Message, results: &[Transmission]) {
    let expected = match message {
        Message::Bits(bits) => Some(bit_string(bits)),
        Message::Value(_) => None,
    };
    let message_bits = message.bit_len().unwrap_or_default();

    for (trial, result) in results.iter().enumerate() {
        println!(
            "trial {}\tdecoded={}\testimate={:.12}\trounds={}\tchannel_uses={}\trate={:.4}\tstatus={:?}",
            trial + 1,
            result.decoded_string(),
            result.estimate,
            result.rounds,
            result.channel_uses(),
            result.rate(message_bits),
            result.status
        );
    }

    if results.len() > 1 {
        let correct = results
            .iter()
            .filter(|r| expected.as_deref().map_or(r.converged(), |e| r.decoded_string() == e))
            .count();
        let mean_uses =
            results.iter().map(|r| r.channel_uses()).sum::<usize>() as f64 / results.len() as f64;
        println!(
            "summary\tcorrect={}/{}\tmean_channel_uses={:.2}",
            correct,
            results.len(),
            mean_uses
        );
    }
}

fn run_hamming(message: &str, flips: &[usize]) -> Result<()> {
    let bits = message
        .trim()
        .chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => bail!("'{other}' is not a binary digit"),
        })
        .collect::<Result<bitvec::vec::BitVec>>()?;
    let code = HammingCode::new(bits.len()).context("failed to build Hamming code")?;
    let codeword = code.encode(&bits)?;
    let mut received = codeword.clone();
    for &position in flips {
        if position == 0 || position > received.len() {
            bail!(
                "flip position {position} outside 1..={}",
                received.len()
            );
        }
        let bit = !received[position - 1];
        received.set(position - 1, bit);
    }

    println!(
        "n={}\tk={}\tr={}",
        code.block_len(),
        code.message_len(),
        redundant_bits(code.message_len())
    );
    println!("codeword={}", bit_string(&codeword));
    println!("received={}", bit_string(&received));
    println!("syndrome={}", code.syndrome(&received));
    match code.correct(&received)? {
        Correction::Clean(decoded) => println!("clean\tdecoded={}", bit_string(&decoded)),
        Correction::Corrected { position, message } => println!(
            "corrected position {position}\tdecoded={}",
            bit_string(&message)
        ),
        Correction::Uncorrectable { syndrome } => {
            println!("uncorrectable\tsyndrome {syndrome} exceeds block length")
        }
    }
    Ok(())
}

fn run_capacity(crossover: f64, block_length: usize, estimator: EstimatorKind) -> Result<()> {
    if !(0.0..=1.0).contains(&crossover) {
        bail!("crossover probability {crossover} outside [0, 1]");
    }
    let code = HammingCode::new(block_length).context("failed to build Hamming code")?;
    let rho = estimator
        .build()
        .block_error_probability(crossover, &code);
    println!("bsc_capacity={:.6}", bsc_capacity(crossover));
    println!(
        "coded_capacity={:.6}\tcode=({}, {})\trho={:.6}",
        coded_capacity(code.block_len(), code.message_len(), rho),
        code.block_len(),
        code.message_len(),
        rho
    );
    Ok(())
}
