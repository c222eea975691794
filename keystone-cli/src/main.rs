use clap::Parser;
use log::info;
use rand::RngCore;
use std::path::PathBuf;

use keystone_core::{run, Difficulty, RandomiserSettings};

#[derive(Debug, Parser)]
#[command(name = "keystone", version, about = "Seeded, power-gated item placement randomiser")]
struct Args {
    /// Directory containing logic/powers.json and the per-difficulty
    /// item and location files.
    #[arg(long, default_value = ".")]
    data: PathBuf,

    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Placement seed. A random one is chosen when omitted or 0.
    #[arg(long)]
    seed: Option<u64>,

    /// PCG stream id.
    #[arg(long)]
    stream: Option<u64>,

    /// easy, normal, hard, or a tier number (1, 2, 3).
    #[arg(long, default_value = "easy")]
    difficulty: Difficulty,

    #[arg(long, default_value_t = 1)]
    max_attempts: usize,

    /// Also write catalog dumps and a per-step trace.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

/// Seed to run with. Missing or zero draws a fresh one from `entropy`.
fn resolve_seed(seed: Option<u64>, entropy: impl FnOnce() -> u64) -> u64 {
    match seed {
        Some(seed) if seed != 0 => seed,
        _ => entropy() & 0x7FFF_FFFF,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let seed = resolve_seed(args.seed, || rand::thread_rng().next_u64());

    let settings = RandomiserSettings {
        seed,
        stream: args.stream,
        difficulty: args.difficulty,
        max_attempts: args.max_attempts,
        debug: args.debug,
        data_path: args.data,
        output_path: args.output,
    };

    match run(settings) {
        Ok((outcome, folder)) => {
            info!("Wrote {}", folder.display());
            if !outcome.is_complete() {
                eprintln!(
                    "Randomisation stalled after {} attempt(s): {} location(s) left unplaced. Try another seed or raise --max-attempts.",
                    outcome.attempts,
                    outcome.summary.unplaced_locations.len()
                );
                std::process::exit(2);
            }
            println!(
                "Seed {}: placed {} items in {}",
                seed,
                outcome.summary.placements.len(),
                folder.display()
            );
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_or_missing_seed_draws_from_entropy() {
        assert_eq!(resolve_seed(None, || 0xFFFF_FFFF_1234_5678), 0x1234_5678);
        assert_eq!(resolve_seed(Some(0), || 99), 99);
        assert_eq!(resolve_seed(Some(7), || unreachable!()), 7);
    }

    #[test]
    fn parses_flags_into_args() {
        let args = Args::try_parse_from(["keystone", "--seed", "0", "--difficulty", "3"]).unwrap();
        assert_eq!(args.seed, Some(0));
        assert_eq!(args.difficulty, Difficulty::Hard);
        assert_eq!(args.max_attempts, 1);
    }
}
