//! Creates tournament snapshots, either made up or imported from CSV.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tabroom::{
    tournaments::import::import_csv,
    workloads::{SyntheticOptions, synthetic_tournament},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
pub struct TestData {
    /// Where to write the snapshot (JSON).
    #[clap(long, short, default_value = "tournament.json")]
    output: PathBuf,
    #[clap(long, default_value = "test")]
    name: String,
    #[command(subcommand)]
    source: Source,
}

#[derive(Subcommand)]
pub enum Source {
    /// Make up teams, adjudicators and conflicts.
    Synthetic {
        #[clap(long, default_value_t = 16)]
        teams: usize,
        #[clap(long, default_value_t = 24)]
        adjudicators: usize,
        #[clap(long, default_value_t = 6)]
        institutions: usize,
        #[clap(long, default_value_t = 0)]
        divisions: usize,
        #[clap(long, default_value_t = 0.05)]
        conflict_rate: f64,
        #[clap(long)]
        seed: Option<u64>,
    },
    /// Read Tabbycat-style CSV files.
    Import {
        #[clap(long)]
        teams: PathBuf,
        #[clap(long)]
        adjudicators: PathBuf,
        #[clap(long)]
        rooms: Option<PathBuf>,
    },
}

fn open(path: &Path) -> Result<File, Box<dyn std::error::Error>> {
    File::open(path)
        .map_err(|e| format!("could not open {}: {e}", path.display()).into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = TestData::parse();

    let tournament = match args.source {
        Source::Synthetic {
            teams,
            adjudicators,
            institutions,
            divisions,
            conflict_rate,
            seed,
        } => {
            let mut rng = match seed {
                Some(seed) => ChaCha20Rng::seed_from_u64(seed),
                None => ChaCha20Rng::from_os_rng(),
            };
            let options = SyntheticOptions {
                teams,
                adjudicators,
                institutions,
                divisions,
                conflict_rate,
            };
            synthetic_tournament(&args.name, &options, &mut rng)?
        }
        Source::Import {
            teams,
            adjudicators,
            rooms,
        } => {
            let rooms = rooms.as_deref().map(open).transpose()?;
            import_csv(&args.name, open(&teams)?, open(&adjudicators)?, rooms)?
        }
    };

    tournament.save_json(&args.output)?;
    println!(
        "Wrote {} ({} teams, {} adjudicators, {} rooms)",
        args.output.display(),
        tournament.teams.len(),
        tournament.adjudicators.len(),
        tournament.rooms.len()
    );

    Ok(())
}
