//! Simulates rounds.

use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use tabroom::{
    config::load_config,
    tournaments::{
        Tournament, config::DrawType, participants::Adjudicator,
    },
    workloads::{SimulatedRound, Simulation},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
pub struct Simulate {
    /// Tournament snapshot (JSON), as written by `testdata`.
    snapshot: PathBuf,
    /// Configuration file (TOML). Falls back to `TABROOM_CONFIG`.
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(long, default_value_t = 5)]
    prelims: usize,
    #[clap(long, default_value_t = 0)]
    elims: usize,
    /// Draw the preliminary rounds as a round robin instead of power pairing
    /// after a random first round.
    #[clap(long, action)]
    round_robin: bool,
    #[clap(long)]
    seed: Option<u64>,
    /// Print the draws as CSV.
    #[clap(long, action)]
    csv: bool,
    /// Save the snapshot, with the simulated rounds, here.
    #[clap(long, short)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct DrawRow {
    round: u32,
    room_rank: usize,
    aff: String,
    neg: String,
    chair: String,
    panellists: String,
    trainees: String,
    flags: String,
}

fn draw_types(args: &Simulate) -> Vec<DrawType> {
    let prelims = (0..args.prelims).map(|i| {
        if args.round_robin {
            DrawType::RoundRobin
        } else if i == 0 {
            DrawType::Random
        } else {
            DrawType::PowerPaired
        }
    });
    let elims = (0..args.elims).map(|i| {
        if i == 0 {
            DrawType::FirstElimination
        } else {
            DrawType::Elimination
        }
    });
    prelims.chain(elims).collect()
}

fn names(adjudicators: &[Adjudicator]) -> String {
    adjudicators.iter().map(|adj| &adj.name).join("; ")
}

fn draw_rows(tournament: &Tournament, round: &SimulatedRound) -> Vec<DrawRow> {
    let team_name = |id: &str| {
        tournament
            .team(id)
            .map(|team| team.name.clone())
            .unwrap_or_else(|| "Bye".to_string())
    };

    round
        .debates
        .iter()
        .map(|debate| {
            let allocation = round
                .allocations
                .iter()
                .find(|allocation| allocation.debate_id == debate.id);
            DrawRow {
                round: round.round.seq,
                room_rank: debate.room_rank,
                aff: team_name(&debate.team_ids[0]),
                neg: team_name(&debate.team_ids[1]),
                chair: allocation
                    .and_then(|a| a.chair.as_ref())
                    .map(|adj| adj.name.clone())
                    .unwrap_or_default(),
                panellists: allocation
                    .map(|a| names(&a.panellists))
                    .unwrap_or_default(),
                trainees: allocation
                    .map(|a| names(&a.trainees))
                    .unwrap_or_default(),
                flags: debate
                    .team_flags
                    .iter()
                    .flatten()
                    .map(|flag| flag.code())
                    .unique()
                    .join(" "),
            }
        })
        .collect()
}

fn print_round(rows: &[DrawRow], round: &SimulatedRound) {
    println!("{} ({})", round.round.name, round.round.draw_type);
    for row in rows {
        let panel = [
            row.chair.as_str(),
            row.panellists.as_str(),
            row.trainees.as_str(),
        ]
        .into_iter()
        .filter(|names| !names.is_empty())
        .join(" | ");
        println!(
            "  {:>3}. {} vs {} [{}] {}",
            row.room_rank, row.aff, row.neg, row.flags, panel
        );
    }
    if !round.bypassing.is_empty() {
        println!(
            "  bypassing: {}",
            round.bypassing.iter().map(|team| &team.team.name).join(", ")
        );
    }
    for warning in &round.warnings {
        println!("  warning: {warning}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Simulate::parse();
    let tournament = Tournament::load_json(&args.snapshot)?;
    let config = load_config(args.config.as_deref())?;
    let rng = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_os_rng(),
    };

    let mut simulation = Simulation::new(tournament, config, rng);
    let mut csv = args
        .csv
        .then(|| csv::Writer::from_writer(std::io::stdout()));

    for draw_type in draw_types(&args) {
        let round = simulation.run_round(draw_type)?;
        let rows = draw_rows(&simulation.tournament, &round);
        match csv.as_mut() {
            Some(writer) => {
                for row in &rows {
                    writer.serialize(row)?;
                }
            }
            None => print_round(&rows, &round),
        }
    }
    if let Some(writer) = csv.as_mut() {
        writer.flush()?;
    }

    if let Some(output) = &args.output {
        simulation.tournament.save_json(output)?;
    }

    Ok(())
}
