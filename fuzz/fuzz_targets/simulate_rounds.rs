//! Runs a short made-up tournament with arbitrary sizes and settings. Draw
//! and allocation errors are fine; panics and malformed rounds are not.

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tabroom::{
    config::TournamentConfig,
    tournaments::{
        config::{AllocationMethod, DrawType},
        rounds::allocations::validate_allocations,
    },
    workloads::{Simulation, SyntheticOptions, synthetic_tournament},
};

#[derive(Arbitrary, Debug)]
struct Workload {
    teams: u8,
    adjudicators: u8,
    institutions: u8,
    conflict_rate: u8,
    prelims: u8,
    elims: u8,
    method: u8,
    seed: u64,
}

fuzz_target!(|data: Workload| {
    let options = SyntheticOptions {
        teams: usize::from(data.teams % 40) + 2,
        adjudicators: usize::from(data.adjudicators % 80),
        institutions: usize::from(data.institutions % 10) + 1,
        divisions: 0,
        conflict_rate: f64::from(data.conflict_rate) / 255.0,
    };
    let mut rng = ChaCha20Rng::seed_from_u64(data.seed);
    let Ok(tournament) = synthetic_tournament("fuzz", &options, &mut rng)
    else {
        return;
    };

    let mut config = TournamentConfig::default();
    config.adjudication.method = match data.method % 3 {
        0 => AllocationMethod::Stab,
        1 => AllocationMethod::Hungarian,
        _ => AllocationMethod::Anneal,
    };
    config.anneal.steps = 50;

    let draw_types = (0..data.prelims % 5)
        .map(|i| {
            if i == 0 {
                DrawType::Random
            } else {
                DrawType::PowerPaired
            }
        })
        .chain((0..data.elims % 3).map(|i| {
            if i == 0 {
                DrawType::FirstElimination
            } else {
                DrawType::Elimination
            }
        }));

    let mut simulation = Simulation::new(tournament, config, rng);
    for draw_type in draw_types {
        let Ok(round) = simulation.run_round(draw_type) else {
            return;
        };

        let mut seen = HashSet::new();
        for debate in &round.debates {
            for team in &debate.team_ids {
                assert!(
                    team.starts_with("bye") || seen.insert(team.clone()),
                    "{team} debates twice in round {}",
                    round.round.seq
                );
            }
        }
        assert!(validate_allocations(&round.allocations).is_ok());
    }
});
