//! Runs whole tournaments through the draw and allocation engines.

use std::collections::{HashMap, HashSet};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tabroom::{
    config::TournamentConfig,
    tournaments::{
        Tournament,
        config::{AllocationMethod, DrawType},
        rounds::{
            allocations::validate_allocations, draws::DrawStatus,
            side_names::Side,
        },
    },
    workloads::{
        SimulatedRound, Simulation, SimulationError, SyntheticOptions,
        synthetic_tournament,
    },
};

fn tournament(seed: u64, options: &SyntheticOptions) -> Tournament {
    synthetic_tournament(
        "simulation",
        options,
        &mut ChaCha20Rng::seed_from_u64(seed),
    )
    .unwrap()
}

fn assert_well_formed(tournament: &Tournament, round: &SimulatedRound) {
    let mut seen = HashSet::new();
    for debate in &round.debates {
        for team in &debate.team_ids {
            if tournament.team(team).is_some() {
                assert!(seen.insert(team.clone()), "{team} debates twice");
            }
        }
        assert!(debate.winner.is_some(), "{} has no result", debate.id);
    }
    for team in &round.bypassing {
        assert!(seen.insert(team.id().to_string()));
    }
    validate_allocations(&round.allocations).unwrap();
}

#[test]
fn prelims_then_a_partial_break() {
    let mut config = TournamentConfig::default();
    config.draw.break_size = 6;
    let mut simulation = Simulation::new(
        tournament(3, &SyntheticOptions::default()),
        config,
        ChaCha20Rng::seed_from_u64(11),
    );

    let prelims = simulation
        .run_rounds(&[
            DrawType::Random,
            DrawType::PowerPaired,
            DrawType::PowerPaired,
            DrawType::PowerPaired,
        ])
        .unwrap();
    for round in &prelims {
        assert_eq!(round.debates.len(), 8);
        assert_eq!(round.allocations.len(), 8);
        assert_well_formed(&simulation.tournament, round);
    }
    // every prelim debate has a chair
    for round in &prelims {
        assert!(round.allocations.iter().all(|a| a.has_chair()));
    }

    let first = simulation.run_round(DrawType::FirstElimination).unwrap();
    assert_eq!(first.debates.len(), 2);
    assert_eq!(first.bypassing.len(), 2);
    assert_eq!(
        first.debates.iter().map(|d| d.room_rank).collect::<Vec<_>>(),
        vec![3, 4]
    );
    assert_well_formed(&simulation.tournament, &first);

    let semis = simulation.run_round(DrawType::Elimination).unwrap();
    assert_eq!(semis.debates.len(), 2);
    assert_well_formed(&simulation.tournament, &semis);
    let semi_teams = semis
        .debates
        .iter()
        .flat_map(|d| d.team_ids.iter().cloned())
        .collect::<HashSet<_>>();
    for team in &first.bypassing {
        assert!(semi_teams.contains(team.id()));
    }

    let grand_final = simulation.run_round(DrawType::Elimination).unwrap();
    assert_eq!(grand_final.debates.len(), 1);
    let winners = simulation.tournament.winners_of_round(semis.round.seq);
    let finalists = grand_final.debates[0]
        .team_ids
        .iter()
        .cloned()
        .collect::<HashSet<_>>();
    assert_eq!(finalists, winners.into_iter().collect());

    assert!(
        simulation
            .tournament
            .rounds
            .iter()
            .all(|round| round.draw_status == DrawStatus::Released)
    );
}

#[test]
fn the_team_which_affirmed_more_goes_negative() {
    let mut simulation = Simulation::new(
        tournament(5, &SyntheticOptions::default()),
        TournamentConfig::default(),
        ChaCha20Rng::seed_from_u64(5),
    );
    let rounds = simulation
        .run_rounds(&[
            DrawType::Random,
            DrawType::PowerPaired,
            DrawType::PowerPaired,
            DrawType::PowerPaired,
        ])
        .unwrap();

    let mut imbalance = HashMap::<String, i64>::new();
    for round in &rounds {
        for debate in &round.debates {
            let aff = &debate.team_ids[Side::Aff.index()];
            let neg = &debate.team_ids[Side::Neg.index()];
            assert!(
                imbalance.get(aff).copied().unwrap_or(0)
                    <= imbalance.get(neg).copied().unwrap_or(0),
                "{aff} should have been on the negative in {}",
                debate.id
            );
        }
        for debate in &round.debates {
            let [aff, neg] = &debate.team_ids;
            *imbalance.entry(aff.clone()).or_default() += 1;
            *imbalance.entry(neg.clone()).or_default() -= 1;
        }
    }
}

#[test]
fn round_robin_meets_every_opponent_once() {
    let options = SyntheticOptions {
        teams: 6,
        adjudicators: 9,
        divisions: 1,
        ..Default::default()
    };
    let mut simulation = Simulation::new(
        tournament(9, &options),
        TournamentConfig::default(),
        ChaCha20Rng::seed_from_u64(9),
    );
    simulation.run_rounds(&[DrawType::RoundRobin; 5]).unwrap();

    let mut met = HashSet::new();
    for debate in &simulation.tournament.debates {
        let mut pair = debate.team_ids.clone();
        pair.sort();
        assert!(met.insert(pair), "a pair of teams met twice");
    }
    assert_eq!(met.len(), 15);
}

fn graded_adjudicators(tournament: &mut Tournament) {
    for (i, adj) in tournament.adjudicators.iter_mut().enumerate() {
        adj.score = [4.6, 3.8, 3.0, 2.0][i % 4];
    }
}

#[test]
fn every_allocation_method_completes_a_round() {
    for method in [
        AllocationMethod::Stab,
        AllocationMethod::Hungarian,
        AllocationMethod::Anneal,
    ] {
        let mut tournament = tournament(13, &SyntheticOptions::default());
        graded_adjudicators(&mut tournament);
        let mut config = TournamentConfig::default();
        config.adjudication.method = method;

        let mut simulation =
            Simulation::new(tournament, config, ChaCha20Rng::seed_from_u64(1));
        let rounds = simulation
            .run_rounds(&[DrawType::Random, DrawType::PowerPaired])
            .unwrap();
        for round in &rounds {
            assert_eq!(round.allocations.len(), 8, "{method}");
            assert!(
                round.allocations.iter().all(|a| a.valid()),
                "{method} left a debate without a chair"
            );
            let allocated = round
                .allocations
                .iter()
                .map(|a| a.all().count())
                .sum::<usize>();
            assert_eq!(allocated, 24, "{method}");
        }
    }
}

#[test]
fn simulations_are_reproducible() {
    let run = || {
        let mut simulation = Simulation::new(
            tournament(21, &SyntheticOptions::default()),
            TournamentConfig::default(),
            ChaCha20Rng::seed_from_u64(21),
        );
        simulation
            .run_rounds(&[DrawType::Random, DrawType::PowerPaired])
            .unwrap();
        simulation.tournament
    };
    assert_eq!(run(), run());
}

#[test]
fn too_few_rooms_fails_the_draw() {
    let mut tournament = tournament(4, &SyntheticOptions::default());
    tournament.rooms.truncate(3);
    let mut simulation = Simulation::new(
        tournament,
        TournamentConfig::default(),
        ChaCha20Rng::seed_from_u64(4),
    );
    assert!(matches!(
        simulation.run_round(DrawType::Random),
        Err(SimulationError::Draw { round: 1, .. })
    ));
}
