//! Synthetic tournaments and round-by-round simulation.
//!
//! A [`Simulation`] draws a round, allocates adjudicators to it and then
//! makes up results, so that later rounds have standings and history to
//! work from. This is what the `simulaterounds` binary and the end-to-end
//! tests drive.

use std::collections::HashSet;

use rand::{Rng, SeedableRng, distr::Uniform};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use uuid::Builder;

use crate::{
    config::{ConfigError, TournamentConfig},
    tournaments::{
        Tournament,
        config::{DrawType, SideAllocations},
        conflicts::ConflictRecords,
        participants::{Adjudicator, Institution, Room},
        rounds::{
            Round,
            allocations::{
                AdjudicatorAllocation, AllocationError, AllocationInput,
                allocate_round,
            },
            draws::{
                DebateRecord, DrawStatus,
                drawalgs::{DrawInput, MakeDrawError, generate_draw},
            },
            side_names::Side,
        },
        teams::{Team, TeamStanding},
    },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticOptions {
    pub teams: usize,
    pub adjudicators: usize,
    pub institutions: usize,
    /// Zero means no divisions.
    pub divisions: usize,
    /// Chance that any given adjudicator clashes with any given team.
    pub conflict_rate: f64,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            teams: 16,
            adjudicators: 24,
            institutions: 6,
            divisions: 0,
            conflict_rate: 0.05,
        }
    }
}

fn next_id(rng: &mut impl Rng) -> String {
    Builder::from_random_bytes(rng.random()).into_uuid().to_string()
}

/// Makes up a tournament with no rounds. Teams and adjudicators are spread
/// evenly across institutions, and there is one room more than a round with
/// every team present needs.
#[tracing::instrument(skip(rng))]
pub fn synthetic_tournament(
    name: &str,
    options: &SyntheticOptions,
    rng: &mut ChaCha20Rng,
) -> Result<Tournament, ConfigError> {
    if options.institutions == 0 {
        return Err(ConfigError::Invalid(
            "a synthetic tournament needs at least one institution".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&options.conflict_rate) {
        return Err(ConfigError::Invalid(format!(
            "conflict_rate must be between 0 and 1 (got {})",
            options.conflict_rate
        )));
    }

    let institutions = (0..options.institutions)
        .map(|i| Institution {
            id: next_id(rng),
            name: format!("Institution {}", i + 1),
            code: format!("I{}", i + 1),
        })
        .collect::<Vec<_>>();

    let teams = (0..options.teams)
        .map(|i| Team {
            id: next_id(rng),
            name: format!("Team {}", i + 1),
            institution_id: Some(
                institutions[i % institutions.len()].id.clone(),
            ),
            kind: Default::default(),
            division: (options.divisions > 0)
                .then(|| format!("D{}", i % options.divisions + 1)),
        })
        .collect::<Vec<_>>();

    let scores = Uniform::new_inclusive(1.0f64, 5.0f64)
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let adjudicators = (0..options.adjudicators)
        .map(|i| Adjudicator {
            id: next_id(rng),
            name: format!("Adjudicator {}", i + 1),
            institution_id: Some(
                institutions[i % institutions.len()].id.clone(),
            ),
            // one decimal place, like a tab director would enter
            score: (rng.sample(&scores) * 10.0).round() / 10.0,
            accredited: true,
        })
        .collect::<Vec<_>>();

    let mut conflicts = ConflictRecords::default();
    for adj in &adjudicators {
        for team in &teams {
            if rng.random_bool(options.conflict_rate) {
                conflicts.adj_team.push((adj.id.clone(), team.id.clone()));
            }
        }
    }

    let rooms = (0..options.teams / 2 + 1)
        .map(|i| Room {
            id: next_id(rng),
            name: format!("Room {}", i + 1),
        })
        .collect();

    Ok(Tournament {
        name: name.to_string(),
        institutions,
        teams,
        adjudicators,
        rooms,
        conflicts,
        rounds: Vec::new(),
        debates: Vec::new(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("could not draw round {round}: {source}")]
    Draw {
        round: u32,
        #[source]
        source: MakeDrawError,
    },
    #[error("could not allocate adjudicators to round {round}: {source}")]
    Allocation {
        round: u32,
        #[source]
        source: AllocationError,
    },
}

/// Everything that happened in one simulated round.
#[derive(Debug, Clone)]
pub struct SimulatedRound {
    pub round: Round,
    /// The debates as they were recorded, results included.
    pub debates: Vec<DebateRecord>,
    pub allocations: Vec<AdjudicatorAllocation>,
    pub bypassing: Vec<TeamStanding>,
    /// Draw warnings followed by allocation warnings.
    pub warnings: Vec<String>,
}

pub struct Simulation {
    pub tournament: Tournament,
    pub config: TournamentConfig,
    rng: ChaCha20Rng,
}

impl Simulation {
    pub fn new(
        tournament: Tournament,
        config: TournamentConfig,
        rng: ChaCha20Rng,
    ) -> Self {
        Self {
            tournament,
            config,
            rng,
        }
    }

    /// Each engine gets its own generator so that adding a random choice to
    /// one doesn't change what the other does.
    fn fork_rng(&mut self) -> ChaCha20Rng {
        ChaCha20Rng::from_rng(&mut self.rng)
    }

    fn new_round(&self, draw_type: DrawType) -> Round {
        let seq = self.tournament.next_round_seq();
        let mut round = Round::new(seq, draw_type);
        if self.config.draw.side_allocations == SideAllocations::Preallocated {
            for (i, team) in self.tournament.teams.iter().enumerate() {
                let side = if (i + seq as usize) % 2 == 0 {
                    Side::Aff
                } else {
                    Side::Neg
                };
                round.allocated_sides.insert(team.id.clone(), side);
            }
        }
        round
    }

    #[tracing::instrument(skip(self))]
    pub fn run_round(
        &mut self,
        draw_type: DrawType,
    ) -> Result<SimulatedRound, SimulationError> {
        let mut round = self.new_round(draw_type);
        let seq = round.seq;

        let rng = self.fork_rng();
        let input = DrawInput::from_tournament(
            &self.tournament,
            &round,
            &self.config,
            rng,
        );
        let draw = generate_draw(input)
            .map_err(|source| SimulationError::Draw { round: seq, source })?;

        let records = draw
            .pairings
            .iter()
            .enumerate()
            .map(|(i, pairing)| DebateRecord {
                id: format!("{seq}-{}", i + 1),
                round_seq: seq,
                team_ids: [
                    pairing.aff().id().to_string(),
                    pairing.neg().id().to_string(),
                ],
                bye: pairing.is_bye(),
                bracket: pairing.bracket,
                room_rank: pairing.room_rank,
                winner: None,
                scores: None,
                team_flags: pairing.team_flags.clone(),
                adjudicator_ids: Vec::new(),
            })
            .collect::<Vec<_>>();

        round.draw_status = DrawStatus::Confirmed;
        self.tournament.rounds.push(round.clone());
        self.tournament.debates.extend(records);

        let mut warnings = draw.warnings;
        let mut allocations = Vec::new();
        if !self.tournament.adjudicators.is_empty() {
            let rng = self.fork_rng();
            let input = AllocationInput::from_tournament(
                &self.tournament,
                seq,
                &self.config,
                rng,
            );
            let outcome = allocate_round(&round, input).map_err(|source| {
                SimulationError::Allocation { round: seq, source }
            })?;
            for allocation in &outcome.allocations {
                if let Some(record) = self
                    .tournament
                    .debates
                    .iter_mut()
                    .find(|record| record.id == allocation.debate_id)
                {
                    record.adjudicator_ids =
                        allocation.all().map(|adj| adj.id.clone()).collect();
                }
            }
            warnings.extend(outcome.warnings);
            allocations = outcome.allocations;
        }

        self.record_results(seq);
        round.draw_status = DrawStatus::Released;
        if let Some(stored) = self.tournament.round_mut(seq) {
            stored.draw_status = DrawStatus::Released;
        }

        let debates = self
            .tournament
            .debates_in_round(seq)
            .cloned()
            .collect::<Vec<_>>();
        tracing::info!(
            debates = debates.len(),
            warnings = warnings.len(),
            "simulated round"
        );

        Ok(SimulatedRound {
            round,
            debates,
            allocations,
            bypassing: draw.bypassing,
            warnings,
        })
    }

    pub fn run_rounds(
        &mut self,
        draw_types: &[DrawType],
    ) -> Result<Vec<SimulatedRound>, SimulationError> {
        draw_types
            .iter()
            .map(|&draw_type| self.run_round(draw_type))
            .collect()
    }

    /// Team totals are between 140 and 160 and never tied. A team facing
    /// a bye wins without scores.
    fn record_results(&mut self, seq: u32) {
        let mut rng = self.fork_rng();
        let teams = self
            .tournament
            .teams
            .iter()
            .filter(|team| !team.is_bye())
            .map(|team| team.id.clone())
            .collect::<HashSet<_>>();

        for record in &mut self.tournament.debates {
            if record.round_seq != seq {
                continue;
            }
            let bye_side =
                record.team_ids.iter().position(|id| !teams.contains(id));
            if let Some(bye) = bye_side {
                record.winner =
                    Some(if bye == 0 { Side::Neg } else { Side::Aff });
                continue;
            }

            let mut scores = [
                rng.random_range(140u32..=160),
                rng.random_range(140u32..=160),
            ];
            if scores[0] == scores[1] {
                scores[usize::from(rng.random_bool(0.5))] += 1;
            }
            record.winner = Some(if scores[0] > scores[1] {
                Side::Aff
            } else {
                Side::Neg
            });
            record.scores = Some(scores.map(f64::from));
        }
    }
}
