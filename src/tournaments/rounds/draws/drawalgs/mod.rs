//! Draw generation for two-team formats.
//!
//! [`generate_draw`] dispatches on the round's draw type. Every generator
//! returns an ordered list of [`Pairing`]s; conflicts which could not be
//! avoided are kept (and reported as warnings) rather than failing the draw.

use std::collections::HashMap;

use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::{
    config::{DrawOptions, TournamentConfig},
    tournaments::{
        Tournament,
        config::{DrawType, SideAllocations},
        conflicts::ConflictsInfo,
        rounds::{
            Round,
            draws::{DrawStatus, Pairing, PairingFlag},
            side_names::Side,
        },
        standings::compute::{TournamentTeamStandings, history::HistoryInfo},
        teams::TeamStanding,
    },
};

pub mod elimination;
pub mod graph;
pub mod one_up_one_down;
pub mod power_paired;
pub mod random;
pub mod round_robin;

/// The error messages will be shown to tab directors, and therefore should be
/// readable.
#[derive(Debug, thiserror::Error)]
pub enum MakeDrawError {
    #[error("{0}")]
    InvalidConfiguration(String),
    #[error("{0}")]
    InvalidTeamCount(String),
    #[error(
        "there are {debates} debates in the draw but only {venues} rooms are \
         available"
    )]
    InsufficientVenues { debates: usize, venues: usize },
    #[error("{0}")]
    OddBracket(String),
    #[error("{0}")]
    SideAllocation(String),
    #[error("{0}")]
    Elimination(String),
    #[error("round {0} already has a draw ({1})")]
    DrawAlreadyExists(u32, DrawStatus),
}

/// The winner of one debate in the previous elimination round.
#[derive(Debug, Clone)]
pub struct ResultPairing {
    pub room_rank: usize,
    pub winner: Option<TeamStanding>,
}

pub struct DrawInput {
    pub round: Round,
    /// Teams available for the draw, ranked (best first) for power-paired
    /// and elimination draws.
    pub teams: Vec<TeamStanding>,
    pub options: DrawOptions,
    pub conflicts: ConflictsInfo,
    pub history: HistoryInfo,
    /// Number of rooms available; `None` skips the check.
    pub rooms: Option<usize>,
    /// Subsequent elimination rounds only: the previous elimination round.
    pub results: Vec<ResultPairing>,
    /// Round robin only: how many round robin rounds have been drawn,
    /// counting this one.
    pub rr_seq: u32,
    pub rng: ChaCha20Rng,
}

impl DrawInput {
    /// Gathers everything a draw for `round` needs from the tournament.
    pub fn from_tournament(
        tournament: &Tournament,
        round: &Round,
        config: &TournamentConfig,
        rng: ChaCha20Rng,
    ) -> Self {
        let standings = TournamentTeamStandings::compute(tournament, round.seq);
        let mut teams = standings.sorted;
        for team in &mut teams {
            team.allocated_side = round.allocated_sides.get(team.id()).copied();
        }

        let results = if round.draw_type == DrawType::Elimination {
            let previous = round.seq.saturating_sub(1);
            let mut results = tournament
                .debates_in_round(previous)
                .map(|debate| ResultPairing {
                    room_rank: debate.room_rank,
                    winner: debate.winner.and_then(|side| {
                        let id = &debate.team_ids[side.index()];
                        teams.iter().find(|team| team.id() == id).cloned()
                    }),
                })
                .collect::<Vec<_>>();
            results.sort_by_key(|result| result.room_rank);
            results
        } else {
            Vec::new()
        };

        let rr_seq = tournament
            .rounds
            .iter()
            .filter(|r| {
                r.draw_type == DrawType::RoundRobin && r.seq < round.seq
            })
            .count() as u32
            + 1;

        Self {
            round: round.clone(),
            teams,
            options: config.draw.clone(),
            conflicts: ConflictsInfo::from_tournament(tournament, false),
            history: HistoryInfo::compute(&tournament.debates, round.seq),
            rooms: (!tournament.rooms.is_empty())
                .then_some(tournament.rooms.len()),
            results,
            rr_seq,
            rng,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Draw {
    pub pairings: Vec<Pairing>,
    /// Teams which skip this round (partial elimination rounds).
    pub bypassing: Vec<TeamStanding>,
    pub warnings: Vec<String>,
}

/// State shared by the generators while a draw is being made.
pub(crate) struct DrawContext<'a> {
    pub options: &'a DrawOptions,
    pub conflicts: &'a ConflictsInfo,
    pub history: &'a HistoryInfo,
    pub rng: &'a mut ChaCha20Rng,
    team_flags: HashMap<String, Vec<PairingFlag>>,
}

impl<'a> DrawContext<'a> {
    pub fn new(
        options: &'a DrawOptions,
        conflicts: &'a ConflictsInfo,
        history: &'a HistoryInfo,
        rng: &'a mut ChaCha20Rng,
    ) -> Self {
        Self {
            options,
            conflicts,
            history,
            rng,
            team_flags: HashMap::new(),
        }
    }

    /// Number of times the teams have met. Byes never conflict.
    pub fn conflict_hist(&self, a: &TeamStanding, b: &TeamStanding) -> u32 {
        if a.is_bye() || b.is_bye() {
            return 0;
        }
        self.history.teams_met(a.id(), b.id())
    }

    pub fn conflict_inst(&self, a: &TeamStanding, b: &TeamStanding) -> bool {
        if a.is_bye() || b.is_bye() {
            return false;
        }
        self.conflicts.same_institution(a.id(), b.id())
    }

    /// Weighted conflict intensity of the given pairings, counting only the
    /// kinds of conflict the options ask us to avoid.
    pub fn badness<'p>(
        &self,
        pairings: impl IntoIterator<Item = &'p Pairing>,
    ) -> f64 {
        pairings
            .into_iter()
            .map(|p| {
                let [a, b] = &p.teams;
                let mut score = 0.0;
                if self.options.avoid_history && self.conflict_hist(a, b) > 0 {
                    score += self.options.history_penalty;
                }
                if self.options.avoid_institution && self.conflict_inst(a, b) {
                    score += self.options.institution_penalty;
                }
                score
            })
            .sum()
    }

    /// Flags added this way follow the team around and are attached to
    /// whichever pairing it ends up in by [`Self::annotate_team_flags`].
    pub fn add_team_flag(&mut self, team: &TeamStanding, flag: PairingFlag) {
        self.team_flags
            .entry(team.id().to_string())
            .or_default()
            .push(flag);
    }

    pub fn annotate_team_flags(&self, pairings: &mut [Pairing]) {
        for pairing in pairings {
            for i in 0..2 {
                if let Some(flags) = self.team_flags.get(pairing.teams[i].id()) {
                    pairing.team_flags[i].extend(flags.iter().copied());
                }
            }
        }
    }

    pub fn allocate_sides(&mut self, pairings: &mut [Pairing]) {
        match self.options.side_allocations {
            SideAllocations::Balance | SideAllocations::ManualBallot => {
                for pairing in pairings {
                    self.balance_sides(pairing);
                }
            }
            SideAllocations::Random => {
                for pairing in pairings {
                    if !pairing.is_bye() && self.rng.random_bool(0.5) {
                        pairing.swap_sides();
                    }
                }
            }
            SideAllocations::Preallocated => (),
        }
    }

    /// Puts whichever team has the bigger (aff - neg) difference on the
    /// negative, or chooses randomly if the differences are the same. Byes
    /// always go on the negative.
    fn balance_sides(&mut self, pairing: &mut Pairing) {
        if pairing.teams[0].is_bye() {
            pairing.swap_sides();
            return;
        }
        if pairing.teams[1].is_bye() {
            return;
        }

        let imbalance = |team: &TeamStanding| {
            i64::from(team.aff_count) - i64::from(team.neg_count)
        };
        let aff = imbalance(&pairing.teams[0]);
        let neg = imbalance(&pairing.teams[1]);

        if neg < aff || (aff == neg && self.rng.random_bool(0.5)) {
            pairing.swap_sides();
        }
    }
}

/// Removes the team that has to sit out an odd-sized draw and returns a
/// pairing of that team against a bye. For ranked draws this is the
/// lowest-ranked team; for unranked draws a random one.
pub(crate) fn take_bye(
    teams: &mut Vec<TeamStanding>,
    ranked: bool,
    rng: &mut ChaCha20Rng,
) -> Option<Pairing> {
    if teams.len() % 2 == 0 {
        return None;
    }
    let idx = if ranked {
        teams.len() - 1
    } else {
        rng.random_range(0..teams.len())
    };
    let team = teams.remove(idx);
    tracing::debug!(team = team.id(), "team receives the bye");
    let bracket = team.points;
    let division = team.team.division.clone();
    let mut pairing =
        Pairing::new(team, TeamStanding::bye(division.clone()), bracket, 0);
    pairing.division = division;
    Some(pairing)
}

pub(crate) fn check_allocated_sides(
    teams: &[TeamStanding],
) -> Result<(), MakeDrawError> {
    let missing = teams.iter().filter(|t| t.allocated_side.is_none()).count();
    if missing > 0 {
        return Err(MakeDrawError::SideAllocation(format!(
            "{missing} out of {} teams have no allocated side",
            teams.len()
        )));
    }
    let affs = teams
        .iter()
        .filter(|t| t.allocated_side == Some(Side::Aff))
        .count();
    let negs = teams.len() - affs;
    if affs != negs {
        return Err(MakeDrawError::SideAllocation(format!(
            "there were {affs} affirmative teams but {negs} negative teams"
        )));
    }
    Ok(())
}

/// Generates the draw for `input.round`.
///
/// Fails if the round already has a draw, if the teams or options cannot
/// produce a valid draw, or if there are more debates than rooms.
#[tracing::instrument(
    skip_all,
    fields(
        round = input.round.seq,
        draw_type = %input.round.draw_type,
        teams = input.teams.len(),
    )
)]
pub fn generate_draw(mut input: DrawInput) -> Result<Draw, MakeDrawError> {
    if input.round.draw_status != DrawStatus::None {
        return Err(MakeDrawError::DrawAlreadyExists(
            input.round.seq,
            input.round.draw_status,
        ));
    }

    let mut bypassing = Vec::new();
    let pairings = match input.round.draw_type {
        DrawType::Manual => Vec::new(),
        DrawType::Random => random::make_draw(&mut input)?,
        DrawType::PowerPaired => power_paired::make_draw(&mut input)?,
        DrawType::RoundRobin => round_robin::make_draw(&mut input)?,
        DrawType::FirstElimination => {
            let (pairings, bypass) = elimination::make_first_draw(&mut input)?;
            bypassing = bypass;
            pairings
        }
        DrawType::Elimination => elimination::make_subsequent_draw(&mut input)?,
    };

    if let Some(venues) = input.rooms
        && pairings.len() > venues
    {
        return Err(MakeDrawError::InsufficientVenues {
            debates: pairings.len(),
            venues,
        });
    }

    let warnings = collect_warnings(&input, &pairings);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(debates = pairings.len(), "generated draw");

    Ok(Draw {
        pairings,
        bypassing,
        warnings,
    })
}

fn collect_warnings(input: &DrawInput, pairings: &[Pairing]) -> Vec<String> {
    let mut warnings = Vec::new();
    let is_elimination = matches!(
        input.round.draw_type,
        DrawType::FirstElimination | DrawType::Elimination
    );

    for pairing in pairings {
        if pairing.is_bye() {
            continue;
        }
        let [aff, neg] = &pairing.teams;
        if !is_elimination {
            let met = if aff.is_bye() || neg.is_bye() {
                0
            } else {
                input.history.teams_met(aff.id(), neg.id())
            };
            if input.options.avoid_history && met > 0 {
                warnings.push(format!(
                    "{} and {} have already met {met} time(s)",
                    aff.team.name, neg.team.name
                ));
            }
            if input.options.avoid_institution
                && input.conflicts.same_institution(aff.id(), neg.id())
            {
                warnings.push(format!(
                    "{} and {} are from the same institution",
                    aff.team.name, neg.team.name
                ));
            }
        }
        for flag in pairing.all_flags() {
            if matches!(
                flag,
                PairingFlag::MaxSwapped | PairingFlag::NoBubbleUpDown
            ) {
                warnings.push(format!("{pairing}: {flag}"));
            }
        }
    }

    warnings
}


#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::{test_support::*, *};

    #[test]
    fn drawing_twice_is_rejected() {
        let teams = (0..4).map(|i| standing(&format!("t{i}"), 0.0)).collect();
        let mut input = input(DrawType::Random, teams, DrawOptions::default());
        input.round.draw_status = DrawStatus::Draft;

        assert!(matches!(
            generate_draw(input),
            Err(MakeDrawError::DrawAlreadyExists(2, DrawStatus::Draft))
        ));
    }

    #[test]
    fn too_few_rooms_is_an_error() {
        let teams = (0..6).map(|i| standing(&format!("t{i}"), 0.0)).collect();
        let mut input = input(DrawType::Random, teams, DrawOptions::default());
        input.rooms = Some(2);

        assert!(matches!(
            generate_draw(input),
            Err(MakeDrawError::InsufficientVenues {
                debates: 3,
                venues: 2
            })
        ));
    }

    #[test]
    fn manual_draws_are_empty() {
        let teams = (0..4).map(|i| standing(&format!("t{i}"), 0.0)).collect();
        let draw = generate_draw(input(
            DrawType::Manual,
            teams,
            DrawOptions::default(),
        ))
        .unwrap();
        assert!(draw.pairings.is_empty());
    }

    #[test]
    fn balancing_puts_the_team_with_more_affs_on_neg() {
        let options = DrawOptions::default();
        let conflicts = ConflictsInfo::default();
        let history = HistoryInfo::default();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut ctx = DrawContext::new(&options, &conflicts, &history, &mut rng);

        let mut a = standing("a", 1.0);
        a.aff_count = 2;
        let mut b = standing("b", 1.0);
        b.aff_count = 1;
        b.neg_count = 1;

        let mut pairings = vec![Pairing::new(a, b, 1.0, 1)];
        ctx.allocate_sides(&mut pairings);
        assert_eq!(pairings[0].aff().id(), "b");
        assert_eq!(pairings[0].neg().id(), "a");
    }
}
