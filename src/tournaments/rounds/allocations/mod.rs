//! Adjudicator allocation. Every allocator takes the confirmed debates of a
//! round and the available adjudicators, and produces at most one
//! [`AdjudicatorAllocation`] per debate.

use std::collections::HashSet;

use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{AdjudicationConfig, AnnealConfig, TournamentConfig},
    tournaments::{
        Tournament,
        config::AllocationMethod,
        conflicts::ConflictsInfo,
        participants::{Adjudicator, sort_by_score_desc},
        rounds::{
            Round,
            draws::{Debate, DrawStatus},
        },
        standings::compute::{
            TournamentTeamStandings, history::HistoryInfo,
        },
        teams::TeamStanding,
    },
};

pub mod anneal;
pub mod hungarian;
pub mod munkres;
pub mod stab;

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error(
        "adjudicators can only be allocated once the draw has been \
         confirmed (the draw is currently {0})"
    )]
    RoundNotConfirmed(DrawStatus),
    #[error(
        "{needed} adjudicators of rank {rank} or better are needed to fill \
         the panels, but only {available} are available"
    )]
    InsufficientAdjudicators {
        rank: stab::Rank,
        needed: usize,
        available: usize,
    },
    #[error(
        "there are {seats} panel seats to fill but only {panellists} \
         panellists"
    )]
    PanelCapacity { seats: usize, panellists: usize },
    #[error("there are no debates to allocate adjudicators to")]
    NoDebates,
    #[error("there are no adjudicators who can vote")]
    NoVotingAdjudicators,
    #[error("adjudicator {adjudicator} has an invalid score ({score})")]
    InvalidScore { adjudicator: String, score: f64 },
    #[error("adjudicator {0} is allocated to more than one debate")]
    DuplicateAdjudicator(String),
    #[error("the panel in debate {0} has no chair")]
    ChairMissing(String),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    #[serde(rename = "c")]
    Chair,
    /// A chair who is judging alone.
    #[serde(rename = "o")]
    Only,
    #[serde(rename = "p")]
    Panellist,
    #[serde(rename = "t")]
    Trainee,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Position::Chair => "chair",
            Position::Only => "solo chair",
            Position::Panellist => "panellist",
            Position::Trainee => "trainee",
        })
    }
}

/// The adjudicators allocated to one debate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct AdjudicatorAllocation {
    pub debate_id: String,
    pub chair: Option<Adjudicator>,
    pub panellists: Vec<Adjudicator>,
    #[serde(default)]
    pub trainees: Vec<Adjudicator>,
}

impl AdjudicatorAllocation {
    pub fn new(debate_id: impl Into<String>) -> Self {
        Self {
            debate_id: debate_id.into(),
            ..Default::default()
        }
    }

    /// The best adjudicator on the panel chairs; everyone else is a
    /// panellist.
    pub fn from_panel(
        debate_id: impl Into<String>,
        mut panel: Vec<Adjudicator>,
    ) -> Self {
        sort_by_score_desc(&mut panel);
        let mut panel = panel.into_iter();
        Self {
            debate_id: debate_id.into(),
            chair: panel.next(),
            panellists: panel.collect(),
            trainees: Vec::new(),
        }
    }

    pub fn has_chair(&self) -> bool {
        self.chair.is_some()
    }

    pub fn is_panel(&self) -> bool {
        !self.panellists.is_empty()
    }

    /// A valid allocation has a chair and an odd number of voting
    /// adjudicators.
    pub fn valid(&self) -> bool {
        self.has_chair() && self.panellists.len() % 2 == 0
    }

    pub fn num_voting(&self) -> usize {
        usize::from(self.has_chair()) + self.panellists.len()
    }

    pub fn voting(&self) -> impl Iterator<Item = &Adjudicator> {
        self.chair.iter().chain(self.panellists.iter())
    }

    pub fn all(&self) -> impl Iterator<Item = &Adjudicator> {
        self.voting().chain(self.trainees.iter())
    }

    pub fn with_positions(
        &self,
    ) -> impl Iterator<Item = (&Adjudicator, Position)> {
        let chair_position = if self.is_panel() {
            Position::Chair
        } else {
            Position::Only
        };
        self.chair
            .iter()
            .map(move |adj| (adj, chair_position))
            .chain(self.panellists.iter().map(|adj| (adj, Position::Panellist)))
            .chain(self.trainees.iter().map(|adj| (adj, Position::Trainee)))
    }

    pub fn contains(&self, adjudicator_id: &str) -> bool {
        self.all().any(|adj| adj.id == adjudicator_id)
    }
}

/// Everything an allocator needs to know about a round.
pub struct AllocationInput {
    pub debates: Vec<Debate>,
    pub adjudicators: Vec<Adjudicator>,
    pub config: AdjudicationConfig,
    pub anneal: AnnealConfig,
    pub conflicts: ConflictsInfo,
    pub history: HistoryInfo,
    pub rng: ChaCha20Rng,
}

impl AllocationInput {
    /// Builds the input for allocating the (already drawn) debates of round
    /// `seq`. Team standings are those going into the round.
    pub fn from_tournament(
        tournament: &Tournament,
        seq: u32,
        config: &TournamentConfig,
        rng: ChaCha20Rng,
    ) -> Self {
        let standings = TournamentTeamStandings::compute(tournament, seq);
        let standing_of = |id: &str| {
            standings.standing(id).cloned().unwrap_or_else(|| {
                tournament
                    .team(id)
                    .cloned()
                    .map(TeamStanding::new)
                    .unwrap_or_else(|| TeamStanding::bye(None))
            })
        };

        let debates = tournament
            .debates_in_round(seq)
            .map(|record| Debate {
                id: record.id.clone(),
                round_seq: seq,
                teams: [
                    standing_of(&record.team_ids[0]),
                    standing_of(&record.team_ids[1]),
                ],
                bracket: record.bracket,
                room_rank: record.room_rank,
                importance: None,
                division: None,
            })
            // byes are not debated
            .filter(|debate| !debate.teams.iter().any(TeamStanding::is_bye))
            .collect();

        Self {
            debates,
            adjudicators: tournament.adjudicators.clone(),
            config: config.adjudication.clone(),
            anneal: config.anneal.clone(),
            conflicts: ConflictsInfo::from_tournament(
                tournament,
                config.adjudication.own_institution_conflicts,
            ),
            history: HistoryInfo::compute(&tournament.debates, seq),
            rng,
        }
    }

    /// Whether the adjudicator gets a vote.
    pub fn is_voting(&self, adj: &Adjudicator) -> bool {
        adj.accredited && adj.score >= self.config.adj_min_voting_score
    }

    /// The debates in order of importance, most important first. Room rank
    /// breaks ties.
    pub fn debates_by_importance(&self) -> Vec<&Debate> {
        let default = self.config.default_importance;
        let mut debates = self.debates.iter().collect::<Vec<_>>();
        debates.sort_by(|a, b| {
            b.importance_or(default)
                .total_cmp(&a.importance_or(default))
                .then(a.room_rank.cmp(&b.room_rank))
        });
        debates
    }

    fn debate(&self, id: &str) -> Option<&Debate> {
        self.debates.iter().find(|debate| debate.id == id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct AllocationOutcome {
    pub allocations: Vec<AdjudicatorAllocation>,
    pub warnings: Vec<String>,
}

/// Allocates adjudicators to every debate in a confirmed round, using the
/// configured method.
#[tracing::instrument(
    skip_all,
    fields(round = round.seq, method = %input.config.method)
)]
pub fn allocate_round(
    round: &Round,
    mut input: AllocationInput,
) -> Result<AllocationOutcome, AllocationError> {
    if round.draw_status != DrawStatus::Confirmed {
        return Err(AllocationError::RoundNotConfirmed(round.draw_status));
    }
    if input.debates.is_empty() {
        return Err(AllocationError::NoDebates);
    }
    check_scores(&input.adjudicators)?;

    // ties in score are broken randomly
    let mut adjudicators = std::mem::take(&mut input.adjudicators);
    adjudicators.shuffle(&mut input.rng);
    sort_by_score_desc(&mut adjudicators);
    input.adjudicators = adjudicators;

    let mut outcome = match input.config.method {
        AllocationMethod::Stab => stab::allocate(&input)?,
        AllocationMethod::Hungarian => hungarian::allocate(&input)?,
        AllocationMethod::Anneal => {
            let seeded = stab::allocate(&input)?;
            let mut rng = match input.anneal.seed {
                Some(seed) => ChaCha20Rng::seed_from_u64(seed),
                None => input.rng.clone(),
            };
            let mut outcome =
                anneal::allocate(&input, seeded.allocations, &mut rng);
            let mut warnings = seeded.warnings;
            warnings.append(&mut outcome.warnings);
            outcome.warnings = warnings;
            outcome
        }
    };

    // every debate gets an entry, even if nobody could be allocated to it
    for debate in &input.debates {
        if !outcome.allocations.iter().any(|a| a.debate_id == debate.id) {
            outcome.warnings.push(format!(
                "no adjudicators could be allocated to debate {}",
                debate.id
            ));
            outcome
                .allocations
                .push(AdjudicatorAllocation::new(debate.id.clone()));
        }
    }

    if input.config.allocate_trainees {
        allocate_trainees(&input, &mut outcome.allocations);
    }

    validate_allocations(&outcome.allocations)?;
    outcome.warnings.extend(conflict_warnings(&input, &outcome.allocations));

    tracing::info!(
        debates = outcome.allocations.len(),
        warnings = outcome.warnings.len(),
        "allocated adjudicators"
    );
    Ok(outcome)
}

fn check_scores(adjudicators: &[Adjudicator]) -> Result<(), AllocationError> {
    match adjudicators
        .iter()
        .find(|adj| !adj.score.is_finite() || adj.score < 0.0)
    {
        Some(adj) => Err(AllocationError::InvalidScore {
            adjudicator: adj.id.clone(),
            score: adj.score,
        }),
        None => Ok(()),
    }
}

/// Attaches the adjudicators who can't vote as trainees, one per debate,
/// best trainee to the most important debate. Adjudicators already on a
/// panel are skipped.
fn allocate_trainees(
    input: &AllocationInput,
    allocations: &mut [AdjudicatorAllocation],
) {
    let allocated = allocations
        .iter()
        .flat_map(|a| a.all().map(|adj| adj.id.clone()))
        .collect::<HashSet<_>>();
    let trainees = input
        .adjudicators
        .iter()
        .filter(|adj| !input.is_voting(adj) && !allocated.contains(&adj.id))
        .cloned()
        .collect::<Vec<_>>();
    let num_trainees = trainees.len();

    let debates = input.debates_by_importance();
    for (debate, trainee) in debates.iter().zip(trainees) {
        if let Some(allocation) =
            allocations.iter_mut().find(|a| a.debate_id == debate.id)
        {
            allocation.trainees.push(trainee);
        }
    }
    tracing::debug!(
        trainees = num_trainees.min(debates.len()),
        "allocated trainees"
    );
}

/// Checks that nobody is allocated twice and that every panel has a chair.
pub fn validate_allocations(
    allocations: &[AdjudicatorAllocation],
) -> Result<(), AllocationError> {
    let mut seen = HashSet::new();
    for allocation in allocations {
        if allocation.is_panel() && !allocation.has_chair() {
            return Err(AllocationError::ChairMissing(
                allocation.debate_id.clone(),
            ));
        }
        for adj in allocation.all() {
            if !seen.insert(adj.id.as_str()) {
                return Err(AllocationError::DuplicateAdjudicator(
                    adj.id.clone(),
                ));
            }
        }
    }
    Ok(())
}

/// Describes every conflict left in the allocation.
fn conflict_warnings(
    input: &AllocationInput,
    allocations: &[AdjudicatorAllocation],
) -> Vec<String> {
    let mut warnings = Vec::new();
    for allocation in allocations {
        let Some(debate) = input.debate(&allocation.debate_id) else {
            continue;
        };
        let voting = allocation.voting().collect::<Vec<_>>();
        for adj in &voting {
            for team in [debate.aff(), debate.neg()] {
                if input.conflicts.adjudicator_conflicts_team(&adj.id, &team.id)
                {
                    warnings.push(format!(
                        "{} conflicts with {} in debate {}",
                        adj.name, team.name, debate.id
                    ));
                }
            }
        }
        for (i, a) in voting.iter().enumerate() {
            for b in &voting[i + 1..] {
                if input.conflicts.adjudicators_conflict(&a.id, &b.id) {
                    warnings.push(format!(
                        "{} and {} conflict with each other in debate {}",
                        a.name, b.name, debate.id
                    ));
                }
            }
        }
    }
    warnings
}


#[cfg(test)]
mod tests {
    use super::{test_support::*, *};
    use crate::tournaments::conflicts::ConflictRecords;

    #[test]
    fn positions_distinguish_solo_chairs() {
        let solo = AdjudicatorAllocation::from_panel(
            "d1",
            vec![Adjudicator::new("a", 4.0)],
        );
        assert_eq!(
            solo.with_positions().map(|(_, p)| p).collect::<Vec<_>>(),
            vec![Position::Only]
        );
        assert!(solo.valid());

        let mut panel = AdjudicatorAllocation::from_panel(
            "d2",
            vec![
                Adjudicator::new("b", 2.0),
                Adjudicator::new("c", 4.5),
                Adjudicator::new("d", 3.0),
            ],
        );
        panel.trainees.push(Adjudicator::new("e", 1.0));
        assert_eq!(panel.chair.as_ref().map(|a| a.id.as_str()), Some("c"));
        assert_eq!(panel.num_voting(), 3);
        assert_eq!(
            panel
                .with_positions()
                .map(|(a, p)| (a.id.as_str(), p))
                .collect::<Vec<_>>(),
            vec![
                ("c", Position::Chair),
                ("d", Position::Panellist),
                ("b", Position::Panellist),
                ("e", Position::Trainee),
            ]
        );
        assert!(panel.contains("e"));
        assert!(!panel.contains("z"));
    }

    #[test]
    fn validation_rejects_duplicates_and_chairless_panels() {
        let a = AdjudicatorAllocation::from_panel(
            "d1",
            vec![Adjudicator::new("x", 3.0)],
        );
        let b = AdjudicatorAllocation::from_panel(
            "d2",
            vec![Adjudicator::new("x", 3.0)],
        );
        assert!(matches!(
            validate_allocations(&[a.clone(), b]),
            Err(AllocationError::DuplicateAdjudicator(id)) if id == "x"
        ));

        let chairless = AdjudicatorAllocation {
            debate_id: "d3".to_string(),
            chair: None,
            panellists: vec![Adjudicator::new("y", 3.0)],
            trainees: vec![],
        };
        assert!(matches!(
            validate_allocations(&[a, chairless]),
            Err(AllocationError::ChairMissing(id)) if id == "d3"
        ));
    }

    #[test]
    fn unconfirmed_rounds_are_not_allocated() {
        let input = input(vec![debate("d1", 0.0, 1)], adjs(&[4.0]));
        let mut round = confirmed_round();
        round.draw_status = DrawStatus::Draft;
        assert!(matches!(
            allocate_round(&round, input),
            Err(AllocationError::RoundNotConfirmed(DrawStatus::Draft))
        ));
    }

    #[test]
    fn nan_scores_are_rejected() {
        let input = input(vec![debate("d1", 0.0, 1)], adjs(&[f64::NAN]));
        assert!(matches!(
            allocate_round(&confirmed_round(), input),
            Err(AllocationError::InvalidScore { .. })
        ));
    }

    #[test]
    fn every_method_produces_a_valid_allocation() {
        for method in [
            AllocationMethod::Stab,
            AllocationMethod::Hungarian,
            AllocationMethod::Anneal,
        ] {
            let debates = (0..4)
                .map(|i| debate(&format!("d{i}"), (3 - i) as f64, i + 1))
                .collect();
            let scores = [4.8, 4.6, 4.0, 3.8, 3.6, 3.2, 3.0, 2.8, 2.6, 2.0];
            let mut input = input(debates, adjs(&scores));
            input.config.method = method;

            let outcome = allocate_round(&confirmed_round(), input).unwrap();
            assert_eq!(outcome.allocations.len(), 4, "{method}");
            validate_allocations(&outcome.allocations).unwrap();
            for allocation in &outcome.allocations {
                assert!(allocation.has_chair(), "{method}");
                assert!(allocation.valid(), "{method}");
            }
        }
    }

    #[test]
    fn trainees_go_to_the_most_important_debates() {
        let mut debates = vec![debate("d1", 0.0, 1), debate("d2", 0.0, 2)];
        debates[1].importance = Some(3.0);
        let mut input = input(debates, adjs(&[4.0, 3.9, 1.0]));
        input.config.method = AllocationMethod::Hungarian;
        input.config.allocate_trainees = true;

        let outcome = allocate_round(&confirmed_round(), input).unwrap();
        let d2 = outcome
            .allocations
            .iter()
            .find(|a| a.debate_id == "d2")
            .unwrap();
        assert_eq!(
            d2.trainees.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            vec!["j2"]
        );
    }

    #[test]
    fn every_method_leaves_non_voters_to_the_trainee_pass() {
        for method in [
            AllocationMethod::Stab,
            AllocationMethod::Hungarian,
            AllocationMethod::Anneal,
        ] {
            let mut input =
                input(vec![debate("d1", 0.0, 1)], adjs(&[4.0, 2.0]));
            input.config.method = method;
            input.config.adj_min_voting_score = 2.5;
            input.config.allocate_trainees = true;

            let outcome = allocate_round(&confirmed_round(), input).unwrap();
            let d1 = &outcome.allocations[0];
            assert_eq!(
                d1.voting().map(|a| a.id.as_str()).collect::<Vec<_>>(),
                vec!["j0"],
                "{method}"
            );
            assert_eq!(
                d1.trainees.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
                vec!["j1"],
                "{method}"
            );
        }
    }

    #[test]
    fn remaining_conflicts_become_warnings() {
        let debates = vec![debate("d1", 0.0, 1)];
        let adjudicators = adjs(&[4.0]);
        let mut input = input(debates, adjudicators);
        input.config.method = AllocationMethod::Stab;
        let records = ConflictRecords {
            adj_team: vec![("j0".to_string(), "d1a".to_string())],
            ..Default::default()
        };
        let teams = input.debates[0]
            .teams
            .iter()
            .map(|t| t.team.clone())
            .collect::<Vec<_>>();
        input.conflicts =
            ConflictsInfo::new(&records, &teams, &input.adjudicators, false);

        let outcome = allocate_round(&confirmed_round(), input).unwrap();
        assert_eq!(
            outcome.warnings,
            vec!["j0 conflicts with D1A in debate d1"]
        );
    }
}
