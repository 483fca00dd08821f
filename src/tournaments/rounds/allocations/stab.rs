//! The stab allocator: a fast heuristic which rates adjudicators into ranks,
//! builds panels out of fixed rank recipes and hands the strongest panels
//! to the debates with the strongest teams.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::tournaments::{
    participants::{Adjudicator, sort_by_score_desc},
    rounds::{
        allocations::{
            AdjudicatorAllocation, AllocationError, AllocationInput,
            AllocationOutcome,
        },
        draws::Debate,
    },
};

#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub enum Rank {
    A,
    B,
    C,
    D,
    /// Too weak to be allocated at all.
    E,
}

impl Rank {
    /// `thresholds` are the lower bounds of ranks A to D.
    pub fn of(score: f64, thresholds: &[f64; 4]) -> Rank {
        [Rank::A, Rank::B, Rank::C, Rank::D]
            .into_iter()
            .zip(thresholds)
            .find(|(_, threshold)| score >= **threshold)
            .map(|(rank, _)| rank)
            .unwrap_or(Rank::E)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::D => "D",
            Rank::E => "E",
        })
    }
}

use Rank::{B, C, D};

/// Panel compositions, most preferred first. Rank A adjudicators left over
/// after the solo chairs have been picked fill `B` seats.
pub const RECIPES: [[Rank; 3]; 10] = [
    [B, B, B],
    [B, B, C],
    [C, C, C],
    [C, C, D],
    [D, D, D],
    [B, C, C],
    [B, B, D],
    [B, C, D],
    [B, D, D],
    [C, D, D],
];

/// Number of available adjudicators of each of the ranks A to D.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RankCounts(pub [usize; 4]);

impl RankCounts {
    fn of(pools: &[VecDeque<Adjudicator>; 4]) -> Self {
        RankCounts(pools.each_ref().map(VecDeque::len))
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Takes the seats of `recipe` out of the counts, or returns `None` if
    /// there aren't enough adjudicators of the right ranks.
    pub fn take(&self, recipe: &[Rank; 3]) -> Option<RankCounts> {
        let mut counts = self.0;
        for rank in recipe {
            let slot = match rank {
                Rank::B if counts[0] > 0 => 0,
                rank => *rank as usize,
            };
            let count = counts.get_mut(slot)?;
            *count = count.checked_sub(1)?;
        }
        Some(RankCounts(counts))
    }
}

/// Chooses the composition of `panels` three-adjudicator panels from the
/// available ranks. Returns the compositions (strongest first) and what is
/// left over.
pub fn plan_panels(
    available: RankCounts,
    panels: usize,
) -> Result<(Vec<[Rank; 3]>, RankCounts), AllocationError> {
    let needed = panels * 3;
    let insufficient = || AllocationError::InsufficientAdjudicators {
        rank: Rank::D,
        needed,
        available: available.total(),
    };
    if available.total() < needed {
        return Err(insufficient());
    }

    let mut remaining = available;
    let mut plan = Vec::with_capacity(panels);
    for _ in 0..panels {
        let Some((recipe, rest)) = RECIPES
            .iter()
            .find_map(|recipe| Some((*recipe, remaining.take(recipe)?)))
        else {
            return Err(insufficient());
        };
        plan.push(recipe);
        remaining = rest;
    }
    Ok((plan, remaining))
}

fn pop(
    pools: &mut [VecDeque<Adjudicator>; 4],
    rank: Rank,
) -> Option<Adjudicator> {
    match rank {
        Rank::B => pools[0].pop_front().or_else(|| pools[1].pop_front()),
        rank => pools.get_mut(rank as usize)?.pop_front(),
    }
}

/// How strong the teams in a debate are.
fn energy(debate: &Debate) -> f64 {
    debate
        .teams
        .iter()
        .map(|team| team.points * 300.0 + team.speaker_score)
        .sum()
}

fn average_score(panel: &[Adjudicator]) -> f64 {
    if panel.is_empty() {
        return 0.0;
    }
    panel.iter().map(|adj| adj.score).sum::<f64>() / panel.len() as f64
}

fn conflicted(
    input: &AllocationInput,
    debate: &Debate,
    panel: &[Adjudicator],
) -> bool {
    let teams = [debate.aff().id.as_str(), debate.neg().id.as_str()];
    panel
        .iter()
        .any(|adj| input.conflicts.adjudicator_conflicts(&adj.id, teams) > 0)
}

/// For every conflicted debate, looks for a debate (searching upwards in
/// the draw first, then downwards) whose panel it can trade with so that
/// neither debate is conflicted. Debates with no such partner keep their
/// panel.
fn swap_conflicted_panels(
    input: &AllocationInput,
    debates: &[&Debate],
    panels: &mut [Vec<Adjudicator>],
) {
    let n = debates.len();
    for i in 0..n {
        if !conflicted(input, debates[i], &panels[i]) {
            continue;
        }
        let partner = (0..i).rev().chain(i + 1..n).find(|&j| {
            !conflicted(input, debates[i], &panels[j])
                && !conflicted(input, debates[j], &panels[i])
        });
        match partner {
            Some(j) => {
                tracing::debug!(
                    debate = debates[i].id,
                    with = debates[j].id,
                    "swapped panels to avoid a conflict"
                );
                panels.swap(i, j);
            }
            None => tracing::debug!(
                debate = debates[i].id,
                "no panel swap avoids the conflict"
            ),
        }
    }
}

#[tracing::instrument(skip_all, fields(debates = input.debates.len()))]
pub fn allocate(
    input: &AllocationInput,
) -> Result<AllocationOutcome, AllocationError> {
    let n_debates = input.debates.len();
    if n_debates == 0 {
        return Err(AllocationError::NoDebates);
    }

    let mut adjudicators = input.adjudicators.clone();
    sort_by_score_desc(&mut adjudicators);

    let mut pools: [VecDeque<Adjudicator>; 4] = Default::default();
    let mut discarded = 0;
    for adj in adjudicators {
        match Rank::of(adj.score, &input.config.rank_thresholds) {
            Rank::E => discarded += 1,
            _ if !input.is_voting(&adj) => discarded += 1,
            rank => pools[rank as usize].push_back(adj),
        }
    }
    let eligible = RankCounts::of(&pools).total();
    tracing::debug!(eligible, discarded, "rated adjudicators");

    // debates which can't have a panel get a single (A or B rank) chair
    let surplus = eligible.saturating_sub(n_debates) / 2;
    let wanted_solos = n_debates.saturating_sub(surplus);

    let mut panels = Vec::with_capacity(n_debates);
    while panels.len() < wanted_solos {
        let Some(adj) = pop(&mut pools, Rank::B) else {
            break;
        };
        panels.push(vec![adj]);
    }
    let solos = panels.len();

    let (plan, _) = plan_panels(RankCounts::of(&pools), n_debates - solos)?;
    for recipe in plan {
        panels.push(
            recipe
                .iter()
                .filter_map(|&rank| pop(&mut pools, rank))
                .collect::<Vec<_>>(),
        );
    }
    tracing::debug!(solos, panels = panels.len() - solos, "built panels");

    let mut debates = input.debates.iter().collect::<Vec<_>>();
    debates.sort_by(|a, b| energy(b).total_cmp(&energy(a)));
    panels.sort_by(|a, b| average_score(b).total_cmp(&average_score(a)));

    if input.config.avoid_conflicts {
        swap_conflicted_panels(input, &debates, &mut panels);
    }

    let mut warnings = Vec::new();
    let unused = RankCounts::of(&pools).total();
    if unused > 0 {
        warnings.push(format!(
            "{unused} adjudicators could not be fitted into a panel and were \
             not allocated"
        ));
    }

    let allocations = debates
        .into_iter()
        .zip(panels)
        .map(|(debate, panel)| {
            AdjudicatorAllocation::from_panel(debate.id.clone(), panel)
        })
        .collect();

    Ok(AllocationOutcome {
        allocations,
        warnings,
    })
}
