//! Allocation by optimal assignment. Solo chairs and panellists are each
//! matched to debates by the Hungarian algorithm, minimising a cost which
//! combines conflicts, history and how far an adjudicator falls short of
//! what the debate's importance demands.

use crate::tournaments::{
    participants::{Adjudicator, sort_by_score_desc},
    rounds::{
        allocations::{
            AdjudicatorAllocation, AllocationError, AllocationInput,
            AllocationOutcome, munkres,
        },
        draws::Debate,
    },
};

/// Shortfalls beyond this all cost the same.
const MAX_SHORTFALL: f64 = 10.0;

/// Cost of putting `adj` on the panel for `debate`. A negative
/// `adjustment` relaxes the quality required of the adjudicator.
pub fn cost(
    input: &AllocationInput,
    debate: &Debate,
    adj: &Adjudicator,
    adjustment: f64,
) -> f64 {
    let config = &input.config;
    let mut cost = 0.0;

    for team in [debate.aff(), debate.neg()] {
        if input.conflicts.adjudicator_conflicts_team(&adj.id, &team.id) {
            cost += config.conflict_penalty;
        }
        let seen = input.history.adjudicator_seen_team(&adj.id, &team.id);
        cost += config.history_penalty * f64::from(seen);
    }

    // scores are compared on a scale of 0 to 5
    let score = adj.score / config.adj_max_score * 5.0;
    let importance =
        debate.importance_or(config.default_importance) + adjustment;
    let diff = (5.0 + importance - score).min(MAX_SHORTFALL);
    if diff > 0.25 {
        cost += 100_000.0 * (diff - 0.25).exp();
    }

    cost + (config.adj_max_score - adj.score) * 100.0
}

fn cost_matrix(
    input: &AllocationInput,
    seats: &[(&Debate, f64)],
    adjudicators: &[Adjudicator],
) -> Vec<Vec<f64>> {
    seats
        .iter()
        .map(|(debate, adjustment)| {
            adjudicators
                .iter()
                .map(|adj| cost(input, debate, adj, *adjustment))
                .collect()
        })
        .collect()
}

/// Gives each debate one chair.
pub fn allocate_solos(
    input: &AllocationInput,
    debates: &[&Debate],
    solos: &[Adjudicator],
) -> Vec<AdjudicatorAllocation> {
    let seats = debates.iter().map(|&d| (d, 0.0)).collect::<Vec<_>>();
    let matrix = cost_matrix(input, &seats, solos);
    let assignment = munkres::solve(&matrix);
    tracing::debug!(
        total_cost = munkres::total_cost(&matrix, &assignment),
        "matched solo chairs"
    );

    assignment
        .into_iter()
        .map(|(i, j)| {
            AdjudicatorAllocation::from_panel(
                debates[i].id.clone(),
                vec![solos[j].clone()],
            )
        })
        .collect()
}

/// Gives each debate a panel of three. Each seat is matched separately;
/// the weakest seat of the most important panels has its requirement
/// relaxed.
pub fn allocate_panels(
    input: &AllocationInput,
    debates: &[&Debate],
    panellists: &[Adjudicator],
) -> Result<Vec<AdjudicatorAllocation>, AllocationError> {
    let seats = debates.len() * 3;
    if seats > panellists.len() {
        return Err(AllocationError::PanelCapacity {
            seats,
            panellists: panellists.len(),
        });
    }
    if debates.is_empty() {
        return Ok(Vec::new());
    }

    let relaxed = input.config.relaxed_seat_fraction * debates.len() as f64;
    let seats = debates
        .iter()
        .enumerate()
        .flat_map(|(i, &debate)| {
            (0..3).map(move |seat| {
                let adjustment = if (i as f64) < relaxed && seat == 2 {
                    input.config.relaxed_seat_adjustment
                } else {
                    0.0
                };
                (debate, adjustment)
            })
        })
        .collect::<Vec<_>>();
    let matrix = cost_matrix(input, &seats, panellists);
    let assignment = munkres::solve(&matrix);
    tracing::debug!(
        total_cost = munkres::total_cost(&matrix, &assignment),
        "matched panellists"
    );

    let mut panels = vec![Vec::with_capacity(3); debates.len()];
    for (row, col) in assignment {
        panels[row / 3].push(panellists[col].clone());
    }

    Ok(debates
        .iter()
        .zip(panels)
        .map(|(debate, panel)| {
            AdjudicatorAllocation::from_panel(debate.id.clone(), panel)
        })
        .collect())
}

#[tracing::instrument(skip_all, fields(debates = input.debates.len()))]
pub fn allocate(
    input: &AllocationInput,
) -> Result<AllocationOutcome, AllocationError> {
    let mut voting = input
        .adjudicators
        .iter()
        .filter(|adj| input.is_voting(adj))
        .cloned()
        .collect::<Vec<_>>();
    sort_by_score_desc(&mut voting);
    let debates = input.debates_by_importance();

    let n_debates = debates.len();
    let n_voting = voting.len();
    if n_debates == 0 {
        return Err(AllocationError::NoDebates);
    }
    if n_voting == 0 {
        return Err(AllocationError::NoVotingAdjudicators);
    }

    let mut warnings = Vec::new();
    let max_score = input.config.adj_max_score;
    let too_high = voting.iter().filter(|adj| adj.score > max_score).count();
    if too_high > 0 {
        warnings.push(format!(
            "{too_high} adjudicators have a score above the maximum of \
             {max_score}"
        ));
    }
    if n_voting < n_debates {
        warnings.push(format!(
            "there are {n_debates} debates but only {n_voting} voting \
             adjudicators"
        ));
    }

    // debates which can't be given a panel get a single chair
    let surplus = n_voting.saturating_sub(n_debates) / 2;
    let n_solos = n_debates.saturating_sub(surplus).min(n_voting);
    let (solo_debates, panel_debates) = debates.split_at(n_solos);
    let (solos, panellists) = voting.split_at(n_solos);
    tracing::debug!(
        solos = n_solos,
        panels = panel_debates.len(),
        panellists = panellists.len(),
        "split debates"
    );

    let mut allocations = allocate_solos(input, solo_debates, solos);
    if n_voting < n_debates {
        // nobody is left for the rest of the debates
        return Ok(AllocationOutcome {
            allocations,
            warnings,
        });
    }
    allocations.extend(allocate_panels(input, panel_debates, panellists)?);

    Ok(AllocationOutcome {
        allocations,
        warnings,
    })
}
