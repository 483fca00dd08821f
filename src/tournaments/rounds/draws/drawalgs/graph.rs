//! Conflict avoidance by optimisation: each bracket is paired by a minimum
//! weight perfect matching, where an edge's weight is the penalty for
//! pairing those two teams.

use crate::tournaments::{
    config::SideAllocations,
    rounds::{
        allocations::munkres,
        draws::{Pairing, drawalgs::DrawContext},
    },
    teams::TeamStanding,
};

/// Brackets up to this size are matched exactly; larger ones fall back to
/// pairing the top half of the bracket against the bottom half.
const EXACT_MATCHING_LIMIT: usize = 16;

/// Penalty for pairing `a` with `b`.
pub(crate) fn assignment_cost(
    ctx: &DrawContext,
    a: &TeamStanding,
    b: &TeamStanding,
) -> f64 {
    let options = ctx.options;
    let mut penalty = 0.0;
    if options.avoid_history {
        penalty += f64::from(ctx.conflict_hist(a, b)) * options.history_penalty;
    }
    if options.avoid_institution && ctx.conflict_inst(a, b) {
        penalty += options.institution_penalty;
    }

    // Only an imbalance if both teams have been on the same side more often.
    // The median of the two imbalances scales the penalty, so that (+5, +1)
    // becoming (+4, +2) is preferred to (+5, +4) becoming (+4, +5).
    if options.side_allocations == SideAllocations::Balance
        && options.side_penalty > 0.0
    {
        let a_diff = i64::from(a.aff_count) - i64::from(a.neg_count);
        let b_diff = i64::from(b.aff_count) - i64::from(b.neg_count);
        let imbalance = (a_diff.signum() * b_diff.signum()).max(0);
        let magnitude = (a_diff.abs() + b_diff.abs()) / 2;
        penalty += (imbalance * magnitude) as f64 * options.side_penalty;
    }

    penalty
}

/// Pairs an even number of teams, minimising the total assignment cost.
/// Room ranks are numbered from `first_rank`.
pub(crate) fn pair_bracket(
    ctx: &DrawContext,
    teams: Vec<TeamStanding>,
    bracket: f64,
    first_rank: usize,
) -> Vec<Pairing> {
    let n = teams.len();
    debug_assert!(n % 2 == 0);
    if n == 0 {
        return Vec::new();
    }

    let cost = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| assignment_cost(ctx, &teams[i], &teams[j]))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let matches = if n <= EXACT_MATCHING_LIMIT {
        min_weight_perfect_matching(&cost)
    } else {
        let half = n / 2;
        let sub = (0..half)
            .map(|i| (half..n).map(|j| cost[i][j]).collect())
            .collect::<Vec<Vec<f64>>>();
        munkres::solve(&sub)
            .into_iter()
            .map(|(i, j)| (i, half + j))
            .collect()
    };

    let mut slots = teams.into_iter().map(Some).collect::<Vec<_>>();
    matches
        .into_iter()
        .enumerate()
        .filter_map(|(k, (i, j))| {
            let a = slots[i].take()?;
            let b = slots[j].take()?;
            Some(Pairing::new(a, b, bracket, first_rank + k))
        })
        .collect()
}

/// Pairs affirmative teams with negative teams, minimising the total
/// assignment cost. With sides already fixed the graph is bipartite, so this
/// is an assignment problem.
pub(crate) fn pair_sided_bracket(
    ctx: &DrawContext,
    affs: Vec<TeamStanding>,
    negs: Vec<TeamStanding>,
    bracket: f64,
    first_rank: usize,
) -> Vec<Pairing> {
    let cost = affs
        .iter()
        .map(|aff| {
            negs.iter()
                .map(|neg| assignment_cost(ctx, aff, neg))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let assignment = munkres::solve(&cost);
    let mut negs = negs.into_iter().map(Some).collect::<Vec<_>>();
    affs.into_iter()
        .zip(assignment)
        .enumerate()
        .filter_map(|(k, (aff, (_, j)))| {
            let neg = negs[j].take()?;
            Some(Pairing::new(aff, neg, bracket, first_rank + k))
        })
        .collect()
}

/// Exact minimum weight perfect matching of a complete graph on an even
/// number of vertices, by dynamic programming over subsets. The lowest
/// unmatched vertex is always matched next, so there are O(2^n n) states
/// and transitions. Returned pairs are `(i, j)` with `i < j`, in order of
/// `i`.
pub(crate) fn min_weight_perfect_matching(
    cost: &[Vec<f64>],
) -> Vec<(usize, usize)> {
    let n = cost.len();
    let full = (1usize << n) - 1;
    let mut best = vec![f64::INFINITY; 1 << n];
    let mut choice = vec![usize::MAX; 1 << n];
    best[full] = 0.0;

    // best[mask] is the cheapest way to match the vertices *not* in mask
    for mask in (0..full).rev() {
        let i = (!mask).trailing_zeros() as usize;
        if i >= n {
            continue;
        }
        for j in (i + 1)..n {
            if mask & (1 << j) != 0 {
                continue;
            }
            let next = mask | (1 << i) | (1 << j);
            let total = cost[i][j] + best[next];
            if total < best[mask] {
                best[mask] = total;
                choice[mask] = j;
            }
        }
    }

    let mut matches = Vec::with_capacity(n / 2);
    let mut mask = 0usize;
    while mask != full {
        let i = (!mask).trailing_zeros() as usize;
        let j = choice[mask];
        matches.push((i, j));
        mask |= (1 << i) | (1 << j);
    }
    matches
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{
        config::DrawOptions,
        tournaments::{
            conflicts::ConflictsInfo,
            rounds::{
                draws::{DebateRecord, drawalgs::test_support::standing},
                side_names::Side,
            },
            standings::compute::history::HistoryInfo,
        },
    };

    #[test]
    fn exact_matching_finds_the_cheapest_pairs() {
        // 0-1 and 2-3 are expensive, 0-2 and 1-3 are free
        let mut cost = vec![vec![5.0; 4]; 4];
        cost[0][2] = 0.0;
        cost[2][0] = 0.0;
        cost[1][3] = 0.0;
        cost[3][1] = 0.0;

        assert_eq!(min_weight_perfect_matching(&cost), vec![(0, 2), (1, 3)]);
    }

    #[test]
    fn graph_pairing_avoids_rematches() {
        let teams = (0..6)
            .map(|i| standing(&format!("t{i}"), 1.0))
            .collect::<Vec<_>>();
        let debates = [("t0", "t1"), ("t2", "t3"), ("t4", "t5")]
            .iter()
            .map(|(a, b)| DebateRecord {
                id: format!("{a}{b}"),
                round_seq: 1,
                team_ids: [a.to_string(), b.to_string()],
                bye: false,
                bracket: 0.0,
                room_rank: 1,
                winner: Some(Side::Aff),
                scores: None,
                team_flags: Default::default(),
                adjudicator_ids: vec![],
            })
            .collect::<Vec<_>>();
        let history = HistoryInfo::compute(&debates, 2);
        let options = DrawOptions::default();
        let conflicts = ConflictsInfo::default();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let ctx = DrawContext::new(&options, &conflicts, &history, &mut rng);

        let pairings = pair_bracket(&ctx, teams, 1.0, 1);
        assert_eq!(pairings.len(), 3);
        for pairing in &pairings {
            assert_eq!(ctx.conflict_hist(pairing.aff(), pairing.neg()), 0);
        }
        assert_eq!(
            pairings.iter().map(|p| p.room_rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn side_penalty_only_applies_to_teams_imbalanced_the_same_way() {
        let options = DrawOptions {
            side_penalty: 10.0,
            avoid_history: false,
            avoid_institution: false,
            ..Default::default()
        };
        let conflicts = ConflictsInfo::default();
        let history = HistoryInfo::default();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let ctx = DrawContext::new(&options, &conflicts, &history, &mut rng);

        let mut heavy_aff = standing("a", 0.0);
        heavy_aff.aff_count = 3;
        let mut light_aff = standing("b", 0.0);
        light_aff.aff_count = 1;
        let mut heavy_neg = standing("c", 0.0);
        heavy_neg.neg_count = 3;

        assert_eq!(assignment_cost(&ctx, &heavy_aff, &light_aff), 20.0);
        assert_eq!(assignment_cost(&ctx, &heavy_aff, &heavy_neg), 0.0);
    }
}
