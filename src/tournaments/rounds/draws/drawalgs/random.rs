//! Creates a random draw.

use rand::{Rng, seq::SliceRandom};

use crate::tournaments::{
    config::{AvoidConflicts, SideAllocations},
    rounds::{
        draws::{
            Pairing, PairingFlag,
            drawalgs::{
                DrawContext, DrawInput, MakeDrawError, check_allocated_sides,
                graph, take_bye,
            },
        },
        side_names::Side,
    },
    teams::TeamStanding,
};

/// Generates a random draw.
///
/// With conflict avoidance on, conflicted pairings trade negative teams with
/// randomly chosen pairings (so sides are never changed by the swaps) until
/// the conflict is gone or `max_swap_attempts` is used up.
pub fn make_draw(input: &mut DrawInput) -> Result<Vec<Pairing>, MakeDrawError> {
    let DrawInput {
        teams,
        options,
        conflicts,
        history,
        rng,
        ..
    } = input;

    if teams.is_empty() {
        return Err(MakeDrawError::InvalidTeamCount(
            "There are no available teams!".to_string(),
        ));
    }

    let mut ctx = DrawContext::new(options, conflicts, history, rng);
    let mut teams = teams.clone();
    let graph = ctx.options.avoid_conflicts == AvoidConflicts::Graph;

    let (mut pairings, bye) =
        if ctx.options.side_allocations == SideAllocations::Preallocated {
            check_allocated_sides(&teams)?;
            let (mut affs, mut negs): (Vec<TeamStanding>, Vec<TeamStanding>) =
                teams
                    .into_iter()
                    .partition(|team| team.allocated_side == Some(Side::Aff));
            affs.shuffle(ctx.rng);
            negs.shuffle(ctx.rng);

            let pairings = if graph {
                graph::pair_sided_bracket(&ctx, affs, negs, 0.0, 1)
            } else {
                affs.into_iter()
                    .zip(negs)
                    .map(|(aff, neg)| Pairing::new(aff, neg, 0.0, 0))
                    .collect()
            };
            (pairings, None)
        } else {
            let bye = take_bye(&mut teams, false, ctx.rng);
            teams.shuffle(ctx.rng);

            let pairings = if graph {
                graph::pair_bracket(&ctx, teams, 0.0, 1)
            } else {
                let mut teams = teams.into_iter();
                let mut pairings = Vec::new();
                while let (Some(aff), Some(neg)) = (teams.next(), teams.next()) {
                    pairings.push(Pairing::new(aff, neg, 0.0, 0));
                }
                pairings
            };
            (pairings, bye)
        };

    if ctx.options.avoid_conflicts == AvoidConflicts::OneUpOneDown {
        avoid_conflicts(&mut ctx, &mut pairings);
    }
    ctx.allocate_sides(&mut pairings);
    pairings.extend(bye);

    for (i, pairing) in pairings.iter_mut().enumerate() {
        pairing.room_rank = i + 1;
    }

    Ok(pairings)
}

fn swap_negs(pairings: &mut [Pairing], i: usize, j: usize) {
    let (lo, hi) = (i.min(j), i.max(j));
    let (left, right) = pairings.split_at_mut(hi);
    std::mem::swap(&mut left[lo].teams[1], &mut right[0].teams[1]);
}

fn avoid_conflicts(ctx: &mut DrawContext, pairings: &mut [Pairing]) {
    if !(ctx.options.avoid_history || ctx.options.avoid_institution) {
        return;
    }

    let n = pairings.len();
    for i in 0..n {
        if ctx.badness([&pairings[i]]) == 0.0 {
            continue;
        }

        let mut resolved = false;
        for _ in 0..ctx.options.max_swap_attempts {
            let j = ctx.rng.random_range(0..n);
            if j == i {
                continue;
            }

            let before = ctx.badness([&pairings[i], &pairings[j]]);
            swap_negs(pairings, i, j);
            let after = ctx.badness([&pairings[i], &pairings[j]]);

            if after == 0.0 {
                resolved = true;
                break;
            } else if after >= before || ctx.badness([&pairings[j]]) > 0.0 {
                swap_negs(pairings, i, j);
            }
            // an improvement short of a fix is kept, and we try again
        }

        if !resolved {
            tracing::debug!(pairing = %pairings[i], "gave up swapping");
            pairings[i].add_flag(PairingFlag::MaxSwapped);
        }
    }
}
