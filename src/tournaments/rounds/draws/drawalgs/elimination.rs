//! Elimination (break) rounds. The best team meets the worst, the second
//! best the second worst, and so on. When the number of breaking teams is
//! not a power of two, the top teams skip the first elimination round.

use rand::Rng;

use crate::tournaments::{
    rounds::draws::{
        Pairing,
        drawalgs::{DrawInput, MakeDrawError},
    },
    teams::TeamStanding,
};

/// Splits `n` breaking teams into the number of debates in the first
/// elimination round and the number of teams which bypass it, so that the
/// round after has a power of two teams. Fewer than two teams can't debate,
/// so they all bypass.
pub fn partial_break_round_split(n: usize) -> (usize, usize) {
    if n < 2 {
        return (0, n);
    }
    if n.is_power_of_two() {
        return (n / 2, 0);
    }
    let next_round = 1 << (usize::BITS - 1 - n.leading_zeros());
    let debates = n - next_round;
    (debates, next_round - debates)
}

/// Folds `teams`, numbering room ranks from `first_rank`.
fn fold(teams: &[TeamStanding], first_rank: usize) -> Vec<Pairing> {
    let half = teams.len() / 2;
    teams[..half]
        .iter()
        .zip(teams[half..].iter().rev())
        .enumerate()
        .map(|(i, (top, bottom))| {
            Pairing::new(top.clone(), bottom.clone(), 0.0, first_rank + i)
        })
        .collect()
}

fn shuffle_sides(pairings: &mut [Pairing], rng: &mut impl Rng) {
    for pairing in pairings {
        if rng.random_bool(0.5) {
            pairing.swap_sides();
        }
    }
}

/// Draws the first elimination round from the ranked breaking teams (at
/// most `break_size` of them). Returns the pairings and the teams which
/// bypass the round.
pub fn make_first_draw(
    input: &mut DrawInput,
) -> Result<(Vec<Pairing>, Vec<TeamStanding>), MakeDrawError> {
    let mut teams = input.teams.clone();
    if input.options.break_size > 0 {
        teams.truncate(input.options.break_size);
    }

    if teams.len() < 2 {
        return Err(MakeDrawError::Elimination(format!(
            "there are only {} teams breaking, and there need to be at least \
             two to generate an elimination round draw",
            teams.len()
        )));
    }

    let (debates, bypassing) = partial_break_round_split(teams.len());
    tracing::info!(debates, bypassing, "drawing the first elimination round");

    let mut pairings = fold(&teams[bypassing..], bypassing + 1);
    shuffle_sides(&mut pairings, &mut input.rng);
    teams.truncate(bypassing);
    Ok((pairings, teams))
}

/// Draws a later elimination round from the winners of the previous one and
/// the teams which bypassed it.
pub fn make_subsequent_draw(
    input: &mut DrawInput,
) -> Result<Vec<Pairing>, MakeDrawError> {
    let mut results = input.results.clone();
    results.sort_by_key(|result| result.room_rank);

    let Some(first) = results.first() else {
        return Err(MakeDrawError::Elimination(
            "the previous elimination round has no debates".to_string(),
        ));
    };

    let missing = results.iter().filter(|r| r.winner.is_none()).count();
    if missing > 0 {
        return Err(MakeDrawError::Elimination(format!(
            "{missing} debates in the previous round don't have a result"
        )));
    }

    // if the top debate was in room 7, then 6 teams bypassed that round
    let bypassing = first.room_rank.saturating_sub(1);
    if bypassing > input.teams.len() {
        return Err(MakeDrawError::Elimination(format!(
            "{bypassing} teams should have bypassed the previous round, but \
             only {} teams are ranked",
            input.teams.len()
        )));
    }

    let teams = input.teams[..bypassing]
        .iter()
        .cloned()
        .chain(results.into_iter().filter_map(|r| r.winner))
        .collect::<Vec<_>>();
    tracing::info!(
        bypassing,
        winners = teams.len() - bypassing,
        "drawing a subsequent elimination round"
    );

    if !teams.len().is_power_of_two() {
        return Err(MakeDrawError::Elimination(format!(
            "the number of teams ({}) in this round is not a power of two",
            teams.len()
        )));
    }

    let mut pairings = fold(&teams, 1);
    shuffle_sides(&mut pairings, &mut input.rng);
    Ok(pairings)
}
