//! Power pairing: teams are grouped into brackets by points and paired
//! within their bracket.
//!
//! The stages are run in order:
//! 1. group teams into brackets (with the bottom team taking the bye if the
//!    number of teams is odd)
//! 2. make every bracket even, according to `odd_bracket`
//! 3. pair each bracket, according to `pairing_method` (or by weighted
//!    matching, if conflicts are avoided by graph)
//! 4. avoid conflicts one-up-one-down, if configured
//! 5. allocate sides
//!
//! With preallocated sides each bracket is a pool of affirmative teams and
//! a pool of negative teams, and brackets are evened out by side rather than
//! by count.

use itertools::Itertools;
use rand::{Rng, seq::SliceRandom};

use crate::{
    config::DrawOptions,
    tournaments::{
        config::{
            AvoidConflicts, OddBracket, PairingMethod, PullupRestriction,
            SideAllocations,
        },
        rounds::{
            draws::{
                Pairing, PairingFlag,
                drawalgs::{
                    DrawContext, DrawInput, MakeDrawError, check_allocated_sides,
                    graph, one_up_one_down, take_bye,
                },
            },
            side_names::Side,
        },
        teams::TeamStanding,
    },
};

#[derive(Debug)]
struct Bracket {
    points: f64,
    teams: Vec<TeamStanding>,
    /// Set for brackets made of the bottom team of one bracket and the top
    /// team of the next.
    intermediate: bool,
}

#[derive(Debug)]
struct SidedBracket {
    points: f64,
    affs: Vec<TeamStanding>,
    negs: Vec<TeamStanding>,
}

impl SidedBracket {
    fn pool_mut(&mut self, side: Side) -> &mut Vec<TeamStanding> {
        match side {
            Side::Aff => &mut self.affs,
            Side::Neg => &mut self.negs,
        }
    }

    /// Positive if there are more affirmative teams than negative teams.
    fn aff_surplus(&self) -> isize {
        self.affs.len() as isize - self.negs.len() as isize
    }
}

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
    check_options(options)?;

    let mut ctx = DrawContext::new(options, conflicts, history, rng);

    // points, then speaks, then at random
    let mut teams = teams.clone();
    teams.shuffle(ctx.rng);
    teams.sort_by(|a, b| {
        b.points
            .total_cmp(&a.points)
            .then(b.speaker_score.total_cmp(&a.speaker_score))
    });

    if ctx.options.side_allocations == SideAllocations::Preallocated {
        check_allocated_sides(&teams)?;
        let mut brackets = raw_sided_brackets(teams);
        match ctx.options.odd_bracket {
            OddBracket::Intermediate1 => {
                brackets = intermediate_sided_brackets(brackets)?
            }
            OddBracket::Intermediate2 => {
                brackets = split_intermediate_sided_brackets(brackets)?
            }
            policy => pullup_sided(&mut ctx, &mut brackets, policy)?,
        }

        let mut pairings = pair_sided_brackets(&mut ctx, brackets);
        if ctx.options.avoid_conflicts == AvoidConflicts::OneUpOneDown {
            for bracket in &mut pairings {
                one_up_one_down::avoid_conflicts(&ctx, bracket);
            }
        }
        let mut pairings = pairings.into_iter().flatten().collect::<Vec<_>>();
        ctx.annotate_team_flags(&mut pairings);
        return Ok(pairings);
    }

    let bye = take_bye(&mut teams, true, ctx.rng);
    let mut brackets = raw_brackets(teams);
    tracing::debug!(brackets = brackets.len(), "made raw brackets");

    match ctx.options.odd_bracket {
        OddBracket::Intermediate => brackets = intermediate_brackets(brackets)?,
        OddBracket::IntermediateBubbleUpDown => {
            brackets = intermediate_brackets(brackets)?;
            bubble_up_down(&mut ctx, &mut brackets);
        }
        policy => pullup(&mut ctx, &mut brackets, policy)?,
    }

    let mut pairings = pair_brackets(&mut ctx, brackets);
    if ctx.options.avoid_conflicts == AvoidConflicts::OneUpOneDown {
        for bracket in &mut pairings {
            one_up_one_down::avoid_conflicts(&ctx, bracket);
        }
    }

    let mut pairings = pairings.into_iter().flatten().collect::<Vec<_>>();
    ctx.allocate_sides(&mut pairings);
    ctx.annotate_team_flags(&mut pairings);

    if let Some(mut bye) = bye {
        bye.room_rank = pairings.len() + 1;
        pairings.push(bye);
    }

    Ok(pairings)
}

fn check_options(options: &DrawOptions) -> Result<(), MakeDrawError> {
    let preallocated =
        options.side_allocations == SideAllocations::Preallocated;

    let odd_bracket_ok = if preallocated {
        matches!(
            options.odd_bracket,
            OddBracket::PullupTop
                | OddBracket::PullupBottom
                | OddBracket::PullupRandom
                | OddBracket::Intermediate1
                | OddBracket::Intermediate2
        )
    } else {
        !matches!(
            options.odd_bracket,
            OddBracket::Intermediate1 | OddBracket::Intermediate2
        )
    };
    if !odd_bracket_ok {
        return Err(MakeDrawError::InvalidConfiguration(format!(
            "the odd bracket policy \"{}\" can't be used {} preallocated sides",
            options.odd_bracket,
            if preallocated { "with" } else { "without" }
        )));
    }

    if preallocated
        && matches!(
            options.pairing_method,
            PairingMethod::Adjacent | PairingMethod::FoldTopAdjacentRest
        )
    {
        return Err(MakeDrawError::InvalidConfiguration(
            "with preallocated sides, teams can only be paired by fold, slide \
             or random"
                .to_string(),
        ));
    }

    Ok(())
}

/// Groups ranked teams into brackets of equal points, highest first.
fn raw_brackets(teams: Vec<TeamStanding>) -> Vec<Bracket> {
    teams
        .into_iter()
        .chunk_by(|team| team.points)
        .into_iter()
        .map(|(points, teams)| Bracket {
            points,
            teams: teams.collect(),
            intermediate: false,
        })
        .collect()
}

fn raw_sided_brackets(teams: Vec<TeamStanding>) -> Vec<SidedBracket> {
    teams
        .into_iter()
        .chunk_by(|team| team.points)
        .into_iter()
        .map(|(points, teams)| {
            let (affs, negs) =
                teams.partition(|team| team.allocated_side == Some(Side::Aff));
            SidedBracket { points, affs, negs }
        })
        .collect()
}

/// Which teams in `teams` may be pulled up, as indices into `teams`.
fn pullup_eligible(
    restriction: PullupRestriction,
    teams: &[TeamStanding],
) -> Vec<usize> {
    match restriction {
        PullupRestriction::None => (0..teams.len()).collect(),
        PullupRestriction::LeastToDate => {
            let Some(least) = teams.iter().map(|team| team.pullups).min() else {
                return Vec::new();
            };
            (0..teams.len())
                .filter(|&i| teams[i].pullups == least)
                .collect()
        }
    }
}

/// Position (among `n` eligible teams) of the team to pull up.
fn pullup_position(policy: OddBracket, n: usize, rng: &mut impl Rng) -> usize {
    match policy {
        OddBracket::PullupBottom => n - 1,
        OddBracket::PullupMiddle => {
            if n % 2 == 0 {
                n / 2 - rng.random_range(0..2)
            } else {
                n / 2
            }
        }
        OddBracket::PullupRandom => rng.random_range(0..n),
        _ => 0,
    }
}

/// Makes every bracket even by pulling up a team from the bracket below.
/// Brackets left empty are removed.
fn pullup(
    ctx: &mut DrawContext,
    brackets: &mut Vec<Bracket>,
    policy: OddBracket,
) -> Result<(), MakeDrawError> {
    let mut needed_for: Option<usize> = None;

    for i in 0..brackets.len() {
        if let Some(dest) = needed_for.take() {
            let eligible =
                pullup_eligible(ctx.options.pullup_restriction, &brackets[i].teams);
            if eligible.is_empty() {
                return Err(MakeDrawError::OddBracket(format!(
                    "no team in the {} bracket can be pulled up",
                    brackets[i].points
                )));
            }
            let pos = pullup_position(policy, eligible.len(), ctx.rng);
            let team = brackets[i].teams.remove(eligible[pos]);
            tracing::trace!(
                team = team.id(),
                from = brackets[i].points,
                "pullup"
            );
            ctx.add_team_flag(&team, PairingFlag::Pullup);
            brackets[dest].teams.push(team);
        }

        if brackets[i].teams.len() % 2 != 0 {
            needed_for = Some(i);
        }
    }

    if let Some(odd) = needed_for {
        return Err(MakeDrawError::OddBracket(format!(
            "the last bracket ({} points) is still odd",
            brackets[odd].points
        )));
    }

    brackets.retain(|bracket| !bracket.teams.is_empty());
    Ok(())
}

/// The bottom team of an odd bracket is paired with the top team of the
/// bracket below, in an intermediate bracket between the two.
fn intermediate_brackets(
    brackets: Vec<Bracket>,
) -> Result<Vec<Bracket>, MakeDrawError> {
    let mut new = Vec::with_capacity(brackets.len() * 2);
    let mut odd_team: Option<TeamStanding> = None;

    for mut bracket in brackets {
        if let Some(team) = odd_team.take() {
            let top = bracket.teams.remove(0);
            new.push(Bracket {
                points: bracket.points + 0.5,
                teams: vec![team, top],
                intermediate: true,
            });
        }
        if bracket.teams.len() % 2 != 0 {
            odd_team = bracket.teams.pop();
        }
        if !bracket.teams.is_empty() {
            new.push(bracket);
        }
    }

    if let Some(team) = odd_team {
        return Err(MakeDrawError::OddBracket(format!(
            "the last bracket is still odd ({} is left over)",
            team.team.name
        )));
    }
    Ok(new)
}

#[derive(Clone, Copy)]
enum Conflict {
    Institution,
    History,
}

fn check_conflict(
    ctx: &DrawContext,
    a: &TeamStanding,
    b: &TeamStanding,
) -> Option<Conflict> {
    if ctx.conflict_inst(a, b) {
        Some(Conflict::Institution)
    } else if ctx.conflict_hist(a, b) > 0 {
        Some(Conflict::History)
    } else {
        None
    }
}

/// For each intermediate bracket with a conflict, swaps its top team with
/// the bottom team of the bracket it came from ("bubble up"), or failing
/// that its bottom team with the top team of the bracket it came from
/// ("bubble down"). Both teams are never swapped.
fn bubble_up_down(ctx: &mut DrawContext, brackets: &mut [Bracket]) {
    for i in 0..brackets.len() {
        if !brackets[i].intermediate {
            continue;
        }
        let [upper, lower] = [&brackets[i].teams[0], &brackets[i].teams[1]];
        let Some(conflict) = check_conflict(ctx, upper, lower) else {
            continue;
        };
        let (upper_points, lower_points) = (upper.points, lower.points);

        let above = brackets
            .iter()
            .position(|b| !b.intermediate && b.points == upper_points);
        if let Some(j) = above
            && let Some(swap_team) = brackets[j].teams.last().cloned()
            && check_conflict(ctx, &swap_team, &brackets[i].teams[1]).is_none()
        {
            ctx.add_team_flag(
                &brackets[i].teams[0],
                match conflict {
                    Conflict::Institution => PairingFlag::BubbleUpInstitution,
                    Conflict::History => PairingFlag::BubbleUpHistory,
                },
            );
            ctx.add_team_flag(&swap_team, PairingFlag::BubbleUpAccommodate);
            let moved = std::mem::replace(&mut brackets[i].teams[0], swap_team);
            if let Some(last) = brackets[j].teams.last_mut() {
                *last = moved;
            }
            continue;
        }

        let below = brackets
            .iter()
            .position(|b| !b.intermediate && b.points == lower_points);
        if let Some(j) = below
            && let Some(swap_team) = brackets[j].teams.first().cloned()
            && check_conflict(ctx, &swap_team, &brackets[i].teams[0]).is_none()
        {
            ctx.add_team_flag(
                &brackets[i].teams[1],
                match conflict {
                    Conflict::Institution => PairingFlag::BubbleDownInstitution,
                    Conflict::History => PairingFlag::BubbleDownHistory,
                },
            );
            ctx.add_team_flag(&swap_team, PairingFlag::BubbleDownAccommodate);
            let moved = std::mem::replace(&mut brackets[i].teams[1], swap_team);
            brackets[j].teams[0] = moved;
            continue;
        }

        tracing::debug!(
            bracket = brackets[i].points,
            "could not bubble up or down"
        );
        ctx.add_team_flag(&brackets[i].teams[0], PairingFlag::NoBubbleUpDown);
    }
}

/// Pulls up as many teams of the missing side as each bracket needs, from
/// as many brackets below as it takes.
fn pullup_sided(
    ctx: &mut DrawContext,
    brackets: &mut [SidedBracket],
    policy: OddBracket,
) -> Result<(), MakeDrawError> {
    // (destination bracket, side needed, number needed), highest first
    let mut needed: Vec<(usize, Side, usize)> = Vec::new();

    for i in 0..brackets.len() {
        let mut still_needed = Vec::new();

        for (dest, side, number) in needed {
            let pool = brackets[i].pool_mut(side);
            let taken = if pool.len() < number {
                still_needed.push((dest, side, number - pool.len()));
                std::mem::take(pool)
            } else {
                let mut indices = match policy {
                    OddBracket::PullupBottom => {
                        (pool.len() - number..pool.len()).collect::<Vec<_>>()
                    }
                    OddBracket::PullupRandom => {
                        rand::seq::index::sample(ctx.rng, pool.len(), number)
                            .into_vec()
                    }
                    _ => (0..number).collect(),
                };
                // remove from the back so earlier indices stay valid
                indices.sort_unstable_by(|a, b| b.cmp(a));
                let mut taken =
                    indices.into_iter().map(|k| pool.remove(k)).collect::<Vec<_>>();
                taken.reverse();
                taken
            };

            for team in &taken {
                ctx.add_team_flag(team, PairingFlag::Pullup);
            }
            brackets[dest].pool_mut(side).extend(taken);
        }

        let surplus = brackets[i].aff_surplus();
        if surplus > 0 {
            still_needed.push((i, Side::Neg, surplus as usize));
        } else if surplus < 0 {
            still_needed.push((i, Side::Aff, surplus.unsigned_abs()));
        }

        needed = still_needed;
    }

    if !needed.is_empty() {
        return Err(MakeDrawError::OddBracket(
            "the last bracket still needed pullups".to_string(),
        ));
    }
    Ok(())
}

/// Takes up to `number` teams from the top of `pool`.
fn take_top(pool: &mut Vec<TeamStanding>, number: usize) -> Vec<TeamStanding> {
    pool.drain(..number.min(pool.len())).collect()
}

/// Excess teams in a bracket start an intermediate bracket half a point
/// below, which is filled from the top of as many lower brackets as needed.
fn intermediate_sided_brackets(
    brackets: Vec<SidedBracket>,
) -> Result<Vec<SidedBracket>, MakeDrawError> {
    let mut new = Vec::new();
    let mut unfilled: Vec<SidedBracket> = Vec::new();

    for mut pool in brackets {
        let mut still_unfilled = Vec::new();
        for mut bracket in unfilled {
            let surplus = bracket.aff_surplus();
            if surplus > 0 {
                let negs = take_top(&mut pool.negs, surplus as usize);
                bracket.negs.extend(negs);
            } else if surplus < 0 {
                let affs = take_top(&mut pool.affs, surplus.unsigned_abs());
                bracket.affs.extend(affs);
            }

            if bracket.aff_surplus() == 0 {
                new.push(bracket);
            } else {
                still_unfilled.push(bracket);
            }
        }
        unfilled = still_unfilled;

        let n = pool.affs.len().min(pool.negs.len());
        let excess = SidedBracket {
            points: pool.points - 0.5,
            affs: pool.affs.split_off(n),
            negs: pool.negs.split_off(n),
        };
        if n > 0 {
            new.push(pool);
        }
        if !(excess.affs.is_empty() && excess.negs.is_empty()) {
            unfilled.push(excess);
        }
    }

    if !unfilled.is_empty() {
        return Err(MakeDrawError::OddBracket(format!(
            "{} intermediate bracket(s) could not be filled",
            unfilled.len()
        )));
    }

    new.sort_by(|a, b| b.points.total_cmp(&a.points));
    Ok(new)
}

/// Like [`intermediate_sided_brackets`], except that every intermediate
/// bracket only holds teams from one pair of brackets. If the next bracket
/// down can't fill the excess, the rest of the excess forms a further
/// intermediate bracket, so there may be several between two brackets.
fn split_intermediate_sided_brackets(
    brackets: Vec<SidedBracket>,
) -> Result<Vec<SidedBracket>, MakeDrawError> {
    struct Unfilled {
        points: f64,
        excess: SidedBracket,
        parts: Vec<SidedBracket>,
    }

    let mut new = Vec::new();
    let mut unfilled: Vec<Unfilled> = Vec::new();

    for mut pool in brackets {
        let mut still_unfilled = Vec::new();
        for mut bracket in unfilled {
            let excess = &mut bracket.excess;
            let (affs, negs) = if !excess.affs.is_empty() {
                let k = excess.affs.len().min(pool.negs.len());
                (take_top(&mut excess.affs, k), take_top(&mut pool.negs, k))
            } else {
                let k = excess.negs.len().min(pool.affs.len());
                (take_top(&mut pool.affs, k), take_top(&mut excess.negs, k))
            };
            if !affs.is_empty() {
                bracket.parts.push(SidedBracket {
                    points: bracket.points,
                    affs,
                    negs,
                });
            }

            if bracket.excess.affs.is_empty() && bracket.excess.negs.is_empty() {
                let count = bracket.parts.len() as f64;
                for (i, mut part) in bracket.parts.into_iter().enumerate() {
                    part.points = bracket.points - (i + 1) as f64 / (count + 1.0);
                    new.push(part);
                }
            } else {
                still_unfilled.push(bracket);
            }
        }
        unfilled = still_unfilled;

        let n = pool.affs.len().min(pool.negs.len());
        let excess = SidedBracket {
            points: pool.points,
            affs: pool.affs.split_off(n),
            negs: pool.negs.split_off(n),
        };
        let points = pool.points;
        if n > 0 {
            new.push(pool);
        }
        if !(excess.affs.is_empty() && excess.negs.is_empty()) {
            unfilled.push(Unfilled {
                points,
                excess,
                parts: Vec::new(),
            });
        }
    }

    if !unfilled.is_empty() {
        return Err(MakeDrawError::OddBracket(format!(
            "{} intermediate bracket(s) could not be filled",
            unfilled.len()
        )));
    }

    new.sort_by(|a, b| b.points.total_cmp(&a.points));
    Ok(new)
}

/// Splits a bracket into the teams that will affirm and the teams that will
/// negate (before sides are allocated).
fn subpools(
    method: PairingMethod,
    mut teams: Vec<TeamStanding>,
    rng: &mut impl Rng,
) -> Vec<(TeamStanding, TeamStanding)> {
    match method {
        PairingMethod::Slide | PairingMethod::Random => {
            if method == PairingMethod::Random {
                teams.shuffle(rng);
            }
            let bottom = teams.split_off(teams.len() / 2);
            teams.into_iter().zip(bottom).collect()
        }
        PairingMethod::Fold => {
            let mut bottom = teams.split_off(teams.len() / 2);
            bottom.reverse();
            teams.into_iter().zip(bottom).collect()
        }
        PairingMethod::Adjacent | PairingMethod::FoldTopAdjacentRest => {
            teams.into_iter().tuples().collect()
        }
    }
}

/// Pairs every bracket. Room ranks run on from one bracket to the next.
fn pair_brackets(
    ctx: &mut DrawContext,
    brackets: Vec<Bracket>,
) -> Vec<Vec<Pairing>> {
    let mut room_rank = 1;
    let mut pairings = Vec::with_capacity(brackets.len());

    for (k, bracket) in brackets.into_iter().enumerate() {
        let paired = if ctx.options.avoid_conflicts == AvoidConflicts::Graph {
            graph::pair_bracket(ctx, bracket.teams, bracket.points, room_rank)
        } else {
            let method = match ctx.options.pairing_method {
                PairingMethod::FoldTopAdjacentRest if k == 0 => PairingMethod::Fold,
                method => method,
            };
            subpools(method, bracket.teams, ctx.rng)
                .into_iter()
                .enumerate()
                .map(|(i, (aff, neg))| {
                    Pairing::new(aff, neg, bracket.points, room_rank + i)
                })
                .collect()
        };
        room_rank += paired.len();
        pairings.push(paired);
    }

    pairings
}

fn pair_sided_brackets(
    ctx: &mut DrawContext,
    brackets: Vec<SidedBracket>,
) -> Vec<Vec<Pairing>> {
    let mut room_rank = 1;
    let mut pairings = Vec::with_capacity(brackets.len());

    for SidedBracket {
        points,
        mut affs,
        mut negs,
    } in brackets
    {
        let paired = if ctx.options.avoid_conflicts == AvoidConflicts::Graph {
            graph::pair_sided_bracket(ctx, affs, negs, points, room_rank)
        } else {
            match ctx.options.pairing_method {
                PairingMethod::Fold => negs.reverse(),
                PairingMethod::Random => {
                    affs.shuffle(ctx.rng);
                    negs.shuffle(ctx.rng);
                }
                _ => (),
            }
            affs.into_iter()
                .zip(negs)
                .enumerate()
                .map(|(i, (aff, neg))| Pairing::new(aff, neg, points, room_rank + i))
                .collect()
        };
        room_rank += paired.len();
        pairings.push(paired);
    }

    pairings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournaments::{
        config::DrawType,
        conflicts::{ConflictRecords, ConflictsInfo},
        rounds::draws::{
            DebateRecord,
            drawalgs::{generate_draw, test_support::*},
        },
        standings::compute::history::HistoryInfo,
        teams::Team,
    };

    fn ranked(id: &str, points: f64, speaks: f64) -> TeamStanding {
        TeamStanding {
            speaker_score: speaks,
            ..standing(id, points)
        }
    }

    fn sided(id: &str, points: f64, speaks: f64, side: Side) -> TeamStanding {
        TeamStanding {
            allocated_side: Some(side),
            ..ranked(id, points, speaks)
        }
    }

    fn quiet(options: DrawOptions) -> DrawOptions {
        DrawOptions {
            avoid_conflicts: AvoidConflicts::Off,
            ..options
        }
    }

    fn pairing_of<'a>(draw: &'a [Pairing], id: &str) -> &'a Pairing {
        draw.iter().find(|p| p.contains(id)).unwrap()
    }

    fn opponent<'a>(draw: &'a [Pairing], id: &str) -> &'a str {
        let pairing = pairing_of(draw, id);
        if pairing.aff().id() == id {
            pairing.neg().id()
        } else {
            pairing.aff().id()
        }
    }

    fn with_institutions(input: &mut DrawInput) {
        let plain: Vec<Team> = input.teams.iter().map(|s| s.team.clone()).collect();
        input.conflicts =
            ConflictsInfo::new(&ConflictRecords::default(), &plain, &[], false);
    }

    #[test]
    fn five_teams_give_the_bottom_team_a_bye() {
        let teams = vec![
            ranked("a", 3.0, 0.0),
            ranked("b", 2.0, 80.0),
            ranked("c", 2.0, 70.0),
            ranked("d", 1.0, 0.0),
            ranked("e", 0.0, 0.0),
        ];
        let draw = generate_draw(input(
            DrawType::PowerPaired,
            teams.clone(),
            DrawOptions::default(),
        ))
        .unwrap();

        assert_eq!(draw.pairings.len(), 3);
        assert_complete(&draw.pairings, &teams);

        let bye = draw.pairings.last().unwrap();
        assert!(bye.is_bye());
        assert_eq!(bye.aff().id(), "e");
        assert_eq!(bye.room_rank, 3);

        // a is odd in its bracket and meets the top of the next one
        assert_eq!(opponent(&draw.pairings, "a"), "b");
        assert_eq!(pairing_of(&draw.pairings, "a").bracket, 2.5);
        assert_eq!(opponent(&draw.pairings, "c"), "d");
        assert_eq!(pairing_of(&draw.pairings, "c").bracket, 1.5);
    }

    #[test]
    fn pullups_are_flagged() {
        let teams = vec![
            ranked("a", 2.0, 0.0),
            ranked("b", 1.0, 80.0),
            ranked("c", 1.0, 70.0),
            ranked("d", 1.0, 60.0),
        ];

        let options = quiet(DrawOptions {
            odd_bracket: OddBracket::PullupTop,
            ..Default::default()
        });
        let draw =
            generate_draw(input(DrawType::PowerPaired, teams.clone(), options))
                .unwrap();
        assert_eq!(opponent(&draw.pairings, "a"), "b");
        let top = pairing_of(&draw.pairings, "a");
        assert_eq!(top.bracket, 2.0);
        assert_eq!(top.room_rank, 1);
        let b_side = if top.aff().id() == "b" { 0 } else { 1 };
        assert_eq!(top.team_flags[b_side], vec![PairingFlag::Pullup]);
        assert!(!pairing_of(&draw.pairings, "c").has_flag(PairingFlag::Pullup));

        let options = quiet(DrawOptions {
            odd_bracket: OddBracket::PullupBottom,
            ..Default::default()
        });
        let draw =
            generate_draw(input(DrawType::PowerPaired, teams.clone(), options))
                .unwrap();
        assert_eq!(opponent(&draw.pairings, "a"), "d");
    }

    #[test]
    fn teams_pulled_up_before_are_skipped_when_restricted() {
        let mut teams = vec![
            ranked("a", 2.0, 0.0),
            ranked("b", 1.0, 80.0),
            ranked("c", 1.0, 70.0),
            ranked("d", 1.0, 60.0),
        ];
        teams[1].pullups = 1;

        let options = quiet(DrawOptions {
            odd_bracket: OddBracket::PullupTop,
            pullup_restriction: PullupRestriction::LeastToDate,
            ..Default::default()
        });
        let draw = generate_draw(input(DrawType::PowerPaired, teams, options))
            .unwrap();
        assert_eq!(opponent(&draw.pairings, "a"), "c");
    }

    /// Three teams on three points and three on two: a3 and b1 end up in
    /// the intermediate bracket.
    fn bubble_teams() -> Vec<TeamStanding> {
        vec![
            ranked("a1", 3.0, 90.0),
            ranked("a2", 3.0, 80.0),
            ranked("a3", 3.0, 70.0),
            ranked("b1", 2.0, 90.0),
            ranked("b2", 2.0, 80.0),
            ranked("b3", 2.0, 70.0),
        ]
    }

    fn set_institution(teams: &mut [TeamStanding], ids: &[&str], inst: &str) {
        for team in teams.iter_mut().filter(|t| ids.contains(&t.id())) {
            team.team.institution_id = Some(inst.to_string());
        }
    }

    #[test]
    fn conflicted_intermediate_brackets_bubble_up() {
        let mut teams = bubble_teams();
        set_institution(&mut teams, &["a3", "b1"], "x");
        let mut input = input(
            DrawType::PowerPaired,
            teams,
            quiet(DrawOptions::default()),
        );
        with_institutions(&mut input);

        let draw = generate_draw(input).unwrap();
        assert_eq!(opponent(&draw.pairings, "b1"), "a2");
        assert_eq!(opponent(&draw.pairings, "a1"), "a3");
        assert!(
            pairing_of(&draw.pairings, "a1")
                .has_flag(PairingFlag::BubbleUpInstitution)
        );
        assert!(
            pairing_of(&draw.pairings, "b1")
                .has_flag(PairingFlag::BubbleUpAccommodate)
        );
    }

    #[test]
    fn conflicted_intermediate_brackets_bubble_down_if_they_cannot_go_up() {
        let mut teams = bubble_teams();
        set_institution(&mut teams, &["a2", "a3", "b1"], "x");
        let mut input = input(
            DrawType::PowerPaired,
            teams,
            quiet(DrawOptions::default()),
        );
        with_institutions(&mut input);

        let draw = generate_draw(input).unwrap();
        assert_eq!(opponent(&draw.pairings, "a3"), "b2");
        assert_eq!(opponent(&draw.pairings, "b1"), "b3");
        assert!(
            pairing_of(&draw.pairings, "b1")
                .has_flag(PairingFlag::BubbleDownInstitution)
        );
        assert!(
            pairing_of(&draw.pairings, "a3")
                .has_flag(PairingFlag::BubbleDownAccommodate)
        );
    }

    #[test]
    fn unresolvable_intermediate_brackets_are_flagged() {
        let mut teams = bubble_teams();
        set_institution(&mut teams, &["a2", "a3", "b1", "b2"], "x");
        let mut input = input(
            DrawType::PowerPaired,
            teams,
            quiet(DrawOptions::default()),
        );
        with_institutions(&mut input);

        let draw = generate_draw(input).unwrap();
        assert_eq!(opponent(&draw.pairings, "a3"), "b1");
        assert!(
            pairing_of(&draw.pairings, "a3").has_flag(PairingFlag::NoBubbleUpDown)
        );
        assert!(draw.warnings.iter().any(|w| w.contains("Can't bubble")));
    }

    fn pairs_with(method: PairingMethod) -> Vec<[String; 2]> {
        let teams = (0..8)
            .map(|i| ranked(&format!("t{i}"), 0.0, 100.0 - i as f64))
            .collect();
        let options = quiet(DrawOptions {
            pairing_method: method,
            ..Default::default()
        });
        let draw = generate_draw(input(DrawType::PowerPaired, teams, options))
            .unwrap();
        draw.pairings
            .iter()
            .map(|p| {
                let mut ids = [p.aff().id().to_string(), p.neg().id().to_string()];
                ids.sort();
                ids
            })
            .collect()
    }

    fn expected(pairs: &[(u8, u8)]) -> Vec<[String; 2]> {
        pairs
            .iter()
            .map(|(a, b)| [format!("t{a}"), format!("t{b}")])
            .collect()
    }

    #[test]
    fn pairing_methods_order_the_bracket() {
        assert_eq!(
            pairs_with(PairingMethod::Slide),
            expected(&[(0, 4), (1, 5), (2, 6), (3, 7)])
        );
        assert_eq!(
            pairs_with(PairingMethod::Fold),
            expected(&[(0, 7), (1, 6), (2, 5), (3, 4)])
        );
        assert_eq!(
            pairs_with(PairingMethod::Adjacent),
            expected(&[(0, 1), (2, 3), (4, 5), (6, 7)])
        );
        // only one bracket, so this is a fold
        assert_eq!(
            pairs_with(PairingMethod::FoldTopAdjacentRest),
            expected(&[(0, 7), (1, 6), (2, 5), (3, 4)])
        );
    }

    #[test]
    fn one_up_one_down_runs_within_brackets() {
        let teams = (0..4)
            .map(|i| ranked(&format!("t{i}"), 0.0, 100.0 - i as f64))
            .collect();
        let mut input = input(DrawType::PowerPaired, teams, DrawOptions::default());
        input.history = HistoryInfo::compute(
            &[DebateRecord {
                id: "r1".into(),
                round_seq: 1,
                team_ids: ["t0".into(), "t2".into()],
                bye: false,
                bracket: 0.0,
                room_rank: 1,
                winner: None,
                scores: None,
                team_flags: Default::default(),
                adjudicator_ids: vec![],
            }],
            2,
        );

        let draw = generate_draw(input).unwrap();
        assert_eq!(opponent(&draw.pairings, "t0"), "t3");
        assert_eq!(opponent(&draw.pairings, "t1"), "t2");
        assert!(
            pairing_of(&draw.pairings, "t0")
                .has_flag(PairingFlag::OneUpOneDownHistory)
        );
        assert!(draw.warnings.is_empty());
    }

    fn preallocated(odd_bracket: OddBracket) -> DrawOptions {
        quiet(DrawOptions {
            side_allocations: SideAllocations::Preallocated,
            odd_bracket,
            ..Default::default()
        })
    }

    #[test]
    fn preallocated_pullups_take_the_missing_side() {
        let teams = vec![
            sided("a", 2.0, 0.0, Side::Aff),
            sided("b", 1.0, 0.0, Side::Aff),
            sided("c", 1.0, 80.0, Side::Neg),
            sided("d", 1.0, 70.0, Side::Neg),
        ];
        let draw = generate_draw(input(
            DrawType::PowerPaired,
            teams,
            preallocated(OddBracket::PullupTop),
        ))
        .unwrap();

        assert_eq!(draw.pairings[0].aff().id(), "a");
        assert_eq!(draw.pairings[0].neg().id(), "c");
        assert_eq!(draw.pairings[0].team_flags[1], vec![PairingFlag::Pullup]);
        assert_eq!(draw.pairings[1].aff().id(), "b");
        assert_eq!(draw.pairings[1].neg().id(), "d");
    }

    #[test]
    fn first_intermediate_method_fills_from_below() {
        let teams = vec![
            sided("p", 2.0, 80.0, Side::Aff),
            sided("q", 2.0, 70.0, Side::Aff),
            sided("r", 2.0, 0.0, Side::Neg),
            sided("s", 1.0, 0.0, Side::Aff),
            sided("t", 1.0, 80.0, Side::Neg),
            sided("u", 1.0, 70.0, Side::Neg),
        ];
        let draw = generate_draw(input(
            DrawType::PowerPaired,
            teams,
            preallocated(OddBracket::Intermediate1),
        ))
        .unwrap();

        let summary = draw
            .pairings
            .iter()
            .map(|p| (p.aff().id(), p.neg().id(), p.bracket, p.room_rank))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("p", "r", 2.0, 1),
                ("q", "t", 1.5, 2),
                ("s", "u", 1.0, 3)
            ]
        );
    }

    #[test]
    fn second_intermediate_method_splits_the_excess() {
        let teams = vec![
            sided("a", 3.0, 90.0, Side::Aff),
            sided("b", 3.0, 80.0, Side::Aff),
            sided("c", 3.0, 70.0, Side::Aff),
            sided("d", 2.0, 0.0, Side::Neg),
            sided("e", 1.0, 80.0, Side::Neg),
            sided("f", 1.0, 70.0, Side::Neg),
        ];
        let draw = generate_draw(input(
            DrawType::PowerPaired,
            teams,
            preallocated(OddBracket::Intermediate2),
        ))
        .unwrap();

        let summary = draw
            .pairings
            .iter()
            .map(|p| (p.aff().id(), p.neg().id()))
            .collect::<Vec<_>>();
        assert_eq!(summary, vec![("a", "d"), ("b", "e"), ("c", "f")]);
        assert!((draw.pairings[0].bracket - (3.0 - 1.0 / 3.0)).abs() < 1e-9);
        assert!((draw.pairings[1].bracket - (3.0 - 2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(draw.pairings[1].bracket, draw.pairings[2].bracket);
    }

    #[test]
    fn unsupported_option_combinations_are_rejected() {
        let teams = (0..4)
            .map(|i| {
                sided(
                    &format!("t{i}"),
                    0.0,
                    0.0,
                    if i % 2 == 0 { Side::Aff } else { Side::Neg },
                )
            })
            .collect::<Vec<_>>();

        let options = preallocated(OddBracket::IntermediateBubbleUpDown);
        assert!(matches!(
            generate_draw(input(DrawType::PowerPaired, teams.clone(), options)),
            Err(MakeDrawError::InvalidConfiguration(_))
        ));

        let options = quiet(DrawOptions {
            odd_bracket: OddBracket::Intermediate2,
            ..Default::default()
        });
        assert!(matches!(
            generate_draw(input(DrawType::PowerPaired, teams, options)),
            Err(MakeDrawError::InvalidConfiguration(_))
        ));
    }
}
