//! Round robin draws: every team meets every other team in its division
//! once over the course of the round robin rounds.

use std::collections::BTreeMap;

use crate::tournaments::{
    rounds::draws::{
        Pairing,
        drawalgs::{DrawContext, DrawInput, MakeDrawError},
    },
    teams::TeamStanding,
};

/// Generates the pairings for the `rr_seq`th round robin round.
///
/// Teams are grouped by division (teams without one sit the round out) and
/// ordered by name within their division. A division with an odd number of
/// teams gets a bye team, which rotates like any other team. Teams are
/// folded, and the fold is rotated once per previous round robin round while
/// the first team stays in place.
pub fn make_draw(input: &mut DrawInput) -> Result<Vec<Pairing>, MakeDrawError> {
    let DrawInput {
        teams,
        options,
        conflicts,
        history,
        rng,
        rr_seq,
        ..
    } = input;

    let excluded = teams.iter().filter(|t| t.team.division.is_none()).count();
    if excluded > 0 {
        tracing::info!(
            excluded,
            "teams without a division are not in the draw"
        );
    }

    let mut divisions: BTreeMap<String, Vec<TeamStanding>> = BTreeMap::new();
    for team in teams.iter() {
        if let Some(division) = &team.team.division {
            divisions
                .entry(division.clone())
                .or_default()
                .push(team.clone());
        }
    }
    if divisions.is_empty() {
        return Err(MakeDrawError::InvalidTeamCount(
            "no team has been assigned a division".to_string(),
        ));
    }

    let mut ctx = DrawContext::new(options, conflicts, history, rng);
    let mut pairings = Vec::new();

    for (index, (division, mut teams)) in divisions.into_iter().enumerate() {
        teams.sort_by(|a, b| a.team.name.cmp(&b.team.name));
        if teams.len() % 2 != 0 {
            teams.push(TeamStanding::bye(Some(division.clone())));
        }

        let order = rotated_fold(teams, *rr_seq);
        let half = order.len() / 2;
        let mut order = order.into_iter();
        let top = order.by_ref().take(half).collect::<Vec<_>>();

        for (aff, neg) in top.into_iter().zip(order) {
            let mut pairing =
                Pairing::new(aff, neg, (index + 1) as f64, pairings.len() + 1);
            pairing.division = Some(division.clone());
            pairings.push(pairing);
        }
    }

    ctx.allocate_sides(&mut pairings);
    Ok(pairings)
}

/// Folds `teams` (top half in order, bottom half reversed), then rotates
/// the fold `rr_seq - 1` times. In the returned order, the first half plays
/// the second half, position by position.
pub fn rotated_fold<T>(mut teams: Vec<T>, rr_seq: u32) -> Vec<T> {
    let half = teams.len() / 2;
    teams[half..].reverse();

    if half < 2 {
        return teams;
    }

    for _ in 1..rr_seq {
        // the first team of the bottom half moves to second place at the
        // top, and the last team of the top half moves to the end
        let team = teams.remove(half);
        teams.insert(1, team);
        let team = teams.remove(half);
        teams.push(team);
    }
    teams
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        config::DrawOptions,
        tournaments::{
            config::DrawType,
            rounds::draws::drawalgs::{generate_draw, test_support::*},
        },
    };

    fn in_division(id: &str, division: &str) -> TeamStanding {
        let mut team = standing(id, 0.0);
        team.team.division = Some(division.to_string());
        team
    }

    #[test]
    fn the_fold_rotates_around_the_first_team() {
        let order = rotated_fold((1..=6).collect(), 2);
        assert_eq!(order, vec![1, 6, 2, 5, 4, 3]);
    }

    #[test]
    fn everyone_meets_everyone_once() {
        let teams = (0..6)
            .map(|i| in_division(&format!("t{i}"), "north"))
            .collect::<Vec<_>>();

        let mut seen = HashSet::new();
        for rr_seq in 1..=5 {
            let mut input =
                input(DrawType::RoundRobin, teams.clone(), DrawOptions::default());
            input.rr_seq = rr_seq;
            let draw = generate_draw(input).unwrap();
            assert_complete(&draw.pairings, &teams);

            for pairing in &draw.pairings {
                let mut ids = [pairing.aff().id(), pairing.neg().id()];
                ids.sort();
                assert!(
                    seen.insert(ids.map(str::to_string)),
                    "{ids:?} met twice"
                );
            }
        }
        assert_eq!(seen.len(), 15);
    }

    #[test]
    fn odd_divisions_rotate_a_bye() {
        let teams = (0..5)
            .map(|i| in_division(&format!("t{i}"), "east"))
            .collect::<Vec<_>>();

        let mut byes = Vec::new();
        for rr_seq in 1..=5 {
            let mut input =
                input(DrawType::RoundRobin, teams.clone(), DrawOptions::default());
            input.rr_seq = rr_seq;
            let draw = generate_draw(input).unwrap();
            assert_eq!(draw.pairings.len(), 3);

            let bye = draw.pairings.iter().find(|p| p.is_bye()).unwrap();
            assert_eq!(bye.neg().id(), "bye-east");
            byes.push(bye.aff().id().to_string());
        }
        byes.sort();
        assert_eq!(byes, vec!["t0", "t1", "t2", "t3", "t4"]);
    }

    #[test]
    fn divisions_are_drawn_separately() {
        let mut teams = (0..4)
            .map(|i| in_division(&format!("n{i}"), "north"))
            .chain((0..4).map(|i| in_division(&format!("s{i}"), "south")))
            .collect::<Vec<_>>();
        teams.push(standing("loner", 0.0));

        let draw = generate_draw(input(
            DrawType::RoundRobin,
            teams,
            DrawOptions::default(),
        ))
        .unwrap();

        assert_eq!(draw.pairings.len(), 4);
        assert!(!draw.pairings.iter().any(|p| p.contains("loner")));
        for pairing in &draw.pairings {
            let division = pairing.division.as_deref().unwrap();
            assert_eq!(pairing.aff().team.division.as_deref(), Some(division));
            assert_eq!(pairing.neg().team.division.as_deref(), Some(division));
        }
        assert_eq!(
            draw.pairings.iter().map(|p| p.bracket).collect::<Vec<_>>(),
            vec![1.0, 1.0, 2.0, 2.0]
        );
    }
}
