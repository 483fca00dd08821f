use std::collections::HashMap;

use crate::tournaments::rounds::draws::{DebateRecord, PairingFlag};

/// Side and pullup history of each team, counted over the debates before a
/// given round. The side map is from team IDs to `[aff, neg]` counts.
#[derive(Debug, Clone, Default)]
pub struct TeamHistory {
    pub sides: HashMap<String, [u32; 2]>,
    pub pullups: HashMap<String, u32>,
}

impl TeamHistory {
    pub fn compute(debates: &[DebateRecord], before_seq: u32) -> Self {
        let mut history = TeamHistory::default();

        for debate in debates
            .iter()
            .filter(|d| d.round_seq < before_seq && !d.bye)
        {
            for (side, team_id) in debate.team_ids.iter().enumerate() {
                history.sides.entry(team_id.clone()).or_default()[side] += 1;
                if debate.team_flags[side].contains(&PairingFlag::Pullup) {
                    *history.pullups.entry(team_id.clone()).or_default() += 1;
                }
            }
        }

        history
    }

    pub fn sides_of(&self, team_id: &str) -> [u32; 2] {
        self.sides.get(team_id).copied().unwrap_or_default()
    }

    pub fn pullups_of(&self, team_id: &str) -> u32 {
        self.pullups.get(team_id).copied().unwrap_or_default()
    }
}

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Who has met whom in earlier rounds: teams against teams, adjudicators
/// judging teams and adjudicators judging alongside each other. All lookups
/// are counts, since the same pair can meet more than once.
#[derive(Debug, Clone, Default)]
pub struct HistoryInfo {
    team_team: HashMap<(String, String), u32>,
    adj_team: HashMap<(String, String), u32>,
    adj_adj: HashMap<(String, String), u32>,
}

impl HistoryInfo {
    /// Only debates from rounds strictly before `before_seq` are counted.
    #[tracing::instrument(skip(debates))]
    pub fn compute(debates: &[DebateRecord], before_seq: u32) -> Self {
        let mut info = HistoryInfo::default();
        for debate in debates.iter().filter(|d| d.round_seq < before_seq) {
            info.record(debate);
        }
        tracing::trace!(
            team_pairs = info.team_team.len(),
            adj_team_pairs = info.adj_team.len(),
            adj_adj_pairs = info.adj_adj.len(),
            "computed history"
        );
        info
    }

    pub fn record(&mut self, debate: &DebateRecord) {
        let [aff, neg] = &debate.team_ids;
        *self.team_team.entry(key(aff, neg)).or_default() += 1;

        for (i, adj) in debate.adjudicator_ids.iter().enumerate() {
            for team in &debate.team_ids {
                *self
                    .adj_team
                    .entry((adj.clone(), team.clone()))
                    .or_default() += 1;
            }
            for other in &debate.adjudicator_ids[i + 1..] {
                *self.adj_adj.entry(key(adj, other)).or_default() += 1;
            }
        }
    }

    pub fn teams_met(&self, a: &str, b: &str) -> u32 {
        self.team_team.get(&key(a, b)).copied().unwrap_or_default()
    }

    pub fn adjudicator_seen_team(&self, adj: &str, team: &str) -> u32 {
        self.adj_team
            .get(&(adj.to_string(), team.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn adjudicators_seen(&self, a: &str, b: &str) -> u32 {
        self.adj_adj.get(&key(a, b)).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournaments::rounds::side_names::Side;

    fn debate(seq: u32, aff: &str, neg: &str, adjs: &[&str]) -> DebateRecord {
        DebateRecord {
            id: format!("{seq}-{aff}-{neg}"),
            round_seq: seq,
            team_ids: [aff.to_string(), neg.to_string()],
            bye: false,
            bracket: 0.0,
            room_rank: 1,
            winner: Some(Side::Aff),
            scores: None,
            team_flags: [vec![PairingFlag::Pullup], vec![]],
            adjudicator_ids: adjs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn history_only_counts_earlier_rounds() {
        let debates = vec![
            debate(1, "a", "b", &["j1", "j2"]),
            debate(2, "b", "a", &["j1"]),
            debate(3, "a", "b", &["j1", "j2"]),
        ];

        let info = HistoryInfo::compute(&debates, 3);
        assert_eq!(info.teams_met("a", "b"), 2);
        assert_eq!(info.teams_met("b", "a"), 2);
        assert_eq!(info.adjudicator_seen_team("j1", "a"), 2);
        assert_eq!(info.adjudicator_seen_team("j2", "b"), 1);
        assert_eq!(info.adjudicators_seen("j2", "j1"), 1);
        assert_eq!(info.teams_met("a", "c"), 0);

        let sides = TeamHistory::compute(&debates, 3);
        assert_eq!(sides.sides_of("a"), [1, 1]);
        assert_eq!(sides.pullups_of("b"), 1);
        assert_eq!(sides.sides_of("c"), [0, 0]);
    }

    #[test]
    fn byes_are_not_side_or_pullup_history() {
        let mut bye = debate(1, "t5", "bye", &[]);
        bye.bye = true;
        let debates = vec![bye, debate(2, "t1", "t5", &["j1"])];

        let sides = TeamHistory::compute(&debates, 3);
        assert_eq!(sides.sides_of("t5"), [0, 1]);
        assert_eq!(sides.pullups_of("t5"), 0);
        assert_eq!(sides.sides_of("bye"), [0, 0]);

        let info = HistoryInfo::compute(&debates, 3);
        assert_eq!(info.teams_met("t5", "bye"), 1);
    }
}
