use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::tournaments::{Tournament, participants::Adjudicator, teams::Team};

/// Declared conflicts, as stored in a tournament snapshot. Each entry is a
/// pair of ids.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ConflictRecords {
    /// (adjudicator, team)
    pub adj_team: Vec<(String, String)>,
    /// (adjudicator, adjudicator), in either order.
    pub adj_adj: Vec<(String, String)>,
    /// (adjudicator, institution)
    pub adj_inst: Vec<(String, String)>,
    /// (team, institution)
    pub team_inst: Vec<(String, String)>,
}

/// Read-only conflict lookups built once per draw or allocation run.
#[derive(Debug, Clone, Default)]
pub struct ConflictsInfo {
    team_institutions: HashMap<String, HashSet<String>>,
    adj_institutions: HashMap<String, HashSet<String>>,
    adj_team: HashSet<(String, String)>,
    adj_adj: HashSet<(String, String)>,
}

fn ordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl ConflictsInfo {
    /// A team is associated with its own institution and with every
    /// institution it has declared a conflict with. Adjudicators are
    /// associated with the institutions they declared; with
    /// `own_institution` set, their home institution counts as well.
    pub fn new(
        records: &ConflictRecords,
        teams: &[Team],
        adjudicators: &[Adjudicator],
        own_institution: bool,
    ) -> Self {
        let mut team_institutions: HashMap<String, HashSet<String>> =
            HashMap::new();
        for team in teams {
            let entry = team_institutions.entry(team.id.clone()).or_default();
            if let Some(inst) = &team.institution_id {
                entry.insert(inst.clone());
            }
        }
        for (team, inst) in &records.team_inst {
            team_institutions
                .entry(team.clone())
                .or_default()
                .insert(inst.clone());
        }

        let mut adj_institutions: HashMap<String, HashSet<String>> =
            HashMap::new();
        if own_institution {
            for adj in adjudicators {
                if let Some(inst) = &adj.institution_id {
                    adj_institutions
                        .entry(adj.id.clone())
                        .or_default()
                        .insert(inst.clone());
                }
            }
        }
        for (adj, inst) in &records.adj_inst {
            adj_institutions
                .entry(adj.clone())
                .or_default()
                .insert(inst.clone());
        }

        Self {
            team_institutions,
            adj_institutions,
            adj_team: records.adj_team.iter().cloned().collect(),
            adj_adj: records
                .adj_adj
                .iter()
                .map(|(a, b)| ordered(a, b))
                .collect(),
        }
    }

    pub fn from_tournament(
        tournament: &Tournament,
        own_institution: bool,
    ) -> Self {
        Self::new(
            &tournament.conflicts,
            &tournament.teams,
            &tournament.adjudicators,
            own_institution,
        )
    }

    /// Whether the two teams share an institution (including declared
    /// institution conflicts).
    pub fn same_institution(&self, a: &str, b: &str) -> bool {
        match (self.team_institutions.get(a), self.team_institutions.get(b))
        {
            (Some(a), Some(b)) => !a.is_disjoint(b),
            _ => false,
        }
    }

    pub fn adjudicator_conflicts_team(&self, adj: &str, team: &str) -> bool {
        if self.adj_team.contains(&(adj.to_string(), team.to_string())) {
            return true;
        }
        match (
            self.adj_institutions.get(adj),
            self.team_institutions.get(team),
        ) {
            (Some(a), Some(t)) => !a.is_disjoint(t),
            _ => false,
        }
    }

    /// Number of the given teams the adjudicator conflicts with.
    pub fn adjudicator_conflicts<'a>(
        &self,
        adj: &str,
        teams: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        teams
            .into_iter()
            .filter(|team| self.adjudicator_conflicts_team(adj, team))
            .count()
    }

    pub fn adjudicators_conflict(&self, a: &str, b: &str) -> bool {
        self.adj_adj.contains(&ordered(a, b))
    }
}
