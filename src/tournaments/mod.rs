use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    tournaments::{
        conflicts::ConflictRecords,
        participants::{Adjudicator, Institution, Room},
        rounds::{Round, RoundKind, draws::DebateRecord},
        teams::Team,
    },
};

pub mod config;
pub mod conflicts;
pub mod import;
pub mod participants;
pub mod rounds;
pub mod standings;
pub mod teams;

/// A snapshot of everything the draw and allocation engines need to know
/// about a tournament. Nothing in this crate mutates a snapshot while a draw
/// or allocation is being computed from it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Tournament {
    pub name: String,
    #[serde(default)]
    pub institutions: Vec<Institution>,
    pub teams: Vec<Team>,
    #[serde(default)]
    pub adjudicators: Vec<Adjudicator>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub conflicts: ConflictRecords,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub debates: Vec<DebateRecord>,
}

impl Tournament {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    #[tracing::instrument]
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let tournament = Self::from_json_str(&s)?;
        tracing::debug!(
            teams = tournament.teams.len(),
            adjudicators = tournament.adjudicators.len(),
            rounds = tournament.rounds.len(),
            "loaded tournament snapshot"
        );
        Ok(tournament)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let s = serde_json::to_string_pretty(self)?;
        std::fs::write(path, s).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == id)
    }

    pub fn adjudicator(&self, id: &str) -> Option<&Adjudicator> {
        self.adjudicators.iter().find(|adj| adj.id == id)
    }

    pub fn round(&self, seq: u32) -> Option<&Round> {
        self.rounds.iter().find(|round| round.seq == seq)
    }

    pub fn round_mut(&mut self, seq: u32) -> Option<&mut Round> {
        self.rounds.iter_mut().find(|round| round.seq == seq)
    }

    /// Rounds without an entry in `rounds` are treated as preliminary.
    pub fn is_preliminary(&self, seq: u32) -> bool {
        self.round(seq)
            .map(|round| round.kind == RoundKind::Preliminary)
            .unwrap_or(true)
    }

    pub fn debates_in_round(
        &self,
        seq: u32,
    ) -> impl Iterator<Item = &DebateRecord> {
        self.debates.iter().filter(move |debate| debate.round_seq == seq)
    }

    pub fn next_round_seq(&self) -> u32 {
        self.rounds
            .iter()
            .map(|round| round.seq)
            .chain(self.debates.iter().map(|debate| debate.round_seq))
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Teams which won their debate in the given round, in the order the
    /// debates were recorded (which is draw order).
    pub fn winners_of_round(&self, seq: u32) -> Vec<String> {
        self.debates_in_round(seq)
            .filter_map(|debate| {
                debate
                    .winner
                    .map(|side| debate.team_ids[side.index()].clone())
            })
            .collect()
    }
}
