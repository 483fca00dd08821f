//! Imports a tournament from Tabbycat-style CSV files (one row per team,
//! adjudicator or room).

use std::{collections::HashMap, io::Read};

use serde::{
    Deserialize, Deserializer,
    de::{self, Unexpected},
};
use uuid::Uuid;

use crate::{
    config::ConfigError,
    tournaments::{
        Tournament,
        conflicts::ConflictRecords,
        participants::{Adjudicator, Institution, Room},
        teams::Team,
    },
};

/// Score given to adjudicators whose row has no `base_score`.
pub const DEFAULT_BASE_SCORE: f64 = 2.5;

fn tags_deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let str_sequence = String::deserialize(deserializer)?;
    Ok(str_sequence
        .split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect())
}

fn bool_from_str<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match String::deserialize(deserializer)?.to_lowercase().trim() {
        "t" | "true" | "1" | "on" | "y" | "yes" => Ok(true),
        "f" | "false" | "0" | "off" | "n" | "no" | "" => Ok(false),
        other => Err(de::Error::invalid_value(
            Unexpected::Str(other),
            &"Must be truthy (t, true, 1, on, y, yes) or falsey (f, false, 0, \
              off, n, no)",
        )),
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TeamRow {
    pub full_name: String,
    pub institution: Option<String>,
    pub division: Option<String>,
    #[serde(deserialize_with = "tags_deserialize", default)]
    pub institution_clashes: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AdjudicatorRow {
    pub name: String,
    pub institution: Option<String>,
    pub base_score: Option<f64>,
    #[serde(deserialize_with = "bool_from_str", default)]
    pub trainee: bool,
    #[serde(deserialize_with = "tags_deserialize", default)]
    pub institution_clashes: Vec<String>,
    /// Full names of teams.
    #[serde(deserialize_with = "tags_deserialize", default)]
    pub team_clashes: Vec<String>,
    /// Names of other adjudicators.
    #[serde(deserialize_with = "tags_deserialize", default)]
    pub adjudicator_clashes: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RoomRow {
    pub name: String,
}

fn read_rows<T: for<'de> Deserialize<'de>>(
    reader: impl Read,
) -> Result<Vec<T>, ConfigError> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    reader
        .records()
        .map(|record| -> Result<T, ConfigError> {
            Ok(record?.deserialize(Some(&headers))?)
        })
        .collect()
}

#[derive(Default)]
struct Institutions {
    by_name: HashMap<String, String>,
    list: Vec<Institution>,
}

impl Institutions {
    fn get_or_create(&mut self, name: &str) -> String {
        if let Some(id) = self.by_name.get(name) {
            return id.clone();
        }
        let id = Uuid::now_v7().to_string();
        self.list.push(Institution {
            id: id.clone(),
            name: name.to_string(),
            code: name.to_string(),
        });
        self.by_name.insert(name.to_string(), id.clone());
        id
    }
}

/// Reads teams, adjudicators and (optionally) rooms. Institutions are
/// created as they are mentioned, and clashes are resolved by name.
#[tracing::instrument(skip_all)]
pub fn import_csv(
    name: &str,
    teams: impl Read,
    adjudicators: impl Read,
    rooms: Option<impl Read>,
) -> Result<Tournament, ConfigError> {
    let team_rows = read_rows::<TeamRow>(teams)?;
    let adjudicator_rows = read_rows::<AdjudicatorRow>(adjudicators)?;
    let room_rows = match rooms {
        Some(rooms) => read_rows::<RoomRow>(rooms)?,
        None => Vec::new(),
    };

    let mut institutions = Institutions::default();
    let mut conflicts = ConflictRecords::default();

    let mut team_ids = HashMap::new();
    let mut teams = Vec::with_capacity(team_rows.len());
    for row in team_rows {
        let id = Uuid::now_v7().to_string();
        let institution_id = row
            .institution
            .as_deref()
            .map(|inst| institutions.get_or_create(inst));
        for inst in &row.institution_clashes {
            conflicts
                .team_inst
                .push((id.clone(), institutions.get_or_create(inst)));
        }
        team_ids.insert(row.full_name.clone(), id.clone());
        teams.push(Team {
            id,
            name: row.full_name,
            institution_id,
            kind: Default::default(),
            division: row.division,
        });
    }

    let adj_ids = adjudicator_rows
        .iter()
        .map(|row| (row.name.clone(), Uuid::now_v7().to_string()))
        .collect::<HashMap<_, _>>();
    let mut adjudicators = Vec::with_capacity(adjudicator_rows.len());
    for row in adjudicator_rows {
        let id = adj_ids[&row.name].clone();
        for inst in &row.institution_clashes {
            conflicts
                .adj_inst
                .push((id.clone(), institutions.get_or_create(inst)));
        }
        for team in &row.team_clashes {
            let team_id = team_ids.get(team).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "adjudicator {} clashes with unknown team {team}",
                    row.name
                ))
            })?;
            conflicts.adj_team.push((id.clone(), team_id.clone()));
        }
        for other in &row.adjudicator_clashes {
            let other_id = adj_ids.get(other).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "adjudicator {} clashes with unknown adjudicator {other}",
                    row.name
                ))
            })?;
            conflicts.adj_adj.push((id.clone(), other_id.clone()));
        }

        adjudicators.push(Adjudicator {
            id,
            name: row.name,
            institution_id: row
                .institution
                .as_deref()
                .map(|inst| institutions.get_or_create(inst)),
            score: row.base_score.unwrap_or(DEFAULT_BASE_SCORE),
            accredited: !row.trainee,
        });
    }

    let rooms = room_rows
        .into_iter()
        .map(|row| Room {
            id: Uuid::now_v7().to_string(),
            name: row.name,
        })
        .collect();

    tracing::info!(
        teams = teams.len(),
        adjudicators = adjudicators.len(),
        institutions = institutions.list.len(),
        "imported tournament"
    );

    Ok(Tournament {
        name: name.to_string(),
        institutions: institutions.list,
        teams,
        adjudicators,
        rooms,
        conflicts,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEAMS: &str = "\
full_name,institution,division,institution_clashes
Alpha A,Alpha,,
Alpha B,Alpha,,Beta
Beta A,Beta,,
";

    const ADJUDICATORS: &str = concat!(
        "name,institution,base_score,trainee,",
        "institution_clashes,team_clashes,adjudicator_clashes\n",
        "Ann,Alpha,4.5,,,Beta A,\n",
        "Bob,,,yes,Gamma,,Ann\n",
    );

    #[test]
    fn imports_teams_adjudicators_and_clashes() {
        let tournament = import_csv(
            "test",
            TEAMS.as_bytes(),
            ADJUDICATORS.as_bytes(),
            Some("name\nRoom 1\nRoom 2\n".as_bytes()),
        )
        .unwrap();

        assert_eq!(tournament.teams.len(), 3);
        assert_eq!(tournament.rooms.len(), 2);
        assert_eq!(
            tournament
                .institutions
                .iter()
                .map(|inst| inst.name.as_str())
                .collect::<Vec<_>>(),
            vec!["Alpha", "Beta", "Gamma"]
        );

        let ann = &tournament.adjudicators[0];
        assert_eq!(ann.score, 4.5);
        assert!(ann.accredited);
        let bob = &tournament.adjudicators[1];
        assert_eq!(bob.score, DEFAULT_BASE_SCORE);
        assert!(!bob.accredited);
        assert_eq!(bob.institution_id, None);

        let beta_a =
            tournament.teams.iter().find(|t| t.name == "Beta A").unwrap();
        assert_eq!(
            tournament.conflicts.adj_team,
            vec![(ann.id.clone(), beta_a.id.clone())]
        );
        assert_eq!(
            tournament.conflicts.adj_adj,
            vec![(bob.id.clone(), ann.id.clone())]
        );
        assert_eq!(tournament.conflicts.team_inst.len(), 1);
        assert_eq!(tournament.conflicts.adj_inst.len(), 1);
    }

    #[test]
    fn unknown_team_clashes_are_rejected() {
        let adjudicators = "name,team_clashes\nAnn,Nobody\n";
        let result = import_csv(
            "test",
            TEAMS.as_bytes(),
            adjudicators.as_bytes(),
            None::<&[u8]>,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
