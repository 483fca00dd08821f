use serde::{Deserialize, Serialize};

use crate::tournaments::rounds::side_names::Side;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub institution_id: Option<String>,
    #[serde(default)]
    pub kind: TeamKind,
    /// Round robin draws pair teams within their division.
    #[serde(default)]
    pub division: Option<String>,
}

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default,
)]
pub enum TeamKind {
    #[serde(rename = "normal")]
    #[default]
    Normal,
    /// A placeholder opponent for a team which sits out the round.
    #[serde(rename = "bye")]
    Bye,
}

impl Team {
    /// Creates the placeholder team that fills an odd slot in a draw.
    pub fn bye(division: Option<String>) -> Team {
        let id = match &division {
            Some(division) => format!("bye-{division}"),
            None => "bye".to_string(),
        };
        Team {
            id,
            name: "Bye".to_string(),
            institution_id: None,
            kind: TeamKind::Bye,
            division,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.kind == TeamKind::Bye
    }
}

/// A team together with its standing going into a round. This is what the
/// draw generator works with; it never changes during a draw.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TeamStanding {
    pub team: Team,
    pub points: f64,
    pub speaker_score: f64,
    pub aff_count: u32,
    pub neg_count: u32,
    /// Number of times this team has been pulled up so far.
    #[serde(default)]
    pub pullups: u32,
    #[serde(default)]
    pub allocated_side: Option<Side>,
}

impl TeamStanding {
    pub fn new(team: Team) -> Self {
        Self {
            team,
            points: 0.0,
            speaker_score: 0.0,
            aff_count: 0,
            neg_count: 0,
            pullups: 0,
            allocated_side: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.team.id
    }

    pub fn bye(division: Option<String>) -> Self {
        Self::new(Team::bye(division))
    }

    pub fn is_bye(&self) -> bool {
        self.team.is_bye()
    }
}
