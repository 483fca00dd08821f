use serde::{Deserialize, Serialize};

use crate::tournaments::{
    rounds::side_names::Side,
    teams::{Team, TeamStanding},
};

pub mod drawalgs;

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
)]
pub enum DrawStatus {
    #[serde(rename = "N")]
    #[default]
    None,
    #[serde(rename = "D")]
    Draft,
    #[serde(rename = "C")]
    Confirmed,
    #[serde(rename = "R")]
    Released,
}

impl std::fmt::Display for DrawStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DrawStatus::None => "none",
            DrawStatus::Draft => "draft",
            DrawStatus::Confirmed => "confirmed",
            DrawStatus::Released => "released",
        })
    }
}

/// Annotations attached to pairings (or to the teams in them) explaining
/// why the draw deviates from a plain power pairing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PairingFlag {
    #[serde(rename = "max_swapped")]
    MaxSwapped,
    #[serde(rename = "1u1d_hist")]
    OneUpOneDownHistory,
    #[serde(rename = "1u1d_inst")]
    OneUpOneDownInstitution,
    #[serde(rename = "1u1d_other")]
    OneUpOneDownOther,
    #[serde(rename = "bub_up_hist")]
    BubbleUpHistory,
    #[serde(rename = "bub_dn_hist")]
    BubbleDownHistory,
    #[serde(rename = "bub_up_inst")]
    BubbleUpInstitution,
    #[serde(rename = "bub_dn_inst")]
    BubbleDownInstitution,
    #[serde(rename = "bub_up_accom")]
    BubbleUpAccommodate,
    #[serde(rename = "bub_dn_accom")]
    BubbleDownAccommodate,
    #[serde(rename = "no_bub_updn")]
    NoBubbleUpDown,
    #[serde(rename = "pullup")]
    Pullup,
}

impl PairingFlag {
    pub fn code(self) -> &'static str {
        match self {
            PairingFlag::MaxSwapped => "max_swapped",
            PairingFlag::OneUpOneDownHistory => "1u1d_hist",
            PairingFlag::OneUpOneDownInstitution => "1u1d_inst",
            PairingFlag::OneUpOneDownOther => "1u1d_other",
            PairingFlag::BubbleUpHistory => "bub_up_hist",
            PairingFlag::BubbleDownHistory => "bub_dn_hist",
            PairingFlag::BubbleUpInstitution => "bub_up_inst",
            PairingFlag::BubbleDownInstitution => "bub_dn_inst",
            PairingFlag::BubbleUpAccommodate => "bub_up_accom",
            PairingFlag::BubbleDownAccommodate => "bub_dn_accom",
            PairingFlag::NoBubbleUpDown => "no_bub_updn",
            PairingFlag::Pullup => "pullup",
        }
    }
}

impl std::fmt::Display for PairingFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PairingFlag::MaxSwapped => "Too many swaps",
            PairingFlag::OneUpOneDownHistory => "One-up-one-down (history)",
            PairingFlag::OneUpOneDownInstitution => {
                "One-up-one-down (institution)"
            }
            PairingFlag::OneUpOneDownOther => {
                "One-up-one-down (to accommodate)"
            }
            PairingFlag::BubbleUpHistory => "Bubble up (history)",
            PairingFlag::BubbleDownHistory => "Bubble down (history)",
            PairingFlag::BubbleUpInstitution => "Bubble up (institution)",
            PairingFlag::BubbleDownInstitution => "Bubble down (institution)",
            PairingFlag::BubbleUpAccommodate => "Bubble up (to accommodate)",
            PairingFlag::BubbleDownAccommodate => {
                "Bubble down (to accommodate)"
            }
            PairingFlag::NoBubbleUpDown => "Can't bubble up/down",
            PairingFlag::Pullup => "Pull-up team",
        })
    }
}

/// A matchup produced by the draw generator. `teams[0]` is the affirmative
/// team and `teams[1]` the negative team.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Pairing {
    pub teams: [TeamStanding; 2],
    /// Usually the number of points of the teams in the pairing. Intermediate
    /// brackets sit between two integer brackets.
    pub bracket: f64,
    /// Position of the pairing in the draw, starting from 1.
    pub room_rank: usize,
    pub flags: Vec<PairingFlag>,
    /// Flags which relate to one team in particular (e.g. pullups).
    pub team_flags: [Vec<PairingFlag>; 2],
    pub division: Option<String>,
}

impl Pairing {
    pub fn new(
        aff: TeamStanding,
        neg: TeamStanding,
        bracket: f64,
        room_rank: usize,
    ) -> Self {
        Self {
            teams: [aff, neg],
            bracket,
            room_rank,
            flags: Vec::new(),
            team_flags: [Vec::new(), Vec::new()],
            division: None,
        }
    }

    pub fn aff(&self) -> &TeamStanding {
        &self.teams[0]
    }

    pub fn neg(&self) -> &TeamStanding {
        &self.teams[1]
    }

    pub fn team(&self, side: Side) -> &TeamStanding {
        &self.teams[side.index()]
    }

    pub fn swap_sides(&mut self) {
        self.teams.swap(0, 1);
        self.team_flags.swap(0, 1);
    }

    pub fn is_bye(&self) -> bool {
        self.teams.iter().any(|team| team.is_bye())
    }

    pub fn contains(&self, team_id: &str) -> bool {
        self.teams.iter().any(|team| team.id() == team_id)
    }

    pub fn add_flag(&mut self, flag: PairingFlag) {
        self.flags.push(flag);
    }

    /// Every flag on the pairing, including those attached to its teams.
    pub fn all_flags(&self) -> impl Iterator<Item = PairingFlag> + '_ {
        self.flags
            .iter()
            .chain(self.team_flags.iter().flatten())
            .copied()
    }

    pub fn has_flag(&self, flag: PairingFlag) -> bool {
        self.all_flags().any(|f| f == flag)
    }
}

impl std::fmt::Display for Pairing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} vs {} ({}/{})",
            self.aff().team.name,
            self.neg().team.name,
            self.bracket,
            self.room_rank
        )
    }
}

/// A debate which has been drawn and confirmed, as handed to the
/// adjudicator allocators.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Debate {
    pub id: String,
    pub round_seq: u32,
    pub teams: [TeamStanding; 2],
    pub bracket: f64,
    pub room_rank: usize,
    /// Higher is more important. `None` falls back to the configured
    /// default importance.
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub division: Option<String>,
}

impl Debate {
    pub fn from_pairing(
        id: impl Into<String>,
        round_seq: u32,
        pairing: Pairing,
    ) -> Self {
        Self {
            id: id.into(),
            round_seq,
            teams: pairing.teams,
            bracket: pairing.bracket,
            room_rank: pairing.room_rank,
            importance: None,
            division: pairing.division,
        }
    }

    pub fn aff(&self) -> &Team {
        &self.teams[0].team
    }

    pub fn neg(&self) -> &Team {
        &self.teams[1].team
    }

    pub fn importance_or(&self, default: f64) -> f64 {
        self.importance.unwrap_or(default)
    }
}

/// A debate from a completed (or at least allocated) round, as stored in a
/// tournament snapshot. Team and adjudicator history is derived from these.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DebateRecord {
    pub id: String,
    pub round_seq: u32,
    /// Affirmative team first.
    pub team_ids: [String; 2],
    /// One of the teams is the bye placeholder. Byes don't count towards
    /// side or pullup history.
    #[serde(default)]
    pub bye: bool,
    #[serde(default)]
    pub bracket: f64,
    #[serde(default)]
    pub room_rank: usize,
    #[serde(default)]
    pub winner: Option<Side>,
    /// Total team speaker scores, by side.
    #[serde(default)]
    pub scores: Option<[f64; 2]>,
    #[serde(default)]
    pub team_flags: [Vec<PairingFlag>; 2],
    /// Every adjudicator on the panel, including trainees.
    #[serde(default)]
    pub adjudicator_ids: Vec<String>,
}
