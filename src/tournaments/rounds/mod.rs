use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::tournaments::{
    config::DrawType,
    rounds::{draws::DrawStatus, side_names::Side},
};

pub mod allocations;
pub mod draws;
pub mod side_names;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Round {
    pub id: String,
    pub name: String,
    /// Rounds are numbered from 1. History lookups only consider rounds with
    /// a lower sequence number.
    pub seq: u32,
    #[serde(default)]
    pub kind: RoundKind,
    #[serde(default)]
    pub draw_type: DrawType,
    #[serde(default)]
    pub draw_status: DrawStatus,
    /// Sides fixed in advance, by team ID. Only used when sides are
    /// preallocated.
    #[serde(default)]
    pub allocated_sides: IndexMap<String, Side>,
}

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
)]
pub enum RoundKind {
    #[serde(rename = "P")]
    #[default]
    Preliminary,
    #[serde(rename = "E")]
    Elimination,
}

impl Round {
    pub fn new(seq: u32, draw_type: DrawType) -> Self {
        Self {
            id: format!("round-{seq}"),
            name: format!("Round {seq}"),
            seq,
            kind: match draw_type {
                DrawType::FirstElimination | DrawType::Elimination => {
                    RoundKind::Elimination
                }
                _ => RoundKind::Preliminary,
            },
            draw_type,
            draw_status: DrawStatus::None,
            allocated_sides: IndexMap::new(),
        }
    }
}
