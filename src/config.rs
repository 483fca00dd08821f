use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::tournaments::config::{
    AllocationMethod, AvoidConflicts, OddBracket, PairingMethod,
    PullupRestriction, SideAllocations,
};

/// Penalties are added up into assignment costs, which have to stay well
/// inside the range the solver works in.
pub const MAX_PENALTY: f64 = 1e9;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("could not serialize configuration: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid tournament snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid csv input: {0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Invalid(String),
}

/// All the knobs of the draw generator and the adjudicator allocators.
///
/// This is stored (and edited) as TOML. Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TournamentConfig {
    pub draw: DrawOptions,
    pub adjudication: AdjudicationConfig,
    pub anneal: AnnealConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DrawOptions {
    pub side_allocations: SideAllocations,
    pub avoid_history: bool,
    pub avoid_institution: bool,
    pub history_penalty: f64,
    pub institution_penalty: f64,
    pub odd_bracket: OddBracket,
    pub pairing_method: PairingMethod,
    pub avoid_conflicts: AvoidConflicts,
    pub pullup_restriction: PullupRestriction,
    /// Random draws only: swaps to try per conflicted pairing before giving
    /// up and flagging it.
    pub max_swap_attempts: usize,
    /// Graph pairing only: penalty for pairing two teams that have both been
    /// on the same side more often than the other.
    pub side_penalty: f64,
    /// First elimination round only.
    pub break_size: usize,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            side_allocations: SideAllocations::Balance,
            avoid_history: true,
            avoid_institution: true,
            history_penalty: 1000.0,
            institution_penalty: 1.0,
            odd_bracket: OddBracket::IntermediateBubbleUpDown,
            pairing_method: PairingMethod::Slide,
            avoid_conflicts: AvoidConflicts::OneUpOneDown,
            pullup_restriction: PullupRestriction::None,
            max_swap_attempts: 20,
            side_penalty: 0.0,
            break_size: 8,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdjudicationConfig {
    pub method: AllocationMethod,
    pub adj_max_score: f64,
    /// Adjudicators below this score are not given a vote.
    pub adj_min_voting_score: f64,
    pub adj_chair_min_score: f64,
    pub conflict_penalty: f64,
    pub history_penalty: f64,
    /// Importance of debates which don't specify one.
    pub default_importance: f64,
    /// Lower bounds of the A, B, C and D ranks used by the stab allocator.
    /// Anything below the last bound is rank E and is not allocated.
    pub rank_thresholds: [f64; 4],
    /// Share of panel debates (taken from the most important) whose weakest
    /// seat has a relaxed quality requirement in the hungarian allocator.
    pub relaxed_seat_fraction: f64,
    pub relaxed_seat_adjustment: f64,
    /// Treat an adjudicator's own institution as a conflict.
    pub own_institution_conflicts: bool,
    /// Let the stab allocator trade panels between debates to get rid of
    /// conflicts.
    pub avoid_conflicts: bool,
    /// Attach adjudicators below the voting threshold to debates as
    /// trainees instead of leaving them out.
    pub allocate_trainees: bool,
}

impl Default for AdjudicationConfig {
    fn default() -> Self {
        Self {
            method: AllocationMethod::Hungarian,
            adj_max_score: 5.0,
            adj_min_voting_score: 1.5,
            adj_chair_min_score: 3.5,
            conflict_penalty: 1_000_000.0,
            history_penalty: 10_000.0,
            default_importance: 2.0,
            rank_thresholds: [4.5, 3.5, 2.5, 1.5],
            relaxed_seat_fraction: 0.5,
            relaxed_seat_adjustment: -1.0,
            own_institution_conflicts: false,
            avoid_conflicts: true,
            allocate_trainees: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnnealConfig {
    pub steps: usize,
    pub max_temp: f64,
    pub min_temp: f64,
    pub adj_team_conflict: f64,
    pub adj_team_history: f64,
    pub adj_adj_history: f64,
    pub adj_adj_conflict: f64,
    pub target_panel_strength: f64,
    pub seed: Option<u64>,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            steps: 800,
            max_temp: 1e4,
            min_temp: 1.0,
            adj_team_conflict: 10_000.0,
            adj_team_history: 100.0,
            adj_adj_history: 30.0,
            adj_adj_conflict: 10_000.0,
            target_panel_strength: 800.0,
            seed: None,
        }
    }
}

impl TournamentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: TournamentConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Rejects combinations that can never produce a draw or allocation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let anneal = &self.anneal;
        if anneal.min_temp <= 0.0 || anneal.max_temp < anneal.min_temp {
            return Err(ConfigError::Invalid(format!(
                "annealing temperatures must satisfy 0 < min_temp <= max_temp \
                 (got min_temp = {}, max_temp = {})",
                anneal.min_temp, anneal.max_temp
            )));
        }

        let adj = &self.adjudication;
        if !adj
            .rank_thresholds
            .windows(2)
            .all(|pair| pair[0] > pair[1])
        {
            return Err(ConfigError::Invalid(
                "rank thresholds must be strictly decreasing".to_string(),
            ));
        }
        for (name, penalty) in [
            ("adjudication.conflict_penalty", adj.conflict_penalty),
            ("adjudication.history_penalty", adj.history_penalty),
            ("draw.history_penalty", self.draw.history_penalty),
            ("draw.institution_penalty", self.draw.institution_penalty),
        ] {
            if !(0.0..=MAX_PENALTY).contains(&penalty) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must lie in [0, {MAX_PENALTY:e}] (got {penalty})"
                )));
            }
        }
        if !(0.0..=1.0).contains(&adj.relaxed_seat_fraction) {
            return Err(ConfigError::Invalid(format!(
                "relaxed_seat_fraction must lie in [0, 1] (got {})",
                adj.relaxed_seat_fraction
            )));
        }

        if self.draw.break_size < 2 {
            return Err(ConfigError::Invalid(
                "at least two teams must break".to_string(),
            ));
        }

        Ok(())
    }
}

/// Loads the configuration from `path`, or from the file named by
/// `TABROOM_CONFIG` if no path is given. With neither, the defaults apply.
#[tracing::instrument]
pub fn load_config(
    path: Option<&Path>,
) -> Result<TournamentConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match std::env::var("TABROOM_CONFIG") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                tracing::debug!("no configuration file given, using defaults");
                return Ok(TournamentConfig::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|source| ConfigError::Io { path: path.clone(), source })?;

    TournamentConfig::from_toml_str(&contents)
}
