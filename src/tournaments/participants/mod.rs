use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Adjudicator {
    pub id: String,
    pub name: String,
    pub institution_id: Option<String>,
    /// Quality score, on the same scale as `adj_max_score`.
    pub score: f64,
    #[serde(default = "accredited_by_default")]
    pub accredited: bool,
}

fn accredited_by_default() -> bool {
    true
}

impl Adjudicator {
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            institution_id: None,
            score,
            accredited: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub code: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub name: String,
}

/// Returns the adjudicators sorted by descending score. Equal scores keep
/// their relative order, so callers who want random tie-breaks should
/// shuffle first.
pub fn sort_by_score_desc(adjudicators: &mut [Adjudicator]) {
    adjudicators.sort_by(|a, b| b.score.total_cmp(&a.score));
}
