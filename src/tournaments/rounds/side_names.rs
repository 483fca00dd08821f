use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    #[serde(rename = "aff")]
    Aff,
    #[serde(rename = "neg")]
    Neg,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Aff => Side::Neg,
            Side::Neg => Side::Aff,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::Aff => 0,
            Side::Neg => 1,
        }
    }
}

pub fn name_of_side(side: Side, short: bool) -> &'static str {
    match (side, short) {
        (Side::Aff, true) => "Aff",
        (Side::Aff, false) => "Affirmative",
        (Side::Neg, true) => "Neg",
        (Side::Neg, false) => "Negative",
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(name_of_side(*self, false))
    }
}
