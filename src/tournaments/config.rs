use serde::{Deserialize, Serialize};

/// The kind of draw to generate for a round.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum DrawType {
    #[serde(rename = "random")]
    #[default]
    Random,
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "round_robin")]
    RoundRobin,
    #[serde(rename = "power_paired")]
    PowerPaired,
    #[serde(rename = "first_elimination")]
    FirstElimination,
    #[serde(rename = "elimination")]
    Elimination,
}

impl std::fmt::Display for DrawType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DrawType::Random => "random",
            DrawType::Manual => "manual",
            DrawType::RoundRobin => "round robin",
            DrawType::PowerPaired => "power paired",
            DrawType::FirstElimination => "first elimination",
            DrawType::Elimination => "elimination",
        })
    }
}

#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum SideAllocations {
    /// The team that has affirmed less often affirms; ties are broken at
    /// random.
    #[serde(rename = "balance")]
    #[default]
    Balance,
    #[serde(rename = "random")]
    Random,
    /// Teams carry a side assigned before the draw.
    #[serde(rename = "preallocated")]
    Preallocated,
    /// Sides are decided in the room and reported on the ballot. For the
    /// purposes of the draw this behaves like [`SideAllocations::Balance`].
    #[serde(rename = "manual_ballot")]
    ManualBallot,
}

#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum OddBracket {
    #[serde(rename = "pullup_top")]
    PullupTop,
    #[serde(rename = "pullup_bottom")]
    PullupBottom,
    #[serde(rename = "pullup_middle")]
    PullupMiddle,
    #[serde(rename = "pullup_random")]
    PullupRandom,
    #[serde(rename = "intermediate")]
    Intermediate,
    #[serde(rename = "intermediate_bubble_up_down")]
    #[default]
    IntermediateBubbleUpDown,
    /// Preallocated sides only: at most one intermediate bracket between two
    /// brackets, filled from as many brackets below as necessary.
    #[serde(rename = "intermediate1")]
    Intermediate1,
    /// Preallocated sides only: every intermediate bracket holds teams from
    /// the same pair of brackets, so there can be several between two
    /// brackets.
    #[serde(rename = "intermediate2")]
    Intermediate2,
}

impl std::fmt::Display for OddBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OddBracket::PullupTop => "pull up top team",
            OddBracket::PullupBottom => "pull up bottom team",
            OddBracket::PullupMiddle => "pull up middle team",
            OddBracket::PullupRandom => "pull up random team",
            OddBracket::Intermediate => "intermediate brackets",
            OddBracket::IntermediateBubbleUpDown => {
                "intermediate brackets with bubble up/down"
            }
            OddBracket::Intermediate1 => "intermediate brackets (method 1)",
            OddBracket::Intermediate2 => "intermediate brackets (method 2)",
        })
    }
}

#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum PairingMethod {
    /// 1 vs 6, 2 vs 7, ..., 5 vs 10 (in a ten-team bracket).
    #[serde(rename = "slide")]
    #[default]
    Slide,
    /// 1 vs 10, 2 vs 9, ..., 5 vs 6.
    #[serde(rename = "fold")]
    Fold,
    #[serde(rename = "random")]
    Random,
    /// 1 vs 2, 3 vs 4, ...
    #[serde(rename = "adjacent")]
    Adjacent,
    /// Fold in the top bracket, adjacent everywhere else.
    #[serde(rename = "fold_top_adjacent_rest")]
    FoldTopAdjacentRest,
}

#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum AvoidConflicts {
    #[serde(rename = "off")]
    Off,
    /// Swap conflicted teams with the debate above or below, in accordance
    /// with Australasian Intervarsity Debating Association rules.
    #[serde(rename = "one_up_one_down")]
    #[default]
    OneUpOneDown,
    /// Pair each bracket by minimum weight matching over conflict penalties.
    #[serde(rename = "graph")]
    Graph,
}

/// Restriction on which teams may be pulled up into a higher bracket.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum PullupRestriction {
    #[serde(rename = "none")]
    #[default]
    None,
    /// Choose from the teams that have been pulled up the fewest times.
    #[serde(rename = "least_to_date")]
    LeastToDate,
}

/// Which allocator assigns adjudicators to debates.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum AllocationMethod {
    #[serde(rename = "stab")]
    Stab,
    #[serde(rename = "hungarian")]
    #[default]
    Hungarian,
    #[serde(rename = "anneal")]
    Anneal,
}

impl std::fmt::Display for AllocationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AllocationMethod::Stab => "stab",
            AllocationMethod::Hungarian => "hungarian",
            AllocationMethod::Anneal => "simulated annealing",
        })
    }
}

#[cfg(test)]
#[test]
fn test_option_names_match_preference_strings() {
    let parsed: OddBracket =
        serde_json::from_str("\"intermediate_bubble_up_down\"").unwrap();
    assert_eq!(parsed, OddBracket::IntermediateBubbleUpDown);

    let parsed: AvoidConflicts =
        serde_json::from_str("\"one_up_one_down\"").unwrap();
    assert_eq!(parsed, AvoidConflicts::OneUpOneDown);

    assert!(serde_json::from_str::<PairingMethod>("\"zigzag\"").is_err());
    assert_eq!(
        serde_json::to_string(&SideAllocations::ManualBallot).unwrap(),
        "\"manual_ballot\""
    );
}
