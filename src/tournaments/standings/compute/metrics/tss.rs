use std::collections::HashMap;

use crate::tournaments::{
    rounds::draws::DebateRecord,
    standings::compute::metrics::{Metric, MetricValue},
};

/// Sum of the team's speaker scores over every debate with recorded scores.
pub struct TotalTeamSpeakerScoreComputer;

impl Metric<MetricValue> for TotalTeamSpeakerScoreComputer {
    fn compute(
        &self,
        debates: &[&DebateRecord],
    ) -> HashMap<String, MetricValue> {
        let mut totals: HashMap<String, f64> = HashMap::new();

        for debate in debates {
            let Some(scores) = debate.scores else {
                continue;
            };
            for (team_id, score) in debate.team_ids.iter().zip(scores) {
                *totals.entry(team_id.clone()).or_insert(0.0) += score;
            }
        }

        totals
            .into_iter()
            .map(|(team_id, total)| (team_id, MetricValue::Float(total)))
            .collect()
    }
}
