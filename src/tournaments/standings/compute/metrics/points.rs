use std::collections::HashMap;

use crate::tournaments::{
    rounds::draws::DebateRecord,
    standings::compute::metrics::{Metric, MetricValue},
};

/// One point per win. Teams which debated but never won get an explicit
/// zero.
pub struct TeamPointsComputer;

impl Metric<MetricValue> for TeamPointsComputer {
    fn compute(
        &self,
        debates: &[&DebateRecord],
    ) -> HashMap<String, MetricValue> {
        let mut team_points = HashMap::new();

        for debate in debates {
            for (i, team_id) in debate.team_ids.iter().enumerate() {
                let won = debate.winner.map(|side| side.index()) == Some(i);
                *team_points.entry(team_id.clone()).or_insert(0i64) +=
                    i64::from(won);
            }
        }

        team_points
            .into_iter()
            .map(|(team_id, points)| (team_id, MetricValue::Integer(points)))
            .collect()
    }
}
