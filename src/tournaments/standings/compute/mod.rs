use std::collections::HashMap;

use crate::tournaments::{
    Tournament,
    standings::compute::{
        history::TeamHistory,
        metrics::{
            Metric, MetricValue, points::TeamPointsComputer,
            tss::TotalTeamSpeakerScoreComputer,
        },
    },
    teams::TeamStanding,
};

pub mod history;
pub mod metrics;

/// Team standings going into a round: wins first, then total speaker score,
/// then name (so that the order is stable).
pub struct TournamentTeamStandings {
    pub metrics_of_team: HashMap<String, Vec<MetricValue>>,
    pub sorted: Vec<TeamStanding>,
}

impl TournamentTeamStandings {
    /// Only results from preliminary rounds before `before_seq` count towards
    /// the standings; side and pullup counts include every earlier round.
    #[tracing::instrument(
        skip(tournament),
        fields(tournament = %tournament.name)
    )]
    pub fn compute(tournament: &Tournament, before_seq: u32) -> Self {
        let counted = tournament
            .debates
            .iter()
            .filter(|debate| {
                debate.round_seq < before_seq
                    && tournament.is_preliminary(debate.round_seq)
            })
            .collect::<Vec<_>>();

        let points = TeamPointsComputer.compute(&counted);
        let speaks = TotalTeamSpeakerScoreComputer.compute(&counted);
        let history = TeamHistory::compute(&tournament.debates, before_seq);

        let mut metrics_of_team = HashMap::new();
        let mut sorted = Vec::with_capacity(tournament.teams.len());

        for team in &tournament.teams {
            let team_points = points
                .get(&team.id)
                .copied()
                .unwrap_or(MetricValue::Integer(0));
            let team_speaks = speaks
                .get(&team.id)
                .copied()
                .unwrap_or(MetricValue::Float(0.0));
            metrics_of_team
                .insert(team.id.clone(), vec![team_points, team_speaks]);

            let [aff_count, neg_count] = history.sides_of(&team.id);
            sorted.push(TeamStanding {
                team: team.clone(),
                points: team_points.as_f64(),
                speaker_score: team_speaks.as_f64(),
                aff_count,
                neg_count,
                pullups: history.pullups_of(&team.id),
                allocated_side: None,
            });
        }

        sorted.sort_by(|a, b| {
            b.points
                .total_cmp(&a.points)
                .then(b.speaker_score.total_cmp(&a.speaker_score))
                .then_with(|| a.team.name.cmp(&b.team.name))
        });

        Self {
            metrics_of_team,
            sorted,
        }
    }

    pub fn points_of_team(&self, team: &str) -> Option<f64> {
        self.metrics_of_team
            .get(team)
            .and_then(|metrics| metrics.first())
            .map(|points| points.as_f64())
    }

    pub fn standing(&self, team: &str) -> Option<&TeamStanding> {
        self.sorted.iter().find(|standing| standing.id() == team)
    }
}
