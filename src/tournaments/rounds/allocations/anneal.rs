//! Simulated annealing over an existing allocation (usually the stab
//! allocator's). Panels are mutated by swapping single adjudicators or
//! whole panels between debates, and moves are accepted by the Metropolis
//! criterion while the temperature cools exponentially.

use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::{
    config::AnnealConfig,
    tournaments::{
        participants::Adjudicator,
        rounds::{
            allocations::{
                AdjudicatorAllocation, AllocationInput, AllocationOutcome,
            },
            draws::Debate,
        },
    },
};

/// The parts of a panel's energy. Each is weighted by the matching field of
/// [`AnnealConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnergyTerm {
    AdjTeamConflict,
    AdjTeamHistory,
    AdjAdjHistory,
    AdjAdjConflict,
    TargetPanelStrength,
}

impl EnergyTerm {
    pub const ALL: [EnergyTerm; 5] = [
        EnergyTerm::AdjTeamConflict,
        EnergyTerm::AdjTeamHistory,
        EnergyTerm::AdjAdjHistory,
        EnergyTerm::AdjAdjConflict,
        EnergyTerm::TargetPanelStrength,
    ];

    fn weight(self, config: &AnnealConfig) -> f64 {
        match self {
            EnergyTerm::AdjTeamConflict => config.adj_team_conflict,
            EnergyTerm::AdjTeamHistory => config.adj_team_history,
            EnergyTerm::AdjAdjHistory => config.adj_adj_history,
            EnergyTerm::AdjAdjConflict => config.adj_adj_conflict,
            EnergyTerm::TargetPanelStrength => config.target_panel_strength,
        }
    }
}

/// The panel allocated to each debate, in the annealer's debate order.
/// States are never modified; a move produces a new state.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnealState {
    pub panels: Vec<Vec<Adjudicator>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    /// Exchange `panels[a][i]` with `panels[b][j]`.
    MemberSwap { a: usize, i: usize, b: usize, j: usize },
    PanelSwap { a: usize, b: usize },
}

impl Move {
    fn debates(self) -> (usize, usize) {
        match self {
            Move::MemberSwap { a, b, .. } | Move::PanelSwap { a, b } => (a, b),
        }
    }
}

impl AnnealState {
    pub fn apply(&self, mv: Move) -> AnnealState {
        let mut panels = self.panels.clone();
        match mv {
            Move::PanelSwap { a, b } => panels.swap(a, b),
            Move::MemberSwap { a, i, b, j } => {
                let member = std::mem::replace(
                    &mut panels[a][i],
                    self.panels[b][j].clone(),
                );
                panels[b][j] = member;
            }
        }
        AnnealState { panels }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct AnnealReport {
    pub initial_energy: f64,
    pub best_energy: f64,
    pub accepted: usize,
    pub improved: usize,
    /// The best energy so far, after each step.
    pub best_energies: Vec<f64>,
}

pub struct Annealer<'a> {
    input: &'a AllocationInput,
    debates: Vec<&'a Debate>,
    /// Target average panel score of each debate.
    targets: Vec<f64>,
    terms: Vec<EnergyTerm>,
}

impl<'a> Annealer<'a> {
    /// Debates higher up the draw get a stronger target panel, spread
    /// linearly over the range of brackets.
    pub fn new(input: &'a AllocationInput) -> Self {
        let debates = input.debates.iter().collect::<Vec<_>>();
        let top = debates
            .iter()
            .map(|d| d.bracket)
            .fold(f64::NEG_INFINITY, f64::max);
        let bottom = debates
            .iter()
            .map(|d| d.bracket)
            .fold(f64::INFINITY, f64::min);
        let step = 3.0 / ((top - bottom) + 2.0);
        let targets = debates
            .iter()
            .map(|d| 2.0 + (d.bracket - bottom + 1.0) * step)
            .collect();

        Self {
            input,
            debates,
            targets,
            terms: EnergyTerm::ALL.to_vec(),
        }
    }

    pub fn with_terms(mut self, terms: &[EnergyTerm]) -> Self {
        self.terms = terms.to_vec();
        self
    }

    pub fn debates(&self) -> &[&'a Debate] {
        &self.debates
    }

    pub fn target(&self, debate: usize) -> f64 {
        self.targets[debate]
    }

    /// The state matching `allocations`, with every voting adjudicator on
    /// the panel of their debate.
    pub fn state_of(
        &self,
        allocations: &[AdjudicatorAllocation],
    ) -> AnnealState {
        let panels = self
            .debates
            .iter()
            .map(|debate| {
                allocations
                    .iter()
                    .find(|a| a.debate_id == debate.id)
                    .map(|a| a.voting().cloned().collect::<Vec<_>>())
                    .unwrap_or_default()
            })
            .collect();
        AnnealState { panels }
    }

    pub fn term_energy(
        &self,
        term: EnergyTerm,
        debate: usize,
        panel: &[Adjudicator],
    ) -> f64 {
        let conflicts = &self.input.conflicts;
        let history = &self.input.history;
        let teams = [self.debates[debate].aff(), self.debates[debate].neg()];

        let raw = match term {
            EnergyTerm::AdjTeamConflict => panel
                .iter()
                .map(|adj| {
                    conflicts.adjudicator_conflicts(
                        &adj.id,
                        teams.iter().map(|t| t.id.as_str()),
                    ) as f64
                })
                .sum(),
            // repeats cost more for weaker adjudicators
            EnergyTerm::AdjTeamHistory => panel
                .iter()
                .map(|adj| {
                    let seen = teams
                        .iter()
                        .map(|t| history.adjudicator_seen_team(&adj.id, &t.id))
                        .sum::<u32>();
                    f64::from(seen) * (6.0 - adj.score)
                })
                .sum(),
            EnergyTerm::AdjAdjHistory => pairs(panel)
                .map(|(a, b)| history.adjudicators_seen(&a.id, &b.id))
                .map(f64::from)
                .sum(),
            EnergyTerm::AdjAdjConflict => pairs(panel)
                .filter(|(a, b)| conflicts.adjudicators_conflict(&a.id, &b.id))
                .count() as f64,
            EnergyTerm::TargetPanelStrength => {
                if panel.is_empty() {
                    0.0
                } else {
                    let target = self.targets[debate];
                    let average = panel.iter().map(|adj| adj.score).sum::<f64>()
                        / panel.len() as f64;
                    (target - average).abs() * target * average
                }
            }
        };
        term.weight(&self.input.anneal) * raw
    }

    pub fn debate_energy(&self, debate: usize, panel: &[Adjudicator]) -> f64 {
        self.terms
            .iter()
            .map(|&term| self.term_energy(term, debate, panel))
            .sum()
    }

    pub fn energy(&self, state: &AnnealState) -> f64 {
        state
            .panels
            .iter()
            .enumerate()
            .map(|(debate, panel)| self.debate_energy(debate, panel))
            .sum()
    }

    /// A random move between two panels of the same size, if there is one.
    pub fn candidate(
        &self,
        state: &AnnealState,
        rng: &mut impl Rng,
    ) -> Option<Move> {
        let n = state.panels.len();
        if n < 2 {
            return None;
        }
        let a = rng.random_range(0..n);
        let size = state.panels[a].len();
        if size == 0 {
            return None;
        }
        let partners = (0..n)
            .filter(|&b| b != a && state.panels[b].len() == size)
            .collect::<Vec<_>>();
        if partners.is_empty() {
            return None;
        }
        let b = partners[rng.random_range(0..partners.len())];

        if rng.random_bool(0.5) {
            Some(Move::PanelSwap { a, b })
        } else {
            Some(Move::MemberSwap {
                a,
                i: rng.random_range(0..size),
                b,
                j: rng.random_range(0..size),
            })
        }
    }

    /// Anneals from `initial`, returning the best state seen.
    #[tracing::instrument(skip_all, fields(steps = self.input.anneal.steps))]
    pub fn run(
        &self,
        initial: AnnealState,
        rng: &mut impl Rng,
    ) -> (AnnealState, AnnealReport) {
        let config = &self.input.anneal;
        let mut scores = initial
            .panels
            .iter()
            .enumerate()
            .map(|(debate, panel)| self.debate_energy(debate, panel))
            .collect::<Vec<_>>();
        let mut state = initial;
        let mut energy = scores.iter().sum::<f64>();

        let mut report = AnnealReport {
            initial_energy: energy,
            best_energy: energy,
            ..Default::default()
        };
        let mut best = state.clone();
        let cooling = -(config.max_temp / config.min_temp).ln();

        for step in 0..config.steps {
            if report.best_energy == 0.0 {
                break;
            }
            let temp = config.max_temp
                * (cooling * step as f64 / config.steps as f64).exp();

            if let Some(mv) = self.candidate(&state, rng) {
                let (a, b) = mv.debates();
                let next = state.apply(mv);
                let new_a = self.debate_energy(a, &next.panels[a]);
                let new_b = self.debate_energy(b, &next.panels[b]);
                let diff = new_a + new_b - scores[a] - scores[b];

                if diff < 0.0 || (-diff / temp).exp() > rng.random::<f64>() {
                    state = next;
                    scores[a] = new_a;
                    scores[b] = new_b;
                    energy = scores.iter().sum();
                    report.accepted += 1;

                    if energy < report.best_energy {
                        best = state.clone();
                        report.best_energy = energy;
                        report.improved += 1;
                    }
                }
            }
            report.best_energies.push(report.best_energy);
        }

        tracing::debug!(
            initial = report.initial_energy,
            best = report.best_energy,
            accepted = report.accepted,
            improved = report.improved,
            "annealing finished"
        );
        (best, report)
    }
}

fn pairs(
    panel: &[Adjudicator],
) -> impl Iterator<Item = (&Adjudicator, &Adjudicator)> {
    panel
        .iter()
        .enumerate()
        .flat_map(move |(i, a)| panel[i + 1..].iter().map(move |b| (a, b)))
}

/// Improves `initial` by annealing. The chair of each resulting panel is
/// its best adjudicator.
pub fn allocate(
    input: &AllocationInput,
    initial: Vec<AdjudicatorAllocation>,
    rng: &mut ChaCha20Rng,
) -> AllocationOutcome {
    let annealer = Annealer::new(input);
    let (best, report) = annealer.run(annealer.state_of(&initial), rng);

    let penalty = best
        .panels
        .iter()
        .enumerate()
        .map(|(debate, panel)| {
            EnergyTerm::ALL
                .iter()
                .filter(|&&term| term != EnergyTerm::TargetPanelStrength)
                .map(|&term| annealer.term_energy(term, debate, panel))
                .sum::<f64>()
        })
        .sum::<f64>();

    let mut warnings = Vec::new();
    if penalty > 0.0 {
        warnings.push(format!(
            "simulated annealing could not remove every conflict and repeat \
             (remaining penalty {penalty:.0}, total energy {:.0})",
            report.best_energy
        ));
    }

    let allocations = annealer
        .debates()
        .iter()
        .zip(best.panels)
        .map(|(debate, panel)| {
            AdjudicatorAllocation::from_panel(debate.id.clone(), panel)
        })
        .collect();

    AllocationOutcome {
        allocations,
        warnings,
    }
}
