//! One-up-one-down conflict avoidance: a conflicted debate may swap its
//! negative team with the debate directly above or below it, as in the
//! Australasian Intervarsity Debating Association rules.

use crate::{
    config::DrawOptions,
    tournaments::{
        rounds::draws::{Pairing, PairingFlag, drawalgs::DrawContext},
        teams::TeamStanding,
    },
};

pub struct OneUpOneDownSwapper {
    pub exclude_penalty: f64,
    pub history_penalty: f64,
    pub institution_penalty: f64,
    pub avoid_history: bool,
    pub avoid_institution: bool,
}

impl OneUpOneDownSwapper {
    pub fn from_options(options: &DrawOptions) -> Self {
        Self {
            exclude_penalty: -1e10,
            history_penalty: if options.avoid_history {
                options.history_penalty
            } else {
                0.0
            },
            institution_penalty: if options.avoid_institution {
                options.institution_penalty
            } else {
                0.0
            },
            avoid_history: options.avoid_history,
            avoid_institution: options.avoid_institution,
        }
    }

    /// Picks the elements of `data` with the largest possible sum such that
    /// no two picked elements are adjacent. Negative elements are never
    /// picked. Returns the sum and the picked indices, in order.
    pub fn dp(data: &[f64]) -> (f64, Vec<usize>) {
        let n = data.len() + 1;

        // state[i] is the best sum using the first i - 1 elements; action[i]
        // is set if element i - 2 is picked in that best sum
        let mut state = vec![0.0; n + 1];
        let mut action = vec![false; n + 1];

        for i in 2..=n {
            if state[i - 2] + data[i - 2] > state[i - 1] {
                action[i] = true;
                state[i] = state[i - 2] + data[i - 2];
            } else {
                state[i] = state[i - 1];
            }
        }

        let mut picked = Vec::new();
        let mut j = n;
        while j >= 2 {
            if action[j] {
                picked.push(j - 2);
                j -= 2;
            } else {
                j -= 1;
            }
        }
        picked.reverse();

        (state[n], picked)
    }

    /// How much better the draw gets by swapping the negative teams of the
    /// two debates. The higher, the more we want the swap.
    pub fn score_swap(
        &self,
        ctx: &DrawContext,
        (a1, n1): (&TeamStanding, &TeamStanding),
        (a2, n2): (&TeamStanding, &TeamStanding),
    ) -> f64 {
        let inst = [ctx.conflict_inst(a1, n1), ctx.conflict_inst(a2, n2)];
        let hist = [ctx.conflict_hist(a1, n1), ctx.conflict_hist(a2, n2)];

        let conflicted = (self.avoid_institution && inst.contains(&true))
            || (self.avoid_history && hist.iter().sum::<u32>() > 0);
        if !conflicted {
            return self.exclude_penalty;
        }

        let inst_swap = [ctx.conflict_inst(a1, n2), ctx.conflict_inst(a2, n1)];
        let hist_swap = [ctx.conflict_hist(a1, n2), ctx.conflict_hist(a2, n1)];

        // never swap into more history conflicts
        if self.avoid_history
            && hist_swap.iter().sum::<u32>() > hist.iter().sum::<u32>()
        {
            return self.exclude_penalty;
        }

        let badness = |inst: [bool; 2], hist: [u32; 2]| {
            inst.iter().filter(|&&c| c).count() as f64 * self.institution_penalty
                + f64::from(hist[0] + hist[1]) * self.history_penalty
        };

        // the discount means that of two otherwise-equivalent combinations of
        // swaps, the one with fewer swaps wins
        badness(inst, hist) - badness(inst_swap, hist_swap) - 1e-3
    }

    /// Returns the indices `i` of the debates which should swap negative
    /// teams with debate `i + 1`.
    pub fn run(
        &self,
        ctx: &DrawContext,
        draw: &[Pairing],
    ) -> (f64, Vec<usize>) {
        let mut swap_scores = draw
            .windows(2)
            .map(|pair| {
                self.score_swap(
                    ctx,
                    (pair[0].aff(), pair[0].neg()),
                    (pair[1].aff(), pair[1].neg()),
                )
            })
            .collect::<Vec<_>>();

        // if there are two equivalent ways to resolve a conflict, prefer the
        // swap higher in the draw
        let len = swap_scores.len();
        for (i, score) in swap_scores.iter_mut().enumerate() {
            if *score > 0.0 {
                *score += (len - i) as f64 * 1e-6;
            }
        }

        Self::dp(&swap_scores)
    }
}

/// Runs the swapper over one bracket, and annotates every pairing that
/// changed with the reason it changed (judged on the original pairing).
pub(crate) fn avoid_conflicts(ctx: &DrawContext, bracket: &mut [Pairing]) {
    let swapper = OneUpOneDownSwapper::from_options(ctx.options);
    let (score, swaps) = swapper.run(ctx, bracket);
    if swaps.is_empty() {
        return;
    }
    tracing::debug!(?swaps, score, "one-up-one-down swaps");

    for &i in &swaps {
        for k in [i, i + 1] {
            let pairing = &bracket[k];
            let hist = ctx.conflict_hist(pairing.aff(), pairing.neg()) > 0;
            let inst = ctx.conflict_inst(pairing.aff(), pairing.neg());
            let pairing = &mut bracket[k];
            if hist {
                pairing.add_flag(PairingFlag::OneUpOneDownHistory);
            }
            if inst {
                pairing.add_flag(PairingFlag::OneUpOneDownInstitution);
            }
            if !(hist || inst) {
                pairing.add_flag(PairingFlag::OneUpOneDownOther);
            }
        }

        let (upper, lower) = bracket.split_at_mut(i + 1);
        std::mem::swap(&mut upper[i].teams[1], &mut lower[0].teams[1]);
    }
}
