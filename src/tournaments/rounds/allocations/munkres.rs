//! Minimum-cost assignment, solved with `pathfinding`'s Kuhn-Munkres
//! implementation.
//!
//! Costs are fixed point with three decimal places, which is finer than
//! any penalty or score difference the allocators produce. With more rows
//! than columns the matrix is transposed, so some rows go unassigned.

use pathfinding::{kuhn_munkres::kuhn_munkres_min, matrix::Matrix};

const SCALE: f64 = 1000.0;

/// Largest cost the solver tells apart from bigger ones. Sums of thousands
/// of weights this size still fit in an `i64`.
pub const MAX_COST: f64 = 1e12;

fn fixed_point(cost: f64) -> i64 {
    (cost.clamp(-MAX_COST, MAX_COST) * SCALE).round() as i64
}

/// Returns `(row, column)` pairs of a minimum total cost assignment, sorted
/// by row. Every row of `cost` must have the same length and all costs must
/// be finite.
pub fn solve(cost: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let rows = cost.len();
    let cols = cost.first().map(Vec::len).unwrap_or(0);
    if rows == 0 || cols == 0 {
        return Vec::new();
    }
    debug_assert!(cost.iter().all(|row| row.len() == cols));
    debug_assert!(cost.iter().flatten().all(|c| c.is_finite()));

    let mut assignment = if rows <= cols {
        let weights =
            Matrix::from_fn(rows, cols, |(i, j)| fixed_point(cost[i][j]));
        let (_, columns) = kuhn_munkres_min(&weights);
        columns.into_iter().enumerate().collect::<Vec<_>>()
    } else {
        let weights =
            Matrix::from_fn(cols, rows, |(j, i)| fixed_point(cost[i][j]));
        let (_, rows_of_columns) = kuhn_munkres_min(&weights);
        rows_of_columns
            .into_iter()
            .enumerate()
            .map(|(j, i)| (i, j))
            .collect::<Vec<_>>()
    };
    assignment.sort_unstable();
    assignment
}

pub fn total_cost(cost: &[Vec<f64>], assignment: &[(usize, usize)]) -> f64 {
    assignment.iter().map(|&(i, j)| cost[i][j]).sum()
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::*;

    /// Cheapest assignment of every row, by trying every permutation.
    fn brute_force(cost: &[Vec<f64>]) -> f64 {
        let cols = cost[0].len();
        (0..cols)
            .permutations(cost.len())
            .map(|perm| perm.iter().enumerate().map(|(i, &j)| cost[i][j]).sum())
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn solves_a_small_known_matrix() {
        let cost = vec![
            vec![4.0, 1.0, 3.0],
            vec![2.0, 0.0, 5.0],
            vec![3.0, 2.0, 2.0],
        ];
        let assignment = solve(&cost);
        assert_eq!(assignment, vec![(0, 1), (1, 0), (2, 2)]);
        assert_eq!(total_cost(&cost, &assignment), 5.0);
        assert_eq!(brute_force(&cost), 5.0);
    }

    #[test]
    fn matches_brute_force_on_random_matrices() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for size in 1..=6 {
            for _ in 0..20 {
                let cost = (0..size)
                    .map(|_| {
                        (0..size)
                            .map(|_| rng.random_range(0..100) as f64)
                            .collect()
                    })
                    .collect::<Vec<Vec<f64>>>();
                let assignment = solve(&cost);

                assert_eq!(assignment.len(), size);
                assert!(assignment.iter().map(|a| a.1).all_unique());
                assert_eq!(total_cost(&cost, &assignment), brute_force(&cost));
            }
        }
    }

    #[test]
    fn rectangular_matrices_leave_the_surplus_unassigned() {
        // more columns than rows: every row is assigned
        let wide = vec![vec![5.0, 1.0, 9.0, 2.0], vec![1.0, 8.0, 9.0, 3.0]];
        let assignment = solve(&wide);
        assert_eq!(assignment, vec![(0, 1), (1, 0)]);
        assert_eq!(total_cost(&wide, &assignment), brute_force(&wide));

        // more rows than columns: only as many rows as columns are assigned
        let tall = vec![vec![5.0], vec![1.0], vec![3.0]];
        assert_eq!(solve(&tall), vec![(1, 0)]);
    }

    #[test]
    fn large_penalties_are_avoided() {
        let cost = vec![vec![1e10, 0.0], vec![0.0, 1e10]];
        assert_eq!(solve(&cost), vec![(0, 1), (1, 0)]);
    }
}
