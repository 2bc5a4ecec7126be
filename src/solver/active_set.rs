//! Lawson–Hanson active-set method for non-negative least squares.
//!
//! Works on the normal form `Q·x = b` of the objective. Each outer step frees
//! the bound variable with the steepest descent direction and solves the
//! unconstrained subproblem over the free set, backing off along the segment
//! whenever a free variable would turn negative. The objective strictly
//! decreases between outer steps, so a free set is never revisited and the
//! method stops at the exact optimum after finitely many steps.

use super::{BoundedMinimizer, Minimum, Objective, SolverConfig};
use crate::matrix::Matrix;

#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveSet;

impl BoundedMinimizer for ActiveSet {
    /// Starts from the origin; `x0` only fixes the dimension.
    fn minimize(&self, objective: &Objective<'_>, x0: Vec<f64>, config: &SolverConfig) -> Minimum {
        let (q, b) = objective.quadratic();
        let n = x0.len();

        let mut x = vec![0.0; n];
        let mut free = vec![false; n];
        // columns that made the free subproblem singular since the last step
        let mut blocked = vec![false; n];
        // w = b − Q·x is −∇f / 2
        let threshold = 0.5 * config.gradient_tolerance;
        let mut iterations = 0;

        loop {
            let w = descent(&q, &b, &x);
            let entering = (0..n)
                .filter(|&j| !free[j] && !blocked[j] && w[j] > threshold)
                .max_by(|&i, &j| w[i].total_cmp(&w[j]));

            let Some(entering) = entering else {
                return Minimum {
                    x,
                    iterations,
                    converged: true,
                };
            };
            if iterations == config.max_iterations {
                return Minimum {
                    x,
                    iterations,
                    converged: false,
                };
            }
            iterations += 1;
            free[entering] = true;

            let mut first = true;
            loop {
                let z = match solve_free(&q, &b, &free) {
                    Some(z) if !(first && z[entering] <= 0.0) => z,
                    // the new column adds nothing the free set can use
                    _ => {
                        free[entering] = false;
                        blocked[entering] = true;
                        break;
                    }
                };
                first = false;

                if (0..n).all(|i| !free[i] || z[i] > 0.0) {
                    x = z;
                    blocked.iter_mut().for_each(|v| *v = false);
                    break;
                }

                // Step towards z until the first free variable hits zero
                let mut step: Option<(usize, f64)> = None;
                for i in (0..n).filter(|&i| free[i] && z[i] <= 0.0) {
                    let ratio = x[i] / (x[i] - z[i]);
                    if step.map_or(true, |(_, alpha)| ratio < alpha) {
                        step = Some((i, ratio));
                    }
                }
                let (leaving, alpha) = step.unwrap_or((entering, 0.0));
                for i in 0..n {
                    x[i] += alpha * (z[i] - x[i]);
                }
                x[leaving] = 0.0;
                for i in 0..n {
                    if free[i] && x[i] <= 0.0 {
                        free[i] = false;
                        x[i] = 0.0;
                    }
                }
            }
        }
    }
}

/// `b − Q·x`
fn descent(q: &Matrix, b: &[f64], x: &[f64]) -> Vec<f64> {
    let qx = q.mul_vec(x);
    b.iter().zip(&qx).map(|(bi, qi)| bi - qi).collect()
}

/// Minimize over the free variables with the rest held at zero.
fn solve_free(q: &Matrix, b: &[f64], free: &[bool]) -> Option<Vec<f64>> {
    let indices: Vec<usize> = (0..free.len()).filter(|&i| free[i]).collect();
    let mut sub = Matrix::zeros(indices.len(), indices.len());
    for (r, &i) in indices.iter().enumerate() {
        for (c, &j) in indices.iter().enumerate() {
            sub.set(r, c, q.get(i, j));
        }
    }
    let rhs: Vec<f64> = indices.iter().map(|&i| b[i]).collect();

    let solved = sub.solve(&rhs)?;
    let mut z = vec![0.0; free.len()];
    for (&i, v) in indices.iter().zip(solved) {
        z[i] = v;
    }
    Some(z)
}

#[cfg(test)]
mod tests {
    use super::super::tests::problem;
    use super::super::*;
    use super::*;

    fn run(p: &MixProblem) -> Solution {
        solve_with(p, &SolverConfig::default(), &ActiveSet)
    }

    #[test]
    fn close_mics_reach_exact_optimum() {
        // two mics on one source, columns (1, 0.10) and (1, 0.12)
        let rows = [vec![1.0, 1.0], vec![0.10, 0.12]];
        for (target, expected) in [([0.5, 0.055], [0.25, 0.25]), ([0.6, 0.07], [0.1, 0.5])] {
            let p = problem(&rows, &target, &[0.0, 0.0]);
            let s = run(&p);
            assert!(s.converged, "{target:?}");
            assert!(s.iterations <= 4, "{target:?}: {} iterations", s.iterations);
            assert!((s.gains[0] - expected[0]).abs() < 1e-9, "{:?}", s.gains);
            assert!((s.gains[1] - expected[1]).abs() < 1e-9, "{:?}", s.gains);
            assert!(s.residual_norm < 1e-9);
        }
    }

    #[test]
    fn negative_unconstrained_optimum_is_clamped() {
        let p = problem(&[vec![1.0, 0.0], vec![1.0, 1.0]], &[1.0, 0.5], &[0.0, 0.0]);
        let s = run(&p);
        assert!(s.converged);
        assert!((s.gains[0] - 0.75).abs() < 1e-12);
        assert_eq!(s.gains[1], 0.0);
        assert!((s.residual_norm - 0.125f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn hall_penalty_trades_fit_for_less_hall() {
        let gain = 10f64.powf(-6.0 / 20.0);
        let p = problem(&[vec![1.0, 0.0], vec![0.0, gain]], &[0.5, 0.5], &[0.0, 1.0]);
        let s = run(&p);
        assert!(s.converged);
        assert!((s.gains[0] - 0.5).abs() < 1e-12);
        assert!((s.gains[1] - gain * 0.5 / (gain * gain + 0.01)).abs() < 1e-12);
    }

    #[test]
    fn identical_columns_split_the_gain() {
        let p = problem(&[vec![1.0, 1.0], vec![0.5, 0.5]], &[0.8, 0.4], &[0.0, 0.0]);
        let s = run(&p);
        assert!(s.converged);
        assert!(s.residual_norm < 1e-9);
        assert!(((s.gains[0] + s.gains[1]) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn all_zero_matrix_gives_zero_gains() {
        let p = problem(&[vec![0.0, 0.0], vec![0.0, 0.0]], &[0.3, 0.4], &[0.0, 1.0]);
        let s = run(&p);
        assert!(s.converged);
        assert_eq!(s.iterations, 0);
        assert_eq!(s.gains, vec![0.0, 0.0]);
    }

    #[test]
    fn matches_coordinate_descent_on_easy_problem() {
        let p = problem(
            &[vec![0.9, 0.2, 0.0], vec![0.1, 0.7, 0.0], vec![0.0, 0.3, 0.6]],
            &[0.5, 0.3, 0.4],
            &[0.0, 0.0, 1.0],
        );
        let exact = run(&p);
        let cd = solve_with(&p, &SolverConfig::default(), &CoordinateDescent);
        assert!(exact.objective <= cd.objective + 1e-12);
        assert!((exact.objective - cd.objective).abs() < 1e-7);
    }

    #[test]
    fn iteration_cap_reports_not_converged() {
        let p = problem(&[vec![1.0, 0.0], vec![0.0, 1.0]], &[0.5, 0.5], &[0.0, 0.0]);
        let config = SolverConfig {
            max_iterations: 1,
            ..SolverConfig::default()
        };
        let s = solve_with(&p, &config, &ActiveSet);
        assert!(!s.converged);
        assert_eq!(s.iterations, 1);
        assert!(s.gains.iter().all(|&g| g >= 0.0));
    }
}
