//! Projected gradient descent with a fixed `1/L` step.
//!
//! `L` is the Frobenius norm of the Hessian `2Q`, an upper bound on its
//! largest eigenvalue, which keeps every step a descent step.

use super::{
    projected_gradient_max, relative_improvement, BoundedMinimizer, Minimum, Objective,
    SolverConfig,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectedGradient;

impl BoundedMinimizer for ProjectedGradient {
    fn minimize(&self, objective: &Objective<'_>, mut x: Vec<f64>, config: &SolverConfig) -> Minimum {
        let (q, _) = objective.quadratic();
        let lipschitz = 2.0 * q.frobenius_norm();

        // flat objective, every point is optimal
        if lipschitz == 0.0 {
            x.iter_mut().for_each(|v| *v = 0.0);
            return Minimum {
                x,
                iterations: 0,
                converged: true,
            };
        }

        let step = 1.0 / lipschitz;
        let mut f = objective.value(&x);

        for iteration in 1..=config.max_iterations {
            let g = objective.gradient(&x);
            for (xi, gi) in x.iter_mut().zip(&g) {
                *xi = (*xi - step * gi).max(0.0);
            }

            let f_next = objective.value(&x);
            let improvement = relative_improvement(f, f_next);
            f = f_next;

            let pg = projected_gradient_max(&x, &objective.gradient(&x));
            if improvement <= config.tolerance || pg <= config.gradient_tolerance {
                return Minimum {
                    x,
                    iterations: iteration,
                    converged: true,
                };
            }
        }

        Minimum {
            x,
            iterations: config.max_iterations,
            converged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::problem;
    use super::super::*;
    use super::*;

    fn run(p: &MixProblem) -> Solution {
        let config = SolverConfig {
            max_iterations: 20_000,
            ..SolverConfig::default()
        };
        solve_with(p, &config, &ProjectedGradient)
    }

    #[test]
    fn diagonal_problem() {
        let p = problem(&[vec![1.0, 0.0], vec![0.0, 0.5]], &[0.6, 0.2], &[0.0, 0.0]);
        let s = run(&p);
        assert!(s.converged);
        assert!((s.gains[0] - 0.6).abs() < 1e-4);
        assert!((s.gains[1] - 0.4).abs() < 1e-4);
    }

    #[test]
    fn all_zero_matrix_gives_zero_gains() {
        let p = problem(&[vec![0.0], vec![0.0]], &[0.3, 0.4], &[0.0]);
        let s = run(&p);
        assert_eq!(s.gains, vec![0.0]);
        assert!((s.residual_norm - 0.5).abs() < 1e-12);
    }

    #[test]
    fn agrees_with_coordinate_descent() {
        let p = problem(
            &[vec![0.9, 0.2, 0.0], vec![0.1, 0.7, 0.0], vec![0.0, 0.3, 0.6]],
            &[0.5, 0.3, 0.4],
            &[0.0, 0.0, 1.0],
        );
        let pg = run(&p);
        let cd = solve_with(&p, &SolverConfig::default(), &CoordinateDescent);
        assert!((pg.objective - cd.objective).abs() < 1e-6);
        assert!((pg.residual_norm - cd.residual_norm).abs() < 1e-3);
    }
}
