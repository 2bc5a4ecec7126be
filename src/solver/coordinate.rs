//! Cyclic coordinate descent with projection onto `x ≥ 0`.
//!
//! Each coordinate step minimizes the quadratic exactly along that axis and
//! clamps at zero, so the objective never increases. A coordinate with zero
//! curvature has no effect on the objective and is parked at 0.

use super::{
    projected_gradient_max, relative_improvement, BoundedMinimizer, Minimum, Objective,
    SolverConfig,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateDescent;

impl BoundedMinimizer for CoordinateDescent {
    fn minimize(&self, objective: &Objective<'_>, mut x: Vec<f64>, config: &SolverConfig) -> Minimum {
        let (q, b) = objective.quadratic();
        let n = x.len();

        // g = Q·x − b, kept up to date as coordinates move
        let mut g = q.mul_vec(&x);
        for (gi, bi) in g.iter_mut().zip(&b) {
            *gi -= bi;
        }

        let mut f = objective.value(&x);

        for iteration in 1..=config.max_iterations {
            for j in 0..n {
                let curvature = q.get(j, j);
                let next = if curvature > 0.0 {
                    (x[j] - g[j] / curvature).max(0.0)
                } else {
                    0.0
                };
                let delta = next - x[j];
                if delta != 0.0 {
                    for (i, gi) in g.iter_mut().enumerate() {
                        *gi += delta * q.get(i, j);
                    }
                    x[j] = next;
                }
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
