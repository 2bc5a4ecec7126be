//! Solver — non-negative gains minimizing a hall-penalized least-squares fit.
//!
//! ```text
//! f(x) = ‖A·x − T‖² + λ · Σ (x[s]·H[s])²      subject to x ≥ 0
//! ```
//!
//! The objective is a convex quadratic, so any bounded minimizer that reaches
//! the global optimum will do. The default [`ActiveSet`] finishes in a finite
//! number of steps; the two first-order methods are kept behind
//! [`BoundedMinimizer`] for comparison.

pub mod active_set;
pub mod coordinate;
pub mod projected;

pub use active_set::ActiveSet;
pub use coordinate::CoordinateDescent;
pub use projected::ProjectedGradient;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::matrix::{norm, Matrix, MixProblem};

/// Which minimizer to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    ActiveSet,
    CoordinateDescent,
    ProjectedGradient,
}

/// Solver parameters. Every field falls back to its default when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// λ, the weight on squared hall gains.
    pub hall_penalty: f64,
    /// Stop when the relative objective improvement per iteration drops to this.
    pub tolerance: f64,
    /// Stop when no projected-gradient component exceeds this.
    pub gradient_tolerance: f64,
    pub max_iterations: usize,
    /// Starting gain for every signal in the first-order methods.
    pub initial_gain: f64,
    pub method: Method,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            hall_penalty: 0.01,
            tolerance: 1e-12,
            gradient_tolerance: 1e-5,
            max_iterations: 1000,
            initial_gain: 0.3,
            method: Method::default(),
        }
    }
}

/// The penalized objective over a [`MixProblem`].
pub struct Objective<'a> {
    problem: &'a MixProblem,
    penalty: f64,
}

impl<'a> Objective<'a> {
    pub fn new(problem: &'a MixProblem, penalty: f64) -> Self {
        Self { problem, penalty }
    }

    pub fn dimension(&self) -> usize {
        self.problem.signal_count()
    }

    /// `A·x − T`
    pub fn residual(&self, x: &[f64]) -> Vec<f64> {
        let mut r = self.problem.contributions.mul_vec(x);
        for (ri, ti) in r.iter_mut().zip(&self.problem.target) {
            *ri -= ti;
        }
        r
    }

    pub fn residual_norm(&self, x: &[f64]) -> f64 {
        norm(&self.residual(x))
    }

    pub fn value(&self, x: &[f64]) -> f64 {
        let fit: f64 = self.residual(x).iter().map(|r| r * r).sum();
        let hall: f64 = x
            .iter()
            .zip(&self.problem.hall)
            .map(|(xi, hi)| (xi * hi).powi(2))
            .sum();
        fit + self.penalty * hall
    }

    /// `2·Aᵗ·(A·x − T) + 2λ·x⊙H⊙H`
    pub fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut g = self
            .problem
            .contributions
            .transpose_mul_vec(&self.residual(x));
        for ((gi, xi), hi) in g.iter_mut().zip(x).zip(&self.problem.hall) {
            *gi = 2.0 * *gi + 2.0 * self.penalty * xi * hi * hi;
        }
        g
    }

    /// Half the Hessian, `Aᵗ·A + λ·diag(H²)`, and the linear term `Aᵗ·T`.
    ///
    /// With these, `f(x) = xᵗQx − 2bᵗx + ‖T‖²`.
    pub fn quadratic(&self) -> (Matrix, Vec<f64>) {
        let mut q = self.problem.contributions.gram();
        for (s, h) in self.problem.hall.iter().enumerate() {
            q.set(s, s, q.get(s, s) + self.penalty * h * h);
        }
        let b = self
            .problem
            .contributions
            .transpose_mul_vec(&self.problem.target);
        (q, b)
    }
}

/// Largest gradient component that still points into the feasible region.
pub fn projected_gradient_max(x: &[f64], gradient: &[f64]) -> f64 {
    x.iter()
        .zip(gradient)
        .map(|(&xi, &gi)| if xi <= 0.0 { gi.min(0.0).abs() } else { gi.abs() })
        .fold(0.0, f64::max)
}

/// Relative decrease between two objective values.
pub fn relative_improvement(previous: f64, current: f64) -> f64 {
    (previous - current) / previous.abs().max(current.abs()).max(1.0)
}

/// What a minimizer hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// A minimizer for a smooth convex objective under `x ≥ 0`.
pub trait BoundedMinimizer {
    fn minimize(&self, objective: &Objective<'_>, x0: Vec<f64>, config: &SolverConfig) -> Minimum;
}

impl Method {
    pub fn minimizer(self) -> Box<dyn BoundedMinimizer> {
        match self {
            Method::ActiveSet => Box::new(ActiveSet),
            Method::CoordinateDescent => Box::new(CoordinateDescent),
            Method::ProjectedGradient => Box::new(ProjectedGradient),
        }
    }
}

/// A solved gain vector and how well it fits.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub gains: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub objective: f64,
    /// `‖A·x − T‖`
    pub residual_norm: f64,
}

/// Solve with the minimizer chosen in `config`.
pub fn solve(problem: &MixProblem, config: &SolverConfig) -> Solution {
    solve_with(problem, config, config.method.minimizer().as_ref())
}

/// Solve with an explicit minimizer.
pub fn solve_with(
    problem: &MixProblem,
    config: &SolverConfig,
    minimizer: &dyn BoundedMinimizer,
) -> Solution {
    let objective = Objective::new(problem, config.hall_penalty);
    let x0 = vec![config.initial_gain.max(0.0); objective.dimension()];
    debug!(
        signals = objective.dimension(),
        components = problem.component_count(),
        method = ?config.method,
        "solving mix"
    );

    let Minimum {
        x,
        iterations,
        converged,
    } = minimizer.minimize(&objective, x0, config);

    let gains: Vec<f64> = x.into_iter().map(|v| v.max(0.0)).collect();
    let solution = Solution {
        objective: objective.value(&gains),
        residual_norm: objective.residual_norm(&gains),
        gains,
        converged,
        iterations,
    };
    info!(
        converged = solution.converged,
        iterations = solution.iterations,
        residual = solution.residual_norm,
        "solver finished"
    );
    solution
}
