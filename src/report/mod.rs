//! Diagnostics — compares the achieved mix with the target and explains gaps.

pub mod output;

pub use output::{FailureReport, RunOutput};

use serde::Serialize;
use tracing::warn;

use crate::matrix::MixProblem;
use crate::solver::Solution;

/// Level reported for a zero (or negative) gain.
pub const SILENCE_DB: f64 = -150.0;
/// Residual below which a converged solve counts as a success.
pub const SUCCESS_RESIDUAL: f64 = 0.01;
/// Per-component gap that gets called out in the error message.
pub const COMPONENT_TOLERANCE: f64 = 0.01;
/// Contributions at or below this are left out of the analysis text.
pub const VISIBLE_CONTRIBUTION: f64 = 0.001;

pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        SILENCE_DB
    } else {
        20.0 * linear.log10()
    }
}

/// Gain for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalLevel {
    #[serde(skip)]
    pub name: String,
    pub linear: f64,
    pub db: f64,
    pub is_hall: bool,
}

/// Achieved vs. target for one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentMix {
    #[serde(skip)]
    pub name: String,
    pub achieved: f64,
    pub target: f64,
    pub diff: f64,
}

impl ComponentMix {
    /// Explanation for a gap, or `None` when it is within tolerance.
    pub fn problem(&self) -> Option<String> {
        if self.diff.abs() <= COMPONENT_TOLERANCE {
            return None;
        }
        let cause = if self.diff > 0.0 {
            "too much baked into source signals"
        } else {
            "not enough available"
        };
        Some(format!(
            "{}: getting {:.1}% but target is {:.1}% ({cause})",
            self.name,
            self.achieved * 100.0,
            self.target * 100.0
        ))
    }
}

/// The full result of a solved run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixReport {
    pub success: bool,
    /// Residual norm `‖A·x − T‖`.
    pub error: f64,
    pub error_message: Option<String>,
    pub analysis: String,
    #[serde(serialize_with = "output::serialize_levels")]
    pub levels: Vec<SignalLevel>,
    #[serde(serialize_with = "output::serialize_mix")]
    pub achieved_mix: Vec<ComponentMix>,
    pub instruments: Vec<String>,
    pub components: Vec<String>,
}

impl MixReport {
    pub fn build(problem: &MixProblem, solution: &Solution, instruments: Vec<String>) -> Self {
        let achieved_mix = achieved_mix(problem, &solution.gains);
        let residual = solution.residual_norm;

        for (s, name) in problem.signal_names.iter().enumerate() {
            if problem.signal_names[..s].contains(name) {
                warn!(signal = %name, "signal name repeated, output keeps its last level");
            }
        }

        let error_message = if residual >= SUCCESS_RESIDUAL {
            Some(error_message(&achieved_mix, residual))
        } else {
            None
        };

        Self {
            success: solution.converged && residual < SUCCESS_RESIDUAL,
            error: residual,
            error_message,
            analysis: analysis(problem),
            levels: levels(problem, &solution.gains),
            achieved_mix,
            instruments,
            components: problem.component_names.clone(),
        }
    }
}

pub fn levels(problem: &MixProblem, gains: &[f64]) -> Vec<SignalLevel> {
    problem
        .signal_names
        .iter()
        .zip(gains)
        .zip(&problem.hall)
        .map(|((name, &linear), &hall)| SignalLevel {
            name: name.clone(),
            linear,
            db: linear_to_db(linear),
            is_hall: hall != 0.0,
        })
        .collect()
}

pub fn achieved_mix(problem: &MixProblem, gains: &[f64]) -> Vec<ComponentMix> {
    let achieved = problem.contributions.mul_vec(gains);
    problem
        .component_names
        .iter()
        .zip(achieved)
        .zip(&problem.target)
        .map(|((name, achieved), &target)| ComponentMix {
            name: name.clone(),
            achieved,
            target,
            diff: achieved - target,
        })
        .collect()
}

/// Explain why the target could not be reached.
pub fn error_message(mix: &[ComponentMix], residual: f64) -> String {
    let problems: Vec<String> = mix.iter().filter_map(ComponentMix::problem).collect();
    if problems.is_empty() {
        format!(
            "Target mix not achievable:\nresidual {residual:.4} is spread thinly across all components"
        )
    } else {
        format!("Target mix not achievable:\n{}", problems.join("\n"))
    }
}

/// Human-readable breakdown of the contribution matrix and the target.
pub fn analysis(problem: &MixProblem) -> String {
    let a = &problem.contributions;
    let mut lines = vec!["Signal matrix (what each signal contributes to each component):".to_string()];

    for (s, name) in problem.signal_names.iter().enumerate() {
        let contributions: Vec<String> = problem
            .component_names
            .iter()
            .enumerate()
            .filter(|&(c, _)| a.get(c, s) > VISIBLE_CONTRIBUTION)
            .map(|(c, comp)| format!("{comp}: {:.1}%", a.get(c, s) * 100.0))
            .collect();
        let marker = if problem.hall[s] != 0.0 { " [hall]" } else { "" };
        lines.push(format!("  {name}{marker}: {}", contributions.join(", ")));
    }

    lines.push(String::new());
    lines.push("Target mix:".to_string());
    for (comp, target) in problem.component_names.iter().zip(&problem.target) {
        lines.push(format!("  {comp}: {:.1}%", target * 100.0));
    }

    lines.join("\n")
}
