//! Automix — solves non-negative fader levels for a target direct/early mix.

pub mod config;
pub mod hall;
pub mod matrix;
pub mod pipeline;
pub mod report;
pub mod solver;
pub mod spec;
