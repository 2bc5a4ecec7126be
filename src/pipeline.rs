//! Batch pipeline — parse → hall augmentation → matrix → solve → report.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::hall::add_hall_signals;
use crate::matrix::MixProblem;
use crate::report::{FailureReport, MixReport, RunOutput};
use crate::solver::{solve, SolverConfig};
use crate::spec::{ParseError, Spec, SpecParser};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to read {what} {}: {source}", path.display())]
    Read {
        what: &'static str,
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write output {}: {source}", path.display())]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Split a track list into names: one per line, trimmed, blanks dropped.
pub fn parse_track_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run the whole computation on in-memory inputs.
pub fn run<S: AsRef<str>>(
    spec_source: &str,
    track_names: &[S],
    config: &SolverConfig,
) -> Result<MixReport, ParseError> {
    let spec = SpecParser::parse(spec_source)?;
    Ok(solve_spec(spec, track_names, config))
}

/// Augment a parsed spec with hall tracks, solve it, and build the report.
pub fn solve_spec<S: AsRef<str>>(
    mut spec: Spec,
    track_names: &[S],
    config: &SolverConfig,
) -> MixReport {
    for warning in &spec.warnings {
        debug!("{warning}");
    }

    let halls = add_hall_signals(&mut spec, track_names);
    debug!(halls, signals = spec.signals.len(), "added hall signals");

    let problem = MixProblem::build(&spec);
    let solution = solve(&problem, config);
    MixReport::build(&problem, &solution, spec.instrument_names())
}

/// Same as [`run`], folding a parse failure into the failure record.
pub fn run_to_output<S: AsRef<str>>(
    spec_source: &str,
    track_names: &[S],
    config: &SolverConfig,
) -> RunOutput {
    match run(spec_source, track_names, config) {
        Ok(report) => RunOutput::Solved(report),
        Err(e) => RunOutput::Failed(FailureReport::new(e)),
    }
}

/// Read the spec and track list from disk, solve, and write the JSON result.
///
/// The returned output tells the caller whether the run was fatal; the
/// file is written either way.
pub fn run_files(
    spec_path: &Path,
    tracks_path: &Path,
    output_path: &Path,
    config: &SolverConfig,
) -> Result<RunOutput, RunError> {
    let spec_source = read(spec_path, "spec file")?;
    let output = match SpecParser::parse(&spec_source) {
        // the track list is not read when the spec is unusable
        Err(e) => RunOutput::Failed(FailureReport::new(e)),
        Ok(spec) => {
            let tracks = parse_track_list(&read(tracks_path, "track list")?);
            info!(tracks = tracks.len(), "loaded track list");
            RunOutput::Solved(solve_spec(spec, &tracks, config))
        }
    };

    let json = output.to_json()?;
    std::fs::write(output_path, json).map_err(|source| RunError::Write {
        path: output_path.to_path_buf(),
        source,
    })?;
    Ok(output)
}

fn read(path: &Path, what: &'static str) -> Result<String, RunError> {
    std::fs::read_to_string(path).map_err(|source| RunError::Read {
        what,
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_list_trims_and_skips_blanks() {
        let names = parse_track_list("Vocals\n\n  Gtr Hall  \r\n\t\nBass\n");
        assert_eq!(names, vec!["Vocals", "Gtr Hall", "Bass"]);
    }

    #[test]
    fn run_reports_parse_failure() {
        let err = run::<&str>("signal voc: 1.0 voc_direct\n", &[], &SolverConfig::default())
            .unwrap_err();
        assert_eq!(err, ParseError::MissingTarget);
    }

    #[test]
    fn run_to_output_folds_failure() {
        let out = run_to_output::<&str>("nothing here\n", &[], &SolverConfig::default());
        assert!(out.is_fatal());
    }
}
