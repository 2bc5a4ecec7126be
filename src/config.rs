//! Configuration — loads optional ~/.automix/config.yaml for solver settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::solver::SolverConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AutomixConfig {
    #[serde(default)]
    pub solver: SolverConfig,
}

/// Get the default config file path.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".automix").join("config.yaml"))
}

/// Load configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<AutomixConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration.
///
/// An explicit path must load cleanly. Without one, ~/.automix/config.yaml
/// is tried and anything wrong with it falls back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AutomixConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_from(path);
    }
    let Some(path) = config_path().filter(|p| p.exists()) else {
        debug!("no config file, using defaults");
        return Ok(AutomixConfig::default());
    };
    match load_from(&path) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!("{e}; using defaults");
            Ok(AutomixConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Method;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_matches_solver_defaults() {
        let config = AutomixConfig::default();
        assert_eq!(config.solver, SolverConfig::default());
    }

    #[test]
    fn parse_yaml_config() {
        let yaml = r#"
solver:
  hall_penalty: 0.05
  tolerance: 1.0e-10
  max_iterations: 500
  initial_gain: 0.5
  method: projected_gradient
"#;
        let config: AutomixConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.solver.hall_penalty, 0.05);
        assert_eq!(config.solver.tolerance, 1e-10);
        assert_eq!(config.solver.max_iterations, 500);
        assert_eq!(config.solver.initial_gain, 0.5);
        assert_eq!(config.solver.method, Method::ProjectedGradient);
    }

    #[test]
    fn partial_yaml_config() {
        let yaml = "solver:\n  hall_penalty: 0.1\n";
        let config: AutomixConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.solver.hall_penalty, 0.1);
        assert_eq!(config.solver.max_iterations, 1000);
        assert_eq!(config.solver.method, Method::ActiveSet);
    }

    #[test]
    fn method_names() {
        for (name, method) in [
            ("active_set", Method::ActiveSet),
            ("coordinate_descent", Method::CoordinateDescent),
            ("projected_gradient", Method::ProjectedGradient),
        ] {
            let yaml = format!("solver:\n  method: {name}\n");
            let config: AutomixConfig = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(config.solver.method, method);
        }
    }

    #[test]
    fn empty_document_is_default() {
        let config: AutomixConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AutomixConfig::default());
    }

    #[test]
    fn explicit_path_loads() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "solver:\n  max_iterations: 42").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.solver.max_iterations, 42);
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn explicit_invalid_yaml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "solver: [1, 2").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
