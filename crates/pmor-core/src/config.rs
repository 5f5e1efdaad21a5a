use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{LibraryError, Real, Result};

/// Options for parameter-grid construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    /// Absolute tolerance for treating two parameter values as the same grid
    /// value. `None` (default) uses exact float equality.
    pub tolerance: Option<Real>,
}

impl GridOptions {
    /// The tolerance, when set, must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        match self.tolerance {
            Some(tol) if !(tol.is_finite() && tol >= 0.0) => {
                Err(LibraryError::InvalidTolerance(tol))
            }
            _ => Ok(()),
        }
    }
}

/// What `materialize_data` does when some payloads cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailurePolicy {
    /// Fail with every collected failure; loaded data is left untouched.
    #[default]
    Abort,
    /// Keep the cases that loaded and leave empty slots for the rest.
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub library_name: Option<String>,
    /// Folder the library file is saved to and loaded from.
    pub folder: Option<PathBuf>,
    /// Directory holding one sub-directory per case, used by `create`.
    pub source_path: Option<PathBuf>,
    pub grid: GridOptions,
    pub load_failure_policy: LoadFailurePolicy,
    /// Reduction whose bases are extracted. `None` picks the single
    /// reduction stored with each case.
    pub reduction_method: Option<String>,
}

impl LibraryConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LibraryError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.grid.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let cfg: LibraryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, LibraryConfig::default());
        assert_eq!(cfg.load_failure_policy, LoadFailurePolicy::Abort);
        assert!(cfg.grid.tolerance.is_none());
    }

    #[test]
    fn parses_all_fields() {
        let cfg: LibraryConfig = serde_json::from_str(
            r#"{
                "library_name": "flutter",
                "folder": "/data/libs",
                "source_path": "/data/cases",
                "grid": { "tolerance": 1e-9 },
                "load_failure_policy": "skip",
                "reduction_method": "Krylov"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.load_failure_policy, LoadFailurePolicy::Skip);
        assert_eq!(cfg.grid.tolerance, Some(1e-9));
        assert_eq!(cfg.reduction_method.as_deref(), Some("Krylov"));
        assert_eq!(cfg.folder, Some(PathBuf::from("/data/libs")));
    }

    #[test]
    fn tolerance_must_be_finite_and_non_negative() {
        for tol in [-1.0, Real::NAN, Real::INFINITY] {
            let options = GridOptions {
                tolerance: Some(tol),
            };
            assert!(matches!(
                options.validate(),
                Err(LibraryError::InvalidTolerance(_))
            ));
        }
        for tol in [None, Some(0.0), Some(1e-6)] {
            GridOptions { tolerance: tol }.validate().unwrap();
        }
    }

    #[test]
    fn config_file_with_negative_tolerance_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmor.json");
        fs::write(&path, r#"{ "grid": { "tolerance": -0.5 } }"#).unwrap();

        let err = LibraryConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidTolerance(t) if t == -0.5));
        assert!(err.to_string().contains("-0.5"));
    }

    #[test]
    fn missing_config_file_is_not_found() {
        let err = LibraryConfig::from_json_file(Path::new("/nonexistent/pmor.json")).unwrap_err();
        assert!(matches!(err, LibraryError::NotFound { .. }));
    }
}
