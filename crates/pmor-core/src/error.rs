use std::path::PathBuf;

use thiserror::Error;

use crate::StateSpaceError;

/// A single case that could not be read during materialization.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseLoadFailure {
    pub index: usize,
    pub case_id: String,
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for CaseLoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "case {} ({}) at {}: {}",
            self.index,
            self.case_id,
            self.path.display(),
            self.reason
        )
    }
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("no file found at {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("case index {index} out of range, library holds {len} cases")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("reference case {index} out of range, expected 0..{len}")]
    ReferenceOutOfRange { index: usize, len: usize },
    #[error("library is empty")]
    EmptyLibrary,
    #[error("case `{case_id}` has parameters {found:?}, expected {expected:?}")]
    Schema {
        case_id: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("cases {existing} and {incoming} both map to grid coordinate {coordinate:?}")]
    GridCollision {
        coordinate: Vec<usize>,
        existing: usize,
        incoming: usize,
    },
    #[error("value {value} of parameter `{parameter}` (case `{case_id}`) is not on the grid")]
    Lookup {
        case_id: String,
        parameter: String,
        value: f64,
    },
    #[error("case data not loaded, call materialize_data first")]
    DataNotMaterialized,
    #[error("unrecognised target system `{target}`, known systems: {known:?}")]
    UnrecognizedSystem { target: String, known: Vec<String> },
    #[error("basis extraction for `{target}` is not implemented")]
    NotImplemented { target: String },
    #[error("failed to load {} case(s): {}", .failures.len(), join_failures(.failures))]
    Load { failures: Vec<CaseLoadFailure> },
    #[error("case `{case_id}` has no `{method}` reduction, available: {available:?}")]
    MissingReduction {
        case_id: String,
        method: String,
        available: Vec<String>,
    },
    #[error("case `{case_id}` holds several reductions {available:?}, set reduction_method")]
    AmbiguousReduction {
        case_id: String,
        available: Vec<String>,
    },
    #[error("{0} is not set")]
    MissingLocation(&'static str),
    #[error("library schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("grid tolerance {0} must be finite and non-negative")]
    InvalidTolerance(f64),
    #[error("malformed payload, {part}: {source}")]
    Payload {
        part: String,
        #[source]
        source: StateSpaceError,
    },
    #[error(transparent)]
    StateSpace(#[from] StateSpaceError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_failures(failures: &[CaseLoadFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = LibraryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = LibraryError::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "case index 7 out of range, library holds 3 cases"
        );

        let err = LibraryError::NotFound {
            path: PathBuf::from("/tmp/missing.json"),
        };
        assert!(err.to_string().contains("/tmp/missing.json"));
    }

    #[test]
    fn load_error_lists_every_failure() {
        let err = LibraryError::Load {
            failures: vec![
                CaseLoadFailure {
                    index: 0,
                    case_id: "a".into(),
                    path: PathBuf::from("a.json"),
                    reason: "missing".into(),
                },
                CaseLoadFailure {
                    index: 2,
                    case_id: "c".into(),
                    path: PathBuf::from("c.json"),
                    reason: "bad json".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to load 2 case(s)"));
        assert!(msg.contains("case 0 (a)"));
        assert!(msg.contains("case 2 (c)"));
    }
}
