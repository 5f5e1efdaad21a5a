//! Case discovery from simulation output folders.
//!
//! Every case lives in its own directory containing a `*.pmor.json`
//! descriptor:
//!
//! ```json
//! {
//!   "sim_info": { "case": "m05_a2", "path_to_data": "output/m05_a2" },
//!   "parameters": { "mach": 0.5, "alpha": 2.0 }
//! }
//! ```
//!
//! `path_to_data` names a directory (relative to the case directory unless
//! absolute) whose first `*.json` file holds the serialized
//! [`CaseData`](crate::CaseData).

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{CaseRecord, ParameterPoint};

pub const DESCRIPTOR_SUFFIX: &str = ".pmor.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimInfo {
    pub case: String,
    pub path_to_data: PathBuf,
}

/// Sidecar file describing one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDescriptor {
    pub sim_info: SimInfo,
    pub parameters: ParameterPoint,
}

/// A case directory that did not produce a record.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCase {
    pub path: PathBuf,
    pub reason: String,
}

impl SkippedCase {
    fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SkippedCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    pub cases: Vec<CaseRecord>,
    pub skipped: Vec<SkippedCase>,
}

/// Source of case records.
///
/// Implement [`describe`](CaseSource::describe) for a single case directory;
/// [`discover`](CaseSource::discover) walks the sub-directories of a root.
pub trait CaseSource {
    fn describe(&self, case_dir: &Path) -> Result<CaseRecord, SkippedCase>;

    /// Describe every sub-directory of `root`, in file-name order.
    ///
    /// Directories that cannot be described are collected in
    /// [`Discovery::skipped`]; only an unreadable `root` is an error.
    fn discover(&self, root: &Path) -> std::io::Result<Discovery> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        let mut discovery = Discovery::default();
        for dir in dirs {
            match self.describe(&dir) {
                Ok(record) => discovery.cases.push(record),
                Err(skip) => discovery.skipped.push(skip),
            }
        }
        Ok(discovery)
    }
}

/// Files in `dir` whose name ends with `suffix`, sorted.
fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(suffix))
        })
        .collect();
    files.sort();
    files
}

/// Reads `*.pmor.json` descriptors from case directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryCaseSource;

impl CaseSource for DirectoryCaseSource {
    fn describe(&self, case_dir: &Path) -> Result<CaseRecord, SkippedCase> {
        let descriptor_path = files_with_suffix(case_dir, DESCRIPTOR_SUFFIX)
            .into_iter()
            .next()
            .ok_or_else(|| {
                SkippedCase::new(case_dir, "no *.pmor.json file with parameter information")
            })?;

        let text = fs::read_to_string(&descriptor_path)
            .map_err(|e| SkippedCase::new(&descriptor_path, e.to_string()))?;
        let descriptor: CaseDescriptor = serde_json::from_str(&text).map_err(|e| {
            SkippedCase::new(&descriptor_path, format!("descriptor not in correct format: {e}"))
        })?;

        let data_dir = case_dir.join(&descriptor.sim_info.path_to_data);
        let data_ref = files_with_suffix(&data_dir, ".json")
            .into_iter()
            .find(|p| {
                !p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(DESCRIPTOR_SUFFIX))
            })
            .ok_or_else(|| {
                SkippedCase::new(
                    case_dir,
                    format!("no case data file in {}", data_dir.display()),
                )
            })?;

        Ok(CaseRecord {
            case_id: descriptor.sim_info.case,
            data_ref,
            parameters: descriptor.parameters,
        })
    }
}
