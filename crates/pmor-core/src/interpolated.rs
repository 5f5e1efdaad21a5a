//! Store for interpolated ROMs.
//!
//! Holds the realization produced by an interpolation routine together with
//! the parameter point it was evaluated at. Only the parameter points are
//! persisted (the sweep summary), so an interrupted sweep can skip points it
//! already covered.

use std::{fs, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{LogReporter, ParameterPoint, Reporter, Result, StateSpace};

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedRom {
    /// `None` for entries restored from a summary file.
    pub state_space: Option<StateSpace>,
    pub parameters: ParameterPoint,
}

/// One record of the sweep summary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub label: String,
    pub parameters: ParameterPoint,
}

pub fn case_label(index: usize) -> String {
    format!("case_{index:02}")
}

pub struct InterpolatedRomLibrary {
    entries: Vec<InterpolatedRom>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for InterpolatedRomLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpolatedRomLibrary")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl Default for InterpolatedRomLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpolatedRomLibrary {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Append a result. Parameter points are neither validated nor deduplicated.
    pub fn append(&mut self, state_space: StateSpace, parameters: ParameterPoint) {
        self.entries.push(InterpolatedRom {
            state_space: Some(state_space),
            parameters,
        });
    }

    pub fn entries(&self) -> &[InterpolatedRom] {
        &self.entries
    }

    pub fn case_number(&self) -> usize {
        self.entries.len()
    }

    pub fn parameter_list(&self) -> Vec<&ParameterPoint> {
        self.entries.iter().map(|e| &e.parameters).collect()
    }

    /// Realizations of the entries that carry one, in entry order.
    pub fn state_spaces(&self) -> impl Iterator<Item = &StateSpace> {
        self.entries.iter().filter_map(|e| e.state_space.as_ref())
    }

    /// `true` if an entry was evaluated at exactly `point`.
    pub fn contains(&self, point: &ParameterPoint) -> bool {
        self.entries.iter().any(|e| &e.parameters == point)
    }

    pub fn summary(&self) -> Vec<SummaryRecord> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| SummaryRecord {
                label: case_label(i),
                parameters: e.parameters.clone(),
            })
            .collect()
    }

    pub fn write_summary(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(&self.summary())?)?;
        Ok(())
    }

    /// Append the parameter points of a previous sweep.
    ///
    /// A missing summary file only produces a warning and loads nothing, so a
    /// sweep can start fresh. Returns the number of points loaded.
    pub fn load_previous_cases(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            self.reporter.warn(&format!(
                "unable to load summary file with previous cases at {}",
                path.display()
            ));
            return Ok(0);
        }
        let records: Vec<SummaryRecord> = serde_json::from_str(&fs::read_to_string(path)?)?;
        let count = records.len();
        self.entries
            .extend(records.into_iter().map(|r| InterpolatedRom {
                state_space: None,
                parameters: r.parameters,
            }));
        Ok(count)
    }
}
