//! Heavy per-case payloads.
//!
//! A payload holds the linearised aeroelastic system of one case: the coupled
//! realization, the aerodynamic (UVLM) subsystem with its reductions and the
//! structural (beam) subsystem.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{LibraryError, Mat, Result, StateSpace, StateSpaceError, state_space::expect_shape};

/// One model-order reduction of the aerodynamic subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    /// Right projection basis `V`, `n_full x r`.
    pub v: Mat,
    /// Left projection basis `W`, `n_full x r`.
    pub w: Mat,
    /// Realization the reduction was computed from.
    pub full_order: StateSpace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeroSubsystem {
    /// Reduced aerodynamic realization.
    pub ss: StateSpace,
    /// Reductions keyed by method name (e.g. `Krylov`).
    pub reductions: BTreeMap<String, Reduction>,
}

impl AeroSubsystem {
    pub fn methods(&self) -> Vec<String> {
        self.reductions.keys().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralSubsystem {
    pub ss: StateSpace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseData {
    /// Full coupled aeroelastic realization.
    pub coupled: StateSpace,
    pub aero: AeroSubsystem,
    pub structure: StructuralSubsystem,
}

impl CaseData {
    /// Read and validate a payload.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        data.validate()?;
        Ok(data)
    }

    /// Check that every realization is conformable and that the reduction
    /// bases and the coupled system agree with the subsystems.
    ///
    /// Each reduction must carry `V` and `W` of shape `n_full x r`, where
    /// `n_full` counts the states of its full-order realization and `r` those
    /// of the reduced aerodynamic realization. The coupled system holds the
    /// reduced aerodynamic states followed by the structural states.
    pub fn validate(&self) -> Result<()> {
        let realizations = [
            ("coupled", &self.coupled),
            ("aero", &self.aero.ss),
            ("structure", &self.structure.ss),
        ];
        for (part, ss) in realizations {
            ss.validate().map_err(|e| malformed(part, e))?;
        }

        let reduced = self.aero.ss.states();
        for (method, reduction) in &self.aero.reductions {
            let part = format!("reduction `{method}`");
            reduction
                .full_order
                .validate()
                .map_err(|e| malformed(&part, e))?;
            let expected = (reduction.full_order.states(), reduced);
            expect_shape("V", &reduction.v, expected).map_err(|e| malformed(&part, e))?;
            expect_shape("W", &reduction.w, expected).map_err(|e| malformed(&part, e))?;
        }

        let n = reduced + self.structure.ss.states();
        expect_shape("A", &self.coupled.a, (n, n)).map_err(|e| malformed("coupled", e))?;
        Ok(())
    }

    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }
}

fn malformed(part: &str, source: StateSpaceError) -> LibraryError {
    LibraryError::Payload {
        part: part.to_string(),
        source,
    }
}
