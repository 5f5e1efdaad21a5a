//! Deterministic synthetic case payloads.
//!
//! Builds small aeroelastic payloads whose matrices depend smoothly on a
//! scalar `seed`, and lays them out on disk the way
//! [`DirectoryCaseSource`](crate::DirectoryCaseSource) expects.

use std::{collections::BTreeMap, fs, path::Path};

use crate::{
    AeroSubsystem, CaseData, CaseDescriptor, CaseRecord, DESCRIPTOR_SUFFIX, Mat, ParameterPoint,
    Real, Reduction, Result, SimInfo, StateSpace, StructuralSubsystem, couple,
};

/// Sizes of a synthetic payload.
#[derive(Debug, Clone)]
pub struct PayloadSpec {
    pub aero_states: usize,
    pub reduced_states: usize,
    pub aero_inputs: usize,
    pub aero_outputs: usize,
    pub struct_states: usize,
    pub struct_inputs: usize,
    pub struct_outputs: usize,
    pub dt: Option<Real>,
    pub method: String,
}

impl Default for PayloadSpec {
    fn default() -> Self {
        Self {
            aero_states: 6,
            reduced_states: 3,
            aero_inputs: 2,
            aero_outputs: 2,
            struct_states: 4,
            struct_inputs: 2,
            struct_outputs: 2,
            dt: Some(0.05),
            method: "Krylov".to_string(),
        }
    }
}

/// Stable-ish system with no feed-through.
fn system(states: usize, inputs: usize, outputs: usize, seed: Real, dt: Option<Real>) -> StateSpace {
    let a = Mat::from_fn(states, states, |i, j| {
        if i == j {
            0.5 + 0.01 * seed
        } else {
            0.01 * seed / (1.0 + (i + j) as Real)
        }
    });
    let b = Mat::from_fn(states, inputs, |i, j| 1.0 / (1.0 + (i + 2 * j) as Real));
    let c = Mat::from_fn(outputs, states, |i, j| seed * 0.1 + 1.0 / (1.0 + (2 * i + j) as Real));
    StateSpace {
        a,
        b,
        c,
        d: Mat::zeros(outputs, inputs),
        dt,
    }
}

/// Payload for one case.
pub fn case_data(spec: &PayloadSpec, seed: Real) -> Result<CaseData> {
    let full_order = system(
        spec.aero_states,
        spec.aero_inputs,
        spec.aero_outputs,
        seed,
        spec.dt,
    );
    let v = Mat::identity(spec.aero_states, spec.reduced_states);
    let w = v.clone();
    let reduced = full_order.project(&v, &w.transpose())?;

    let beam = system(
        spec.struct_states,
        spec.struct_inputs,
        spec.struct_outputs,
        seed + 1.0,
        spec.dt,
    );
    let k_as = Mat::identity(reduced.inputs(), beam.outputs());
    let k_sa = Mat::identity(beam.inputs(), reduced.outputs());
    let coupled = couple(&reduced, &beam, &k_as, &k_sa)?;

    let mut reductions = BTreeMap::new();
    reductions.insert(spec.method.clone(), Reduction { v, w, full_order });

    Ok(CaseData {
        coupled,
        aero: AeroSubsystem {
            ss: reduced,
            reductions,
        },
        structure: StructuralSubsystem { ss: beam },
    })
}

/// Sum of the parameter values, used as the payload seed of a case.
pub fn seed_of(parameters: &ParameterPoint) -> Real {
    parameters.values().sum()
}

/// Write one case directory under `root`: `<case_id>/<case_id>.pmor.json`
/// plus the payload in `<case_id>/data/<case_id>.json`.
pub fn write_case_dir(
    root: &Path,
    case_id: &str,
    parameters: &ParameterPoint,
    spec: &PayloadSpec,
) -> Result<CaseRecord> {
    let case_dir = root.join(case_id);
    let data_dir = case_dir.join("data");
    fs::create_dir_all(&data_dir)?;

    let data_ref = data_dir.join(format!("{case_id}.json"));
    case_data(spec, seed_of(parameters))?.write_json_file(&data_ref)?;

    let descriptor = CaseDescriptor {
        sim_info: SimInfo {
            case: case_id.to_string(),
            path_to_data: "data".into(),
        },
        parameters: parameters.clone(),
    };
    fs::write(
        case_dir.join(format!("{case_id}{DESCRIPTOR_SUFFIX}")),
        serde_json::to_string_pretty(&descriptor)?,
    )?;

    Ok(CaseRecord::new(case_id, data_ref, parameters.clone()))
}

/// Write a full case tree, one directory per `(case_id, parameters)` pair.
pub fn write_case_tree(
    root: &Path,
    cases: &[(&str, ParameterPoint)],
    spec: &PayloadSpec,
) -> Result<Vec<CaseRecord>> {
    cases
        .iter()
        .map(|(id, params)| write_case_dir(root, id, params, spec))
        .collect()
}
