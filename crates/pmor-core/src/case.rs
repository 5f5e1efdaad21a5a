use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Real;

/// Ordered `name -> value` map; insertion order is the natural key order.
pub type ParameterPoint = IndexMap<String, Real>;

/// Build a [`ParameterPoint`] from `(name, value)` pairs, keeping their order.
pub fn parameter_point<I, S>(pairs: I) -> ParameterPoint
where
    I: IntoIterator<Item = (S, Real)>,
    S: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Light metadata of one ROM case.
///
/// The heavy payload behind `data_ref` is only read by
/// [`RomLibrary::materialize_data`](crate::RomLibrary::materialize_data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: String,
    pub data_ref: PathBuf,
    pub parameters: ParameterPoint,
}

impl CaseRecord {
    pub fn new(
        case_id: impl Into<String>,
        data_ref: impl Into<PathBuf>,
        parameters: ParameterPoint,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            data_ref: data_ref.into(),
            parameters,
        }
    }

    pub fn data_ref(&self) -> &Path {
        &self.data_ref
    }

    /// Parameter names in natural key order.
    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters.keys().cloned().collect()
    }

    pub fn parameter(&self, name: &str) -> Option<Real> {
        self.parameters.get(name).copied()
    }
}
