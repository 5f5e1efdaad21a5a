//! Extraction of interpolation ingredients per target subsystem.
//!
//! Every target subsystem (`uvlm`, `aeroelastic`, ...) is a
//! [`BasisExtractor`]; an [`ExtractorRegistry`] maps target tags to
//! extractors so new subsystems only need to be registered.

use std::collections::BTreeMap;

use crate::{CaseData, LibraryError, Mat, Reduction, Result, StateSpace, block_diag};

/// State space and projection bases of one case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBases {
    pub state_space: StateSpace,
    /// Right basis `V`.
    pub right: Mat,
    /// Transposed left basis `W^T`.
    pub left_t: Mat,
}

/// Index-aligned extraction results, one element per loaded case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducedOrderBases {
    /// Library index of each element.
    pub case_indices: Vec<usize>,
    pub state_spaces: Vec<StateSpace>,
    pub right_bases: Vec<Mat>,
    pub left_bases_t: Vec<Mat>,
}

impl ReducedOrderBases {
    pub fn len(&self) -> usize {
        self.case_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.case_indices.is_empty()
    }
}

impl FromIterator<(usize, CaseBases)> for ReducedOrderBases {
    fn from_iter<I: IntoIterator<Item = (usize, CaseBases)>>(iter: I) -> Self {
        let mut out = Self::default();
        for (index, bases) in iter {
            out.case_indices.push(index);
            out.state_spaces.push(bases.state_space);
            out.right_bases.push(bases.right);
            out.left_bases_t.push(bases.left_t);
        }
        out
    }
}

/// Pick the reduction named `method`, or the only stored one when `None`.
pub fn select_reduction<'a>(
    case_id: &str,
    data: &'a CaseData,
    method: Option<&str>,
) -> Result<&'a Reduction> {
    let reductions = &data.aero.reductions;
    match method {
        Some(method) => reductions
            .get(method)
            .ok_or_else(|| LibraryError::MissingReduction {
                case_id: case_id.to_string(),
                method: method.to_string(),
                available: data.aero.methods(),
            }),
        None => {
            let mut iter = reductions.values();
            match (iter.next(), iter.next()) {
                (Some(only), None) => Ok(only),
                (None, _) => Err(LibraryError::MissingReduction {
                    case_id: case_id.to_string(),
                    method: "<any>".to_string(),
                    available: Vec::new(),
                }),
                _ => Err(LibraryError::AmbiguousReduction {
                    case_id: case_id.to_string(),
                    available: data.aero.methods(),
                }),
            }
        }
    }
}

/// Strategy extracting the interpolation ingredients of one target subsystem.
pub trait BasisExtractor: Send + Sync {
    /// Tag the extractor is registered under.
    fn target(&self) -> &str;

    fn extract(&self, case_id: &str, data: &CaseData, method: Option<&str>) -> Result<CaseBases>;
}

/// Aerodynamic subsystem alone: reduced UVLM realization with `V`, `W^T`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UvlmExtractor;

impl BasisExtractor for UvlmExtractor {
    fn target(&self) -> &str {
        "uvlm"
    }

    fn extract(&self, case_id: &str, data: &CaseData, method: Option<&str>) -> Result<CaseBases> {
        let reduction = select_reduction(case_id, data, method)?;
        Ok(CaseBases {
            state_space: data.aero.ss.clone(),
            right: reduction.v.clone(),
            left_t: reduction.w.transpose(),
        })
    }
}

/// Coupled aeroelastic system. The aerodynamic bases are augmented with an
/// identity block over the structural states, which stay unprojected.
#[derive(Debug, Clone, Copy, Default)]
pub struct AeroelasticExtractor;

impl BasisExtractor for AeroelasticExtractor {
    fn target(&self) -> &str {
        "aeroelastic"
    }

    fn extract(&self, case_id: &str, data: &CaseData, method: Option<&str>) -> Result<CaseBases> {
        let reduction = select_reduction(case_id, data, method)?;
        let n_struct = data.structure.ss.states();
        let eye = Mat::identity(n_struct, n_struct);
        Ok(CaseBases {
            state_space: data.coupled.clone(),
            right: block_diag(&[&reduction.v, &eye]),
            left_t: block_diag(&[&reduction.w.transpose(), &eye]),
        })
    }
}

/// Placeholder for structural-only interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralExtractor;

impl BasisExtractor for StructuralExtractor {
    fn target(&self) -> &str {
        "structural"
    }

    fn extract(&self, _case_id: &str, _data: &CaseData, _method: Option<&str>) -> Result<CaseBases> {
        Err(LibraryError::NotImplemented {
            target: self.target().to_string(),
        })
    }
}

pub struct ExtractorRegistry {
    extractors: BTreeMap<String, Box<dyn BasisExtractor>>,
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: BTreeMap::new(),
        }
    }

    /// Registry with the `uvlm`, `aeroelastic` and `structural` targets.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(UvlmExtractor);
        registry.register(AeroelasticExtractor);
        registry.register(StructuralExtractor);
        registry
    }

    /// Register `extractor`, replacing any extractor with the same tag.
    pub fn register(&mut self, extractor: impl BasisExtractor + 'static) {
        self.extractors
            .insert(extractor.target().to_string(), Box::new(extractor));
    }

    pub fn targets(&self) -> Vec<String> {
        self.extractors.keys().cloned().collect()
    }

    pub fn get(&self, target: &str) -> Result<&dyn BasisExtractor> {
        self.extractors
            .get(target)
            .map(|e| e.as_ref())
            .ok_or_else(|| LibraryError::UnrecognizedSystem {
                target: target.to_string(),
                known: self.targets(),
            })
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("targets", &self.targets())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{PayloadSpec, case_data};

    fn payload() -> (PayloadSpec, CaseData) {
        let spec = PayloadSpec::default();
        let data = case_data(&spec, 0.5).unwrap();
        (spec, data)
    }

    #[test]
    fn uvlm_returns_reduced_system_and_bases() {
        let (spec, data) = payload();
        let bases = UvlmExtractor.extract("c0", &data, None).unwrap();

        assert_eq!(bases.state_space, data.aero.ss);
        assert_eq!(bases.right.shape(), (spec.aero_states, spec.reduced_states));
        assert_eq!(bases.left_t.shape(), (spec.reduced_states, spec.aero_states));
    }

    #[test]
    fn aeroelastic_bases_leave_structural_states_unprojected() {
        let (spec, data) = payload();
        let bases = AeroelasticExtractor
            .extract("c0", &data, Some("Krylov"))
            .unwrap();

        let rows = spec.aero_states + spec.struct_states;
        let cols = spec.reduced_states + spec.struct_states;
        assert_eq!(bases.right.shape(), (rows, cols));
        assert_eq!(bases.left_t.shape(), (cols, rows));
        assert_eq!(bases.state_space, data.coupled);

        let structural = bases
            .right
            .view((spec.aero_states, spec.reduced_states), (spec.struct_states, spec.struct_states));
        assert_eq!(structural, Mat::identity(spec.struct_states, spec.struct_states));
        assert_eq!(
            bases
                .right
                .view((0, spec.reduced_states), (spec.aero_states, spec.struct_states))
                .abs()
                .max(),
            0.0
        );
    }

    #[test]
    fn structural_is_not_implemented() {
        let (_, data) = payload();
        let err = StructuralExtractor.extract("c0", &data, None).unwrap_err();
        assert!(matches!(err, LibraryError::NotImplemented { ref target } if target == "structural"));
    }

    #[test]
    fn registry_rejects_unknown_target() {
        let registry = ExtractorRegistry::with_defaults();
        assert_eq!(registry.targets(), ["aeroelastic", "structural", "uvlm"]);
        let err = registry.get("thermal").err().unwrap();
        assert!(matches!(err, LibraryError::UnrecognizedSystem { ref target, .. } if target == "thermal"));
    }

    #[test]
    fn reduction_selection() {
        let (_, mut data) = payload();
        assert!(select_reduction("c0", &data, None).is_ok());

        let err = select_reduction("c0", &data, Some("POD")).unwrap_err();
        assert!(matches!(err, LibraryError::MissingReduction { ref method, .. } if method == "POD"));

        let krylov = data.aero.reductions["Krylov"].clone();
        data.aero.reductions.insert("POD".to_string(), krylov);
        let err = select_reduction("c0", &data, None).unwrap_err();
        assert!(matches!(err, LibraryError::AmbiguousReduction { .. }));
        assert!(select_reduction("c0", &data, Some("POD")).is_ok());
    }

    #[test]
    fn custom_extractor_can_be_registered() {
        struct FullOrderAero;
        impl BasisExtractor for FullOrderAero {
            fn target(&self) -> &str {
                "uvlm_fom"
            }
            fn extract(
                &self,
                case_id: &str,
                data: &CaseData,
                method: Option<&str>,
            ) -> Result<CaseBases> {
                let r = select_reduction(case_id, data, method)?;
                let n = r.full_order.states();
                Ok(CaseBases {
                    state_space: r.full_order.clone(),
                    right: Mat::identity(n, n),
                    left_t: Mat::identity(n, n),
                })
            }
        }

        let mut registry = ExtractorRegistry::with_defaults();
        registry.register(FullOrderAero);
        let (spec, data) = payload();
        let bases = registry
            .get("uvlm_fom")
            .unwrap()
            .extract("c0", &data, None)
            .unwrap();
        assert_eq!(bases.state_space.states(), spec.aero_states);
    }
}
