//! Parameter-grid indexing.
//!
//! Turns an unordered set of parameter-tagged cases into a rectangular grid:
//! the distinct sorted values of every parameter span the axes, each case is
//! assigned one coordinate, and a dense D-dimensional array maps coordinates
//! back to case indices. Grids may be sparse (not every coordinate holds a
//! case) but never ambiguous (no coordinate holds two).

use std::collections::HashMap;

use log::debug;
use ndarray::{ArrayD, IxDyn};

use crate::{CaseRecord, GridOptions, LibraryError, Real, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    parameters: Vec<String>,
    param_values: Vec<Vec<Real>>,
    parameter_index: HashMap<String, usize>,
    mapping: Vec<Vec<usize>>,
    inverse_mapping: ArrayD<Option<usize>>,
}

/// Sorted distinct values; with a tolerance, values within `tol` of the last
/// kept value collapse onto it.
fn distinct_sorted(mut values: Vec<Real>, tolerance: Option<Real>) -> Vec<Real> {
    values.sort_by(Real::total_cmp);
    match tolerance {
        None => values.dedup(),
        Some(tol) => values.dedup_by(|next, kept| (*next - *kept).abs() <= tol),
    }
    values
}

fn locate(axis: &[Real], value: Real, tolerance: Option<Real>) -> Option<usize> {
    match tolerance {
        None => axis.iter().position(|&v| v == value),
        Some(tol) => axis.iter().position(|&v| (v - value).abs() <= tol),
    }
}

impl ParameterGrid {
    /// Build the grid for `cases`.
    ///
    /// Every case must carry exactly the parameter names of the first case.
    /// Any schema mismatch, lookup miss or coordinate collision aborts the
    /// build; no partial grid is returned.
    pub fn build(cases: &[CaseRecord], options: &GridOptions) -> Result<Self> {
        options.validate()?;
        let first = cases.first().ok_or(LibraryError::EmptyLibrary)?;
        let parameters = first.parameter_names();

        for case in cases {
            let same_names = case.parameters.len() == parameters.len()
                && parameters
                    .iter()
                    .all(|name| case.parameters.contains_key(name));
            if !same_names {
                return Err(LibraryError::Schema {
                    case_id: case.case_id.clone(),
                    expected: parameters.clone(),
                    found: case.parameter_names(),
                });
            }
        }

        let parameter_index: HashMap<String, usize> = parameters
            .iter()
            .enumerate()
            .map(|(d, name)| (name.clone(), d))
            .collect();

        let param_values: Vec<Vec<Real>> = parameters
            .iter()
            .map(|name| {
                let column = cases.iter().map(|c| c.parameters[name.as_str()]).collect();
                distinct_sorted(column, options.tolerance)
            })
            .collect();

        let shape: Vec<usize> = param_values.iter().map(Vec::len).collect();
        let mut inverse_mapping = ArrayD::from_elem(IxDyn(&shape), None);
        let mut mapping = Vec::with_capacity(cases.len());

        for (case_idx, case) in cases.iter().enumerate() {
            let mut coordinate = Vec::with_capacity(parameters.len());
            for (d, name) in parameters.iter().enumerate() {
                let value = case.parameters[name.as_str()];
                let i = locate(&param_values[d], value, options.tolerance).ok_or_else(|| {
                    LibraryError::Lookup {
                        case_id: case.case_id.clone(),
                        parameter: name.clone(),
                        value,
                    }
                })?;
                coordinate.push(i);
            }

            let cell = &mut inverse_mapping[IxDyn(&coordinate)];
            if let Some(existing) = *cell {
                return Err(LibraryError::GridCollision {
                    coordinate,
                    existing,
                    incoming: case_idx,
                });
            }
            *cell = Some(case_idx);
            mapping.push(coordinate);
        }

        debug!(
            "parameter grid built: {} cases, parameters {:?}, shape {:?}",
            cases.len(),
            parameters,
            shape
        );

        Ok(Self {
            parameters,
            param_values,
            parameter_index,
            mapping,
            inverse_mapping,
        })
    }

    /// Parameter names, one per grid dimension.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Sorted distinct values of every dimension.
    pub fn param_values(&self) -> &[Vec<Real>] {
        &self.param_values
    }

    pub fn parameter_index(&self) -> &HashMap<String, usize> {
        &self.parameter_index
    }

    /// Coordinate of every case, indexed by case.
    pub fn mapping(&self) -> &[Vec<usize>] {
        &self.mapping
    }

    /// Dense coordinate -> case array; `None` marks unoccupied grid points.
    pub fn inverse_mapping(&self) -> &ArrayD<Option<usize>> {
        &self.inverse_mapping
    }

    pub fn dimensions(&self) -> usize {
        self.parameters.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.inverse_mapping.shape().to_vec()
    }

    pub fn case_count(&self) -> usize {
        self.mapping.len()
    }

    /// Case occupying `coordinate`, if any. Out-of-range coordinates yield `None`.
    pub fn case_at(&self, coordinate: &[usize]) -> Option<usize> {
        if coordinate.len() != self.dimensions() {
            return None;
        }
        self.inverse_mapping
            .get(IxDyn(coordinate))
            .copied()
            .flatten()
    }

    pub fn coordinate_of(&self, case: usize) -> Option<&[usize]> {
        self.mapping.get(case).map(Vec::as_slice)
    }

    /// Axis values of the named parameter.
    pub fn values_of(&self, parameter: &str) -> Option<&[Real]> {
        let d = *self.parameter_index.get(parameter)?;
        Some(&self.param_values[d])
    }

    /// `true` when every grid point holds a case.
    pub fn is_complete(&self) -> bool {
        self.inverse_mapping.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_point;

    fn case(id: &str, params: &[(&str, Real)]) -> CaseRecord {
        CaseRecord::new(
            id,
            format!("{id}.json"),
            parameter_point(params.iter().map(|&(k, v)| (k, v))),
        )
    }

    fn square_cases() -> Vec<CaseRecord> {
        vec![
            case("c0", &[("alpha", 0.0), ("beta", 0.0)]),
            case("c1", &[("alpha", 0.0), ("beta", 5.0)]),
            case("c2", &[("alpha", 10.0), ("beta", 0.0)]),
            case("c3", &[("alpha", 10.0), ("beta", 5.0)]),
        ]
    }

    #[test]
    fn two_by_two_grid() {
        let grid = ParameterGrid::build(&square_cases(), &GridOptions::default()).unwrap();

        assert_eq!(grid.parameters(), ["alpha", "beta"]);
        assert_eq!(grid.param_values(), [vec![0.0, 10.0], vec![0.0, 5.0]]);
        assert_eq!(grid.shape(), vec![2, 2]);
        assert_eq!(grid.parameter_index()["beta"], 1);

        let mut seen: Vec<usize> = grid.inverse_mapping().iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(grid.is_complete());

        assert_eq!(grid.case_at(&[0, 1]), Some(1));
        assert_eq!(grid.case_at(&[1, 0]), Some(2));
        assert_eq!(grid.coordinate_of(3), Some(&[1, 1][..]));
    }

    #[test]
    fn unordered_input_is_sorted_per_axis() {
        let cases = vec![
            case("a", &[("mach", 0.8), ("alpha", 2.0)]),
            case("b", &[("mach", 0.2), ("alpha", -1.0)]),
            case("c", &[("mach", 0.5), ("alpha", 2.0)]),
        ];
        let grid = ParameterGrid::build(&cases, &GridOptions::default()).unwrap();

        assert_eq!(grid.values_of("mach"), Some(&[0.2, 0.5, 0.8][..]));
        assert_eq!(grid.values_of("alpha"), Some(&[-1.0, 2.0][..]));
        assert_eq!(grid.mapping(), [vec![2, 1], vec![0, 0], vec![1, 1]]);
        assert!(!grid.is_complete());
        assert_eq!(grid.case_at(&[0, 1]), None);
    }

    #[test]
    fn mapping_round_trips_through_axis_values() {
        let cases = vec![
            case("a", &[("x", 3.0), ("y", 1.0), ("z", 7.5)]),
            case("b", &[("x", 1.0), ("y", 1.0), ("z", 7.5)]),
            case("c", &[("x", 2.0), ("y", 4.0), ("z", -7.5)]),
            case("d", &[("x", 3.0), ("y", 4.0), ("z", 7.5)]),
        ];
        let grid = ParameterGrid::build(&cases, &GridOptions::default()).unwrap();

        for (c, record) in cases.iter().enumerate() {
            let coord = grid.coordinate_of(c).unwrap();
            for (d, name) in grid.parameters().iter().enumerate() {
                assert_eq!(grid.param_values()[d][coord[d]], record.parameters[name]);
            }
            assert_eq!(grid.case_at(coord), Some(c));
        }
        for axis in grid.param_values() {
            assert!(axis.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn parameter_order_follows_first_case() {
        let cases = vec![
            case("a", &[("beta", 1.0), ("alpha", 0.0)]),
            case("b", &[("alpha", 1.0), ("beta", 2.0)]),
        ];
        let grid = ParameterGrid::build(&cases, &GridOptions::default()).unwrap();
        assert_eq!(grid.parameters(), ["beta", "alpha"]);
        assert_eq!(grid.coordinate_of(1), Some(&[1, 1][..]));
    }

    #[test]
    fn identical_parameter_vectors_collide() {
        let cases = vec![
            case("a", &[("alpha", 1.0)]),
            case("b", &[("alpha", 2.0)]),
            case("c", &[("alpha", 1.0)]),
        ];
        let err = ParameterGrid::build(&cases, &GridOptions::default()).unwrap_err();
        match err {
            LibraryError::GridCollision {
                coordinate,
                existing,
                incoming,
            } => {
                assert_eq!(coordinate, vec![0]);
                assert_eq!(existing, 0);
                assert_eq!(incoming, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_parameter_is_schema_error() {
        let cases = vec![
            case("a", &[("alpha", 1.0), ("beta", 0.0)]),
            case("b", &[("alpha", 2.0)]),
        ];
        let err = ParameterGrid::build(&cases, &GridOptions::default()).unwrap_err();
        assert!(matches!(err, LibraryError::Schema { ref case_id, .. } if case_id == "b"));
    }

    #[test]
    fn renamed_parameter_is_schema_error() {
        let cases = vec![
            case("a", &[("alpha", 1.0)]),
            case("b", &[("aoa", 2.0)]),
        ];
        let err = ParameterGrid::build(&cases, &GridOptions::default()).unwrap_err();
        assert!(matches!(err, LibraryError::Schema { .. }));
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = ParameterGrid::build(&[], &GridOptions::default()).unwrap_err();
        assert!(matches!(err, LibraryError::EmptyLibrary));
    }

    #[test]
    fn nan_value_fails_lookup() {
        let cases = vec![case("a", &[("alpha", f64::NAN)])];
        let err = ParameterGrid::build(&cases, &GridOptions::default()).unwrap_err();
        assert!(matches!(err, LibraryError::Lookup { ref parameter, .. } if parameter == "alpha"));
    }

    #[test]
    fn exact_matching_keeps_nearby_values_apart() {
        let cases = vec![
            case("a", &[("alpha", 0.1 + 0.2)]),
            case("b", &[("alpha", 0.3)]),
        ];
        let grid = ParameterGrid::build(&cases, &GridOptions::default()).unwrap();
        assert_eq!(grid.shape(), vec![2]);
    }

    #[test]
    fn tolerance_merges_nearby_values() {
        let cases = vec![
            case("a", &[("alpha", 0.1 + 0.2), ("beta", 0.0)]),
            case("b", &[("alpha", 0.3), ("beta", 1.0)]),
        ];
        let options = GridOptions {
            tolerance: Some(1e-12),
        };
        let grid = ParameterGrid::build(&cases, &options).unwrap();
        assert_eq!(grid.shape(), vec![1, 2]);
        assert_eq!(grid.mapping(), [vec![0, 0], vec![0, 1]]);
    }

    #[test]
    fn tolerance_can_turn_near_duplicates_into_collisions() {
        let cases = vec![
            case("a", &[("alpha", 1.0)]),
            case("b", &[("alpha", 1.0 + 1e-13)]),
        ];
        let options = GridOptions {
            tolerance: Some(1e-9),
        };
        let err = ParameterGrid::build(&cases, &options).unwrap_err();
        assert!(matches!(err, LibraryError::GridCollision { .. }));
    }

    #[test]
    fn invalid_tolerance_is_rejected_before_lookup() {
        let cases = vec![case("a", &[("x", 1.0)]), case("b", &[("x", 2.0)])];
        for tol in [-1.0, Real::NAN] {
            let options = GridOptions {
                tolerance: Some(tol),
            };
            let err = ParameterGrid::build(&cases, &options).unwrap_err();
            assert!(matches!(err, LibraryError::InvalidTolerance(_)), "{err}");
        }
    }

    #[test]
    fn case_at_rejects_wrong_rank_and_out_of_range() {
        let grid = ParameterGrid::build(&square_cases(), &GridOptions::default()).unwrap();
        assert_eq!(grid.case_at(&[0]), None);
        assert_eq!(grid.case_at(&[2, 0]), None);
        assert_eq!(grid.coordinate_of(4), None);
        assert_eq!(grid.values_of("gamma"), None);
    }
}
