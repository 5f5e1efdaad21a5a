//! Parametric reduced-order model (ROM) libraries.
//!
//! This crate manages a library of precomputed ROMs, each produced from a
//! full-order simulation at a distinct point of a multi-dimensional parameter
//! space, and prepares the ingredients an interpolation routine needs:
//!
//! - an ordered case store with a designated reference case ([`RomLibrary`]),
//! - a rectangular parameter grid with bidirectional coordinate/case maps
//!   ([`ParameterGrid`]),
//! - per-case state spaces and projection bases for a target subsystem
//!   ([`ExtractorRegistry`], [`ReducedOrderBases`]),
//! - a store for interpolation results ([`InterpolatedRomLibrary`]).
//!
//! # Example
//!
//! ```
//! use pmor_core::{CaseRecord, RomLibrary, parameter_point};
//!
//! let mut library = RomLibrary::new();
//! library.add_case(CaseRecord::new(
//!     "m0_a0",
//!     "cases/m0_a0/data.json",
//!     parameter_point([("mach", 0.0), ("alpha", 0.0)]),
//! ));
//! library.add_case(CaseRecord::new(
//!     "m0_a5",
//!     "cases/m0_a5/data.json",
//!     parameter_point([("mach", 0.0), ("alpha", 5.0)]),
//! ));
//!
//! let grid = library.sort_grid().unwrap();
//! assert_eq!(grid.shape(), vec![1, 2]);
//! assert_eq!(grid.case_at(&[0, 1]), Some(1));
//! ```

/// Basis and state-space extraction strategies.
mod bases;
/// Case records and parameter points.
mod case;
/// Library configuration.
mod config;
/// Heavy per-case payloads.
mod data;
/// On-disk case discovery.
mod discovery;
mod error;
/// Parameter-grid indexing.
mod grid;
/// Interpolation result store.
mod interpolated;
/// Case store and persistence.
mod library;
/// Linear algebra aliases and block helpers.
mod math;
/// User-feedback sinks.
mod report;
/// Linear state-space realizations.
mod state_space;
/// Deterministic synthetic payloads for tests and demos.
///
/// Public so integration tests and the CLI test-suite can build libraries
/// without real simulation output; not intended for production use.
pub mod synthetic;

pub use bases::*;
pub use case::*;
pub use config::*;
pub use data::*;
pub use discovery::*;
pub use error::*;
pub use grid::*;
pub use interpolated::*;
pub use library::*;
pub use math::*;
pub use report::*;
pub use state_space::*;
