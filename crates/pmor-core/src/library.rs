//! ROM library store.
//!
//! [`RomLibrary`] owns the ordered case list (the position of a case is its
//! index everywhere else), the reference case, the lazily loaded payloads and
//! the cached parameter grid. Every mutation of the case list drops the
//! cached grid and the loaded payloads.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    CaseData, CaseLoadFailure, CaseRecord, CaseSource, Discovery, ExtractorRegistry,
    LibraryConfig, LibraryError, LoadFailurePolicy, LogReporter, Mat, ParameterGrid,
    ReducedOrderBases, Reporter, Result, StateSpace, couple, select_reduction,
};

/// Current version of the persisted library file.
pub const LIBRARY_SCHEMA_VERSION: u32 = 1;

/// On-disk form of a library: light case metadata plus the reference index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryFile {
    pub schema_version: u32,
    #[serde(default)]
    pub library_name: Option<String>,
    pub library: Vec<CaseRecord>,
    pub reference_case: Option<usize>,
}

/// Outcome of [`RomLibrary::materialize_data`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializeReport {
    pub loaded: usize,
    /// Cases left empty under [`LoadFailurePolicy::Skip`].
    pub failures: Vec<CaseLoadFailure>,
}

pub struct RomLibrary {
    library_name: Option<String>,
    folder: Option<PathBuf>,
    library: Vec<CaseRecord>,
    reference_case: Option<usize>,
    data_library: Option<Vec<Option<CaseData>>>,
    grid: Option<ParameterGrid>,
    config: LibraryConfig,
    extractors: ExtractorRegistry,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for RomLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RomLibrary")
            .field("library_name", &self.library_name)
            .field("folder", &self.folder)
            .field("cases", &self.library.len())
            .field("reference_case", &self.reference_case)
            .field("materialized", &self.data_library.is_some())
            .field("grid_valid", &self.grid.is_some())
            .finish()
    }
}

impl Default for RomLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl RomLibrary {
    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    pub fn new() -> Self {
        Self::with_config(LibraryConfig::default())
    }

    pub fn with_config(config: LibraryConfig) -> Self {
        Self {
            library_name: config.library_name.clone(),
            folder: config.folder.clone(),
            library: Vec::new(),
            reference_case: None,
            data_library: None,
            grid: None,
            config,
            extractors: ExtractorRegistry::with_defaults(),
            reporter: Arc::new(LogReporter),
        }
    }

    /// Replace the feedback sink.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Changing grid options drops the cached grid.
    pub fn set_config(&mut self, config: LibraryConfig) {
        if config.grid != self.config.grid {
            self.grid = None;
        }
        self.library_name = config.library_name.clone().or(self.library_name.take());
        self.folder = config.folder.clone().or(self.folder.take());
        self.config = config;
    }

    pub fn extractors_mut(&mut self) -> &mut ExtractorRegistry {
        &mut self.extractors
    }

    pub fn library_name(&self) -> Option<&str> {
        self.library_name.as_deref()
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn set_location(&mut self, library_name: impl Into<String>, folder: impl Into<PathBuf>) {
        self.library_name = Some(library_name.into());
        self.folder = Some(folder.into());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Case management
    // ─────────────────────────────────────────────────────────────────────────

    pub fn cases(&self) -> &[CaseRecord] {
        &self.library
    }

    pub fn len(&self) -> usize {
        self.library.len()
    }

    pub fn is_empty(&self) -> bool {
        self.library.is_empty()
    }

    pub fn case(&self, index: usize) -> Option<&CaseRecord> {
        self.library.get(index)
    }

    fn invalidate(&mut self) {
        self.grid = None;
        self.data_library = None;
    }

    /// Append a case. Duplicate ids are not checked.
    pub fn add_case(&mut self, record: CaseRecord) {
        self.library.push(record);
        self.invalidate();
    }

    /// Remove and return the case at `index`.
    ///
    /// A reference pointing at the removed case is cleared; a reference to a
    /// later case is shifted so it keeps designating the same case.
    pub fn remove_case(&mut self, index: usize) -> Result<CaseRecord> {
        if index >= self.library.len() {
            return Err(LibraryError::IndexOutOfRange {
                index,
                len: self.library.len(),
            });
        }
        let removed = self.library.remove(index);
        self.reference_case = match self.reference_case {
            Some(r) if r == index => {
                self.reporter.warn(&format!(
                    "removed reference case {index} ({}); reference cleared",
                    removed.case_id
                ));
                None
            }
            Some(r) if r > index => Some(r - 1),
            other => other,
        };
        self.invalidate();
        self.reporter
            .info(&format!("deleted case {index} ({})", removed.case_id));
        Ok(removed)
    }

    pub fn reference_case(&self) -> Option<usize> {
        self.reference_case
    }

    pub fn set_reference_case(&mut self, index: usize) -> Result<()> {
        if index >= self.library.len() {
            return Err(LibraryError::ReferenceOutOfRange {
                index,
                len: self.library.len(),
            });
        }
        self.reference_case = Some(index);
        Ok(())
    }

    pub fn clear_reference_case(&mut self) {
        self.reference_case = None;
    }

    /// Replace the library with every case found under `config.source_path`.
    pub fn create(&mut self, config: LibraryConfig, source: &dyn CaseSource) -> Result<Discovery> {
        let root = config
            .source_path
            .clone()
            .ok_or(LibraryError::MissingLocation("source_path"))?;
        if !root.is_dir() {
            return Err(LibraryError::NotFound { path: root });
        }
        self.reporter
            .info(&format!("loading cases from {}", root.display()));
        let discovery = source.discover(&root)?;
        for skip in &discovery.skipped {
            self.reporter.error(&format!("skipped {skip}"));
        }
        if discovery.cases.is_empty() {
            self.reporter
                .warn(&format!("no cases found in {}", root.display()));
        }

        self.set_config(config);
        self.library = discovery.cases.clone();
        self.reference_case = None;
        self.invalidate();
        Ok(discovery)
    }

    /// Describe `case_dir` and append it. Returns the new case index, or
    /// `None` when the directory was reported and skipped.
    pub fn load_case(&mut self, source: &dyn CaseSource, case_dir: &Path) -> Option<usize> {
        match source.describe(case_dir) {
            Ok(record) => {
                self.reporter.info(&format!(
                    "loaded {} from {}",
                    record.case_id,
                    case_dir.display()
                ));
                self.add_case(record);
                Some(self.library.len() - 1)
            }
            Err(skip) => {
                self.reporter.error(&format!("skipped {skip}"));
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    pub fn to_file(&self) -> LibraryFile {
        LibraryFile {
            schema_version: LIBRARY_SCHEMA_VERSION,
            library_name: self.library_name.clone(),
            library: self.library.clone(),
            reference_case: self.reference_case,
        }
    }

    /// Write the case metadata and reference case to `path`.
    ///
    /// The file is written next to its destination and renamed into place.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_file())?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        self.reporter
            .info(&format!("saved library to {}", path.display()));
        Ok(())
    }

    /// Replace cases and reference case with the contents of `path`.
    ///
    /// The file is fully parsed and validated first; on any error the
    /// library is left untouched.
    pub fn restore(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(LibraryError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let file: LibraryFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        if file.schema_version > LIBRARY_SCHEMA_VERSION {
            return Err(LibraryError::UnsupportedSchema {
                found: file.schema_version,
                supported: LIBRARY_SCHEMA_VERSION,
            });
        }
        if let Some(index) = file.reference_case.filter(|&i| i >= file.library.len()) {
            return Err(LibraryError::ReferenceOutOfRange {
                index,
                len: file.library.len(),
            });
        }

        if self.library_name.is_none() {
            self.library_name = file.library_name;
        }
        self.library = file.library;
        self.reference_case = file.reference_case;
        self.invalidate();
        self.reporter.info(&format!(
            "loaded library with {} cases from {}",
            self.library.len(),
            path.display()
        ));
        Ok(())
    }

    fn library_path(&self) -> Result<PathBuf> {
        match (&self.library_name, &self.folder) {
            (Some(name), Some(folder)) => Ok(folder.join(format!("{name}.json"))),
            _ => Err(LibraryError::MissingLocation("library name and folder")),
        }
    }

    /// Persist to `<folder>/<library_name>.json`.
    pub fn save(&self) -> Result<PathBuf> {
        let path = self.library_path()?;
        self.persist(&path)?;
        Ok(path)
    }

    /// Restore from `<folder>/<library_name>.json`.
    pub fn load(&mut self) -> Result<PathBuf> {
        let path = self.library_path()?;
        self.restore(&path)?;
        Ok(path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parameter grid
    // ─────────────────────────────────────────────────────────────────────────

    /// Build (or reuse) the parameter grid of the current cases.
    pub fn sort_grid(&mut self) -> Result<&ParameterGrid> {
        let grid = match self.grid.take() {
            Some(grid) => grid,
            None => ParameterGrid::build(&self.library, &self.config.grid)?,
        };
        Ok(self.grid.insert(grid))
    }

    /// Cached grid, `None` until [`sort_grid`](Self::sort_grid) ran on the
    /// current cases.
    pub fn grid(&self) -> Option<&ParameterGrid> {
        self.grid.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Heavy data
    // ─────────────────────────────────────────────────────────────────────────

    /// Load every case payload, in parallel, index-aligned with the cases.
    pub fn materialize_data(&mut self) -> Result<MaterializeReport> {
        let results: Vec<std::result::Result<CaseData, CaseLoadFailure>> = self
            .library
            .par_iter()
            .enumerate()
            .map(|(index, record)| {
                CaseData::from_json_file(&record.data_ref).map_err(|e| CaseLoadFailure {
                    index,
                    case_id: record.case_id.clone(),
                    path: record.data_ref.clone(),
                    reason: e.to_string(),
                })
            })
            .collect();

        let mut data = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(case) => data.push(Some(case)),
                Err(failure) => {
                    data.push(None);
                    failures.push(failure);
                }
            }
        }
        let loaded = data.len() - failures.len();
        debug!("materialized {loaded} of {} cases", data.len());

        if !failures.is_empty() {
            for failure in &failures {
                self.reporter.error(&format!("unable to load {failure}"));
            }
            if self.config.load_failure_policy == LoadFailurePolicy::Abort {
                return Err(LibraryError::Load { failures });
            }
        }

        self.data_library = Some(data);
        Ok(MaterializeReport { loaded, failures })
    }

    pub fn is_materialized(&self) -> bool {
        self.data_library.is_some()
    }

    /// Loaded payload of case `index`; `None` if not loaded or skipped.
    pub fn case_data(&self, index: usize) -> Option<&CaseData> {
        self.data_library.as_ref()?.get(index)?.as_ref()
    }

    fn loaded_cases(&self) -> Result<Vec<(usize, &CaseData)>> {
        let data = self
            .data_library
            .as_ref()
            .ok_or(LibraryError::DataNotMaterialized)?;
        Ok(data
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_ref().map(|d| (i, d)))
            .collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Interpolation ingredients
    // ─────────────────────────────────────────────────────────────────────────

    /// State spaces and projection bases of every loaded case for `target`.
    pub fn get_reduced_order_bases(&self, target: &str) -> Result<ReducedOrderBases> {
        let loaded = self.loaded_cases()?;
        let extractor = self.extractors.get(target)?;
        let method = self.config.reduction_method.as_deref();

        loaded
            .into_par_iter()
            .map(|(index, data)| {
                let case_id = &self.library[index].case_id;
                extractor
                    .extract(case_id, data, method)
                    .map(|bases| (index, bases))
            })
            .collect::<Result<Vec<_>>>()
            .map(|items| items.into_iter().collect())
    }

    /// Full-order coupled system of case `rom_index`: the aerodynamic
    /// full-order realization stored with the reduction, coupled with the
    /// structural realization through identity-shaped gains.
    pub fn retrieve_fom(&self, rom_index: usize) -> Result<StateSpace> {
        if !self.is_materialized() {
            return Err(LibraryError::DataNotMaterialized);
        }
        if rom_index >= self.library.len() {
            return Err(LibraryError::IndexOutOfRange {
                index: rom_index,
                len: self.library.len(),
            });
        }
        let data = self
            .case_data(rom_index)
            .ok_or(LibraryError::DataNotMaterialized)?;
        let case_id = &self.library[rom_index].case_id;
        let aero = &select_reduction(case_id, data, self.config.reduction_method.as_deref())?
            .full_order;
        let beam = &data.structure.ss;

        let k_as = Mat::identity(aero.inputs(), beam.outputs());
        let k_sa = Mat::identity(beam.inputs(), aero.outputs());
        Ok(couple(aero, beam, &k_as, &k_sa)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Display
    // ─────────────────────────────────────────────────────────────────────────

    /// Text table of the cases and the reference case.
    pub fn display_library(&self) -> String {
        let Some(first) = self.library.first() else {
            return "Library is empty. Nothing to display\n".to_string();
        };
        let names = first.parameter_names();

        let mut header = format!("{:>4}", "no");
        for name in &names {
            let _ = write!(header, " {name:>12}");
        }
        header.push_str("  Case Name");
        let divider = "-".repeat(header.len());

        let mut out = String::new();
        let _ = writeln!(out, "{divider}\n{header}\n{divider}");
        for (i, case) in self.library.iter().enumerate() {
            let _ = write!(out, "{i:>4}");
            for name in &names {
                match case.parameter(name) {
                    Some(v) => {
                        let _ = write!(out, " {v:>12}");
                    }
                    None => {
                        let _ = write!(out, " {:>12}", "-");
                    }
                }
            }
            let _ = writeln!(out, "  {}", case.case_id);
        }
        let _ = writeln!(out, "{divider}");
        match self.reference_case {
            Some(r) => {
                let _ = writeln!(out, "Reference case: {r}");
            }
            None => out.push_str("Reference case: None\n"),
        }
        out
    }
}
