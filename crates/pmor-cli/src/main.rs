use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::Level;
use pmor_core::{DirectoryCaseSource, LibraryConfig, Real, RomLibrary, WriterReporter};
use serde::Serialize;

/// Manage libraries of parametric reduced-order models.
#[derive(Debug, Parser)]
#[command(author, version, about = "Parametric ROM library tool")]
struct Args {
    /// Optional path to a JSON LibraryConfig. Defaults are used if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only report warnings and errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a library from a folder of case directories and save it.
    Create {
        /// Folder containing one sub-directory per case.
        #[arg(long)]
        source: PathBuf,
        /// Library file to write.
        #[arg(long)]
        output: PathBuf,
    },
    /// Print the cases of a library.
    Show { library: PathBuf },
    /// Add a single case directory to a library.
    Add { library: PathBuf, case_dir: PathBuf },
    /// Remove the case at INDEX.
    Remove { library: PathBuf, index: usize },
    /// Set the reference case.
    SetReference { library: PathBuf, index: usize },
    /// Print the parameter grid as JSON.
    Grid { library: PathBuf },
    /// Load case data and print basis shapes for a target system as JSON.
    Bases {
        library: PathBuf,
        #[arg(long, default_value = "aeroelastic")]
        target: String,
    },
}

#[derive(Debug, Serialize)]
struct GridReport {
    parameters: Vec<String>,
    param_values: Vec<Vec<Real>>,
    shape: Vec<usize>,
    mapping: Vec<Vec<usize>>,
    complete: bool,
}

#[derive(Debug, Serialize)]
struct BasesReport {
    target: String,
    case_indices: Vec<usize>,
    states: Vec<usize>,
    right_shapes: Vec<(usize, usize)>,
    left_shapes: Vec<(usize, usize)>,
}

fn open_library(config: &LibraryConfig, path: &Path, quiet: bool) -> Result<RomLibrary> {
    let mut library = RomLibrary::with_config(config.clone()).with_reporter(reporter(quiet));
    library
        .restore(path)
        .with_context(|| format!("loading library {}", path.display()))?;
    Ok(library)
}

fn reporter(quiet: bool) -> Arc<WriterReporter<std::io::Stderr>> {
    let level = if quiet { Level::Warn } else { Level::Info };
    Arc::new(WriterReporter::stderr(level))
}

fn load_config(path: Option<&Path>) -> Result<LibraryConfig> {
    match path {
        Some(p) => LibraryConfig::from_json_file(p)
            .with_context(|| format!("reading config {}", p.display())),
        None => Ok(LibraryConfig::default()),
    }
}

/// Run one command, returning what should be printed on stdout.
fn run(args: &Args) -> Result<String> {
    let config = load_config(args.config.as_deref())?;

    match &args.command {
        Command::Create { source, output } => {
            let mut library = RomLibrary::new().with_reporter(reporter(args.quiet));
            let config = LibraryConfig {
                source_path: Some(source.clone()),
                ..config
            };
            let discovery = library.create(config, &DirectoryCaseSource)?;
            library.persist(output)?;
            Ok(format!(
                "created library with {} cases ({} skipped)\n",
                discovery.cases.len(),
                discovery.skipped.len()
            ))
        }
        Command::Show { library } => {
            Ok(open_library(&config, library, args.quiet)?.display_library())
        }
        Command::Add { library, case_dir } => {
            let mut lib = open_library(&config, library, args.quiet)?;
            let index = lib
                .load_case(&DirectoryCaseSource, case_dir)
                .with_context(|| format!("no case found in {}", case_dir.display()))?;
            lib.persist(library)?;
            Ok(format!("added case {index}\n"))
        }
        Command::Remove { library, index } => {
            let mut lib = open_library(&config, library, args.quiet)?;
            let removed = lib.remove_case(*index)?;
            lib.persist(library)?;
            Ok(format!("removed case {index} ({})\n", removed.case_id))
        }
        Command::SetReference { library, index } => {
            let mut lib = open_library(&config, library, args.quiet)?;
            lib.set_reference_case(*index)?;
            lib.persist(library)?;
            Ok(format!("reference case set to {index}\n"))
        }
        Command::Grid { library } => {
            let mut lib = open_library(&config, library, args.quiet)?;
            let grid = lib.sort_grid()?;
            let report = GridReport {
                parameters: grid.parameters().to_vec(),
                param_values: grid.param_values().to_vec(),
                shape: grid.shape(),
                mapping: grid.mapping().to_vec(),
                complete: grid.is_complete(),
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Command::Bases { library, target } => {
            let mut lib = open_library(&config, library, args.quiet)?;
            lib.materialize_data()?;
            let bases = lib.get_reduced_order_bases(target)?;
            let report = BasesReport {
                target: target.clone(),
                case_indices: bases.case_indices.clone(),
                states: bases.state_spaces.iter().map(|ss| ss.states()).collect(),
                right_shapes: bases.right_bases.iter().map(|m| m.shape()).collect(),
                left_shapes: bases.left_bases_t.iter().map(|m| m.shape()).collect(),
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let out = run(&args)?;
    print!("{out}");
    Ok(())
}
