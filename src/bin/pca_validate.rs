//! `pca-validate`: compare a candidate projection against this crate's own.
//!
//! Recomputes the reference projection of `input` with as many components as
//! the candidate has columns, aligns signs per component and prints the
//! concordance report as JSON on stdout.
//!
//! ```bash
//! pca-validate data.csv other_tool_scores.csv --labels classes.txt
//! ```

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;
use serde::Serialize;

use concordant_pca::io::{load_labels, load_matrix};
use concordant_pca::{
    validate_with_breakdown, JacobiEigenSolver, PcaConfig, ProjectionValidation,
    SymmetricEigenSolver, PCA,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Solver {
    Jacobi,
    #[cfg(feature = "lapack")]
    Lapack,
}

#[derive(Parser, Debug)]
#[command(
    name = "pca-validate",
    version,
    about = "Check a PCA projection from another tool against a reference fit",
    long_about = None,
)]
struct Args {
    /// Original sample matrix the candidate was computed from.
    input: PathBuf,

    /// Candidate N×K projection to validate.
    candidate: PathBuf,

    /// Optional class labels, one integer per sample, for a per-class breakdown.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Eigensolver used for the reference projection.
    #[arg(long, value_enum, default_value_t = Solver::Jacobi)]
    solver: Solver,

    /// Emit indented JSON.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Serialize)]
struct ValidationOutput {
    solver: &'static str,
    #[serde(flatten)]
    validation: ProjectionValidation,
}

fn make_solver(choice: Solver) -> Box<dyn SymmetricEigenSolver> {
    match choice {
        Solver::Jacobi => Box::new(JacobiEigenSolver::default()),
        #[cfg(feature = "lapack")]
        Solver::Lapack => Box::new(concordant_pca::LapackEigenSolver),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let data = load_matrix(&args.input)?;
    let candidate = load_matrix(&args.candidate)?;
    if candidate.nrows() != data.nrows() {
        return Err(format!(
            "candidate has {} rows but the input has {} samples",
            candidate.nrows(),
            data.nrows()
        )
        .into());
    }

    let solver = make_solver(args.solver);
    let mut pca = PCA::new(PcaConfig::with_components(candidate.ncols()));
    let reference = pca.fit_with_solver(data.view(), solver.as_ref())?;

    let degenerate = pca
        .components()
        .map(|components| components.degenerate_indices())
        .unwrap_or_default();
    let labels = match &args.labels {
        Some(path) => Some(load_labels(path)?),
        None => None,
    };
    let validation = validate_with_breakdown(
        reference.view(),
        candidate.view(),
        &degenerate,
        labels.as_deref(),
    )?;
    info!(
        "Flipped components {:?}; overall agreement: {}.",
        validation.report.flipped, validation.report.agreement
    );

    let output = ValidationOutput {
        solver: solver.name(),
        validation,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{json}");
    Ok(())
}
