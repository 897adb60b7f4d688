//! `pca-project`: fit a PCA on a delimited sample matrix and write the scores.
//!
//! ```bash
//! pca-project data.csv projected.csv -k 3
//! RUST_LOG=debug pca-project data.csv projected.csv
//! ```

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};

use concordant_pca::io::{load_matrix, save_matrix};
use concordant_pca::{JacobiConfig, PcaConfig, PCA};

#[derive(Parser, Debug)]
#[command(
    name = "pca-project",
    version,
    about = "Project samples onto their top principal components",
    long_about = None,
)]
struct Args {
    /// Input matrix: one sample per line, comma separated, no header.
    input: PathBuf,

    /// Where to write the N×K projection (6 fractional digits).
    output: PathBuf,

    /// Number of components to keep. Values above the feature count are
    /// clamped with a warning.
    #[arg(short = 'k', long = "components", default_value_t = 2)]
    components: usize,

    /// Relative off-diagonal tolerance of the Jacobi solver.
    #[arg(long, default_value_t = 1e-12)]
    tolerance: f64,

    /// Sweep bound of the Jacobi solver; defaults to one derived from the
    /// feature count.
    #[arg(long)]
    max_sweeps: Option<usize>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let data = load_matrix(&args.input)?;
    let n_features = data.ncols();
    let mut n_components = args.components;
    if n_components > n_features {
        warn!(
            "Requested {} components but the data has {} features; using {}.",
            n_components, n_features, n_features
        );
        n_components = n_features;
    }

    let config = PcaConfig {
        n_components,
        jacobi: JacobiConfig {
            tolerance: args.tolerance,
            max_sweeps: args.max_sweeps,
        },
        ..PcaConfig::default()
    };
    let mut pca = PCA::new(config);
    let scores = pca.fit(data.view())?;
    save_matrix(&args.output, scores.view())?;

    if let (Some(variance), Some(ratio)) = (
        pca.explained_variance(),
        pca.cumulative_explained_variance_ratio(),
    ) {
        for (k, (lambda, cumulative)) in variance.iter().zip(ratio.iter()).enumerate() {
            info!(
                "PC{}: eigenvalue {:.6}, cumulative explained variance {:.2}%",
                k + 1,
                lambda,
                cumulative * 100.0
            );
        }
    }
    Ok(())
}
