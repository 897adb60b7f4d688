// Principal component analysis model

use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView2};

use crate::centering::{center, center_with};
use crate::config::PcaConfig;
use crate::covariance::covariance;
use crate::diagnostics::diagnose;
use crate::error::{PcaError, Result};
use crate::linalg_backends::{JacobiEigenSolver, SymmetricEigenSolver};
use crate::projection::project;
use crate::selection::{sort_components, ComponentSet};

/// Principal component analysis (PCA) structure.
///
/// Holds the mean and the selected components of a fitted model and can be
/// used to project new data into the principal component space. Data is
/// centered but never rescaled; callers who want standardized PCA should
/// scale the columns themselves before fitting.
#[derive(Debug, Clone)]
pub struct PCA {
    config: PcaConfig,
    /// Mean vector of the training data.
    /// Shape: (n_features)
    mean: Option<Array1<f64>>,
    /// Top-K components, sorted by eigenvalue.
    components: Option<ComponentSet>,
}

impl Default for PCA {
    fn default() -> Self {
        Self::new(PcaConfig::default())
    }
}

impl PCA {
    /// Creates a new, unfitted PCA.
    ///
    /// # Examples
    ///
    /// ```
    /// use concordant_pca::{PCA, PcaConfig};
    /// let pca = PCA::new(PcaConfig::with_components(2));
    /// assert!(pca.components().is_none());
    /// ```
    pub fn new(config: PcaConfig) -> Self {
        Self {
            config,
            mean: None,
            components: None,
        }
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    /// Mean vector of the training data, if fitted.
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Selected components, if fitted.
    pub fn components(&self) -> Option<&ComponentSet> {
        self.components.as_ref()
    }

    /// Rotation matrix (principal axes as columns), shape (n_features, k).
    pub fn rotation(&self) -> Option<Array2<f64>> {
        self.components.as_ref().map(ComponentSet::rotation)
    }

    /// Eigenvalues of the kept components, largest first.
    pub fn explained_variance(&self) -> Option<Array1<f64>> {
        self.components.as_ref().map(ComponentSet::eigenvalues)
    }

    /// Fraction of total variance captured by each kept component.
    pub fn explained_variance_ratio(&self) -> Option<Array1<f64>> {
        self.components
            .as_ref()
            .map(ComponentSet::explained_variance_ratio)
    }

    /// Running sum of [`PCA::explained_variance_ratio`].
    pub fn cumulative_explained_variance_ratio(&self) -> Option<Array1<f64>> {
        self.explained_variance_ratio().map(|ratios| {
            let mut running = 0.0;
            ratios.mapv(|r| {
                running += r;
                running
            })
        })
    }

    /// Fits the model with the crate's Jacobi solver and returns the scores
    /// of the training data, shape (n_samples, k).
    ///
    /// # Errors
    /// Any error from the pipeline stages: `InvalidShape`,
    /// `InsufficientSamples`, `NonConvergence`, or `InvalidParameter` when
    /// `n_components` is outside [1, n_features].
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use concordant_pca::{PCA, PcaConfig};
    ///
    /// let data = array![[1.0, 2.0], [3.0, 4.0], [2.0, 1.0]];
    /// let mut pca = PCA::new(PcaConfig::with_components(1));
    /// let scores = pca.fit(data.view()).unwrap();
    /// assert_eq!(scores.dim(), (3, 1));
    /// ```
    pub fn fit(&mut self, data_matrix: ArrayView2<f64>) -> Result<Array2<f64>> {
        let solver = JacobiEigenSolver::new(self.config.jacobi.clone());
        self.fit_with_solver(data_matrix, &solver)
    }

    /// Same as [`PCA::fit`] with an explicit eigensolver.
    pub fn fit_with_solver(
        &mut self,
        data_matrix: ArrayView2<f64>,
        solver: &dyn SymmetricEigenSolver,
    ) -> Result<Array2<f64>> {
        let (n_samples, n_features) = data_matrix.dim();
        info!(
            "Fitting PCA: {} samples x {} features, {} components, solver {}.",
            n_samples,
            n_features,
            self.config.n_components,
            solver.name()
        );
        if n_samples == 0 || n_features == 0 {
            return Err(PcaError::invalid_shape(
                "input data_matrix has zero samples or zero features",
            ));
        }
        if n_samples < 2 {
            return Err(PcaError::insufficient_samples(2, n_samples));
        }
        let k = self.config.n_components;
        if k < 1 || k > n_features {
            return Err(PcaError::invalid_parameter(format!(
                "number of components K must be in [1, {}], got {}",
                n_features, k
            )));
        }

        let (mean_vector, centered) = center(data_matrix)?;
        let cov_matrix = covariance(centered.view())?;
        let pairs = solver.decompose(cov_matrix.view())?;
        let full = sort_components(pairs, self.config.tie_tolerance)?;
        let kept = full.top_k(k)?;

        let diagnostics = diagnose(cov_matrix.view(), &full, &kept);
        debug!("Decomposition diagnostics: {:?}", diagnostics);
        if !diagnostics.degenerate_components.is_empty() {
            warn!(
                "Kept components {:?} lie in degenerate eigenspaces; their axes are not unique.",
                diagnostics.degenerate_components
            );
        }

        let scores = project(centered.view(), &kept)?;
        let ratio_kept: f64 = kept.explained_variance_ratio().sum();
        info!(
            "PCA fit complete: {} components explain {:.2}% of the variance.",
            kept.len(),
            ratio_kept * 100.0
        );

        self.mean = Some(mean_vector);
        self.components = Some(kept);
        Ok(scores)
    }

    /// Projects new data using the training mean and components.
    ///
    /// # Errors
    /// `InvalidParameter` if the model is not fitted or the feature count
    /// differs from the training data.
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let mean_vector = self.mean.as_ref().ok_or_else(|| {
            PcaError::invalid_parameter("PCA model: mean vector not set. Fit a model first.")
        })?;
        let components = self.components.as_ref().ok_or_else(|| {
            PcaError::invalid_parameter("PCA model: components not set. Fit a model first.")
        })?;
        if x.nrows() == 0 {
            return Ok(Array2::zeros((0, components.len())));
        }
        let centered = center_with(x, mean_vector)?;
        project(centered.view(), components)
    }
}
