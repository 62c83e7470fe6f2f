use eyre::{ensure, Result};
use ndarray::{s, Array1, ArrayView1};

use crate::routines::math::{log_softmax, softmax};

/// A parameter set that can be flattened into a single vector.
///
/// The optimizer only ever sees flat vectors; the layout is defined by the
/// implementor and must be stable for a given value, so that a gradient with
/// the same shape as the parameters flattens in the same order.
pub trait Params: Clone + Send + Sync {
    /// Flatten into a vector.
    fn to_flat(&self) -> Array1<f64>;

    /// Build a new value with the layout of `self` from a flat vector of the
    /// same length as [Params::to_flat] produces.
    fn with_flat(&self, flat: ArrayView1<f64>) -> Self;

    /// Number of scalar entries.
    fn n_flat(&self) -> usize {
        self.to_flat().len()
    }
}

/// Parameters of a one-dimensional Gaussian mixture.
///
/// Holds three vectors of equal length, one entry per component:
/// - `log_weights`: unnormalized log weights, normalized with a log-space softmax
/// - `means`: component means
/// - `log_scales`: logarithm of the component standard deviations
///
/// Keeping weights and scales in log space leaves every entry unconstrained
/// while `exp(log_scale)` stays strictly positive and the normalized weights
/// stay on the simplex.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureParams {
    log_weights: Array1<f64>,
    means: Array1<f64>,
    log_scales: Array1<f64>,
}

impl MixtureParams {
    /// Create a new [MixtureParams], checking that all three vectors have
    /// the same, non-zero length.
    pub fn new(log_weights: Array1<f64>, means: Array1<f64>, log_scales: Array1<f64>) -> Result<Self> {
        ensure!(
            !log_weights.is_empty(),
            "A mixture needs at least one component"
        );
        ensure!(
            log_weights.len() == means.len() && means.len() == log_scales.len(),
            "Mixture parameter vectors must have equal length, got {} log weights, {} means and {} log scales",
            log_weights.len(),
            means.len(),
            log_scales.len()
        );
        Ok(Self {
            log_weights,
            means,
            log_scales,
        })
    }

    /// Create a [MixtureParams] from natural-scale values: unnormalized
    /// positive weights and positive standard deviations.
    pub fn from_natural(weights: &[f64], means: &[f64], scales: &[f64]) -> Result<Self> {
        ensure!(
            weights.iter().all(|&w| w > 0.0 && w.is_finite()),
            "Mixture weights must be positive and finite, got {:?}",
            weights
        );
        ensure!(
            scales.iter().all(|&s| s > 0.0 && s.is_finite()),
            "Mixture scales must be positive and finite, got {:?}",
            scales
        );
        Self::new(
            weights.iter().map(|w| w.ln()).collect(),
            Array1::from_vec(means.to_vec()),
            scales.iter().map(|s| s.ln()).collect(),
        )
    }

    /// Get the number of mixture components.
    pub fn n_components(&self) -> usize {
        self.means.len()
    }

    /// Get the unnormalized log weights.
    pub fn log_weights(&self) -> ArrayView1<f64> {
        self.log_weights.view()
    }

    /// Get the component means.
    pub fn means(&self) -> ArrayView1<f64> {
        self.means.view()
    }

    /// Get the log standard deviations.
    pub fn log_scales(&self) -> ArrayView1<f64> {
        self.log_scales.view()
    }

    /// Normalized component weights.
    pub fn weights(&self) -> Array1<f64> {
        softmax(self.log_weights.view())
    }

    /// Normalized log weights, `a_j - logsumexp(a)`.
    pub fn normalized_log_weights(&self) -> Array1<f64> {
        log_softmax(self.log_weights.view())
    }

    /// Component standard deviations.
    pub fn scales(&self) -> Array1<f64> {
        self.log_scales.mapv(f64::exp)
    }

    /// Return the component indices ordered by increasing mean.
    ///
    /// Mixture components are only identified up to a permutation; this gives
    /// a canonical order for reporting and comparison.
    pub fn order_by_mean(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.n_components()).collect();
        order.sort_by(|&a, &b| self.means[a].total_cmp(&self.means[b]));
        order
    }
}

impl Params for MixtureParams {
    fn to_flat(&self) -> Array1<f64> {
        let k = self.n_components();
        let mut flat = Array1::zeros(3 * k);
        flat.slice_mut(s![0..k]).assign(&self.log_weights);
        flat.slice_mut(s![k..2 * k]).assign(&self.means);
        flat.slice_mut(s![2 * k..3 * k]).assign(&self.log_scales);
        flat
    }

    fn with_flat(&self, flat: ArrayView1<f64>) -> Self {
        let k = self.n_components();
        debug_assert_eq!(flat.len(), 3 * k);
        Self {
            log_weights: flat.slice(s![0..k]).to_owned(),
            means: flat.slice(s![k..2 * k]).to_owned(),
            log_scales: flat.slice(s![2 * k..3 * k]).to_owned(),
        }
    }

    fn n_flat(&self) -> usize {
        3 * self.n_components()
    }
}
