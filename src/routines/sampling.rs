//! Random draws driven by explicit [Key]s
//!
//! Every function takes the key it draws from; calling it again with the same
//! key reproduces the same values.

use eyre::{ensure, Result, WrapErr};
use ndarray::{Array1, Array2, Axis};
use rand::distr::weighted::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use rayon::prelude::*;

use crate::models::regression::LinearRegression;
use crate::structs::key::Key;
use crate::structs::observations::Observations;
use crate::structs::params::MixtureParams;

/// Draw `n` observations from a Gaussian mixture.
///
/// `weights` need not be normalized, but must be positive. `scales` are
/// standard deviations.
pub fn sample_mixture(
    key: Key,
    weights: &[f64],
    means: &[f64],
    scales: &[f64],
    n: usize,
) -> Result<Observations> {
    // Validates lengths and positivity
    MixtureParams::from_natural(weights, means, scales)?;

    let chooser = WeightedIndex::new(weights).wrap_err("Invalid mixture weights")?;
    let components: Vec<Normal<f64>> = means
        .iter()
        .zip(scales.iter())
        .map(|(&mean, &scale)| Normal::new(mean, scale))
        .collect::<Result<_, _>>()
        .wrap_err("Invalid mixture component")?;

    let mut rng = key.rng();
    let values = (0..n)
        .map(|_| {
            let k = chooser.sample(&mut rng);
            components[k].sample(&mut rng)
        })
        .collect();

    tracing::debug!(
        "Sampled {} observations from a {}-component mixture (seed {})",
        n,
        weights.len(),
        key.seed()
    );
    Ok(Observations::new(values))
}

/// Draw mixture parameters with every entry from a standard normal.
pub fn random_params(key: Key, components: usize) -> Result<MixtureParams> {
    ensure!(components > 0, "A mixture needs at least one component");
    let mut rng = key.rng();
    let mut draw = || -> Array1<f64> {
        (0..components)
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect()
    };
    let log_weights = draw();
    let means = draw();
    let log_scales = draw();
    MixtureParams::new(log_weights, means, log_scales)
}

/// A Gaussian random walk of `steps` standard normal increments.
///
/// The walk starts at zero, so the result has `steps + 1` entries.
pub fn random_walk(key: Key, steps: usize) -> Array1<f64> {
    let mut rng = key.rng();
    std::iter::once(0.0)
        .chain((0..steps).scan(0.0, |position, _| {
            *position += rng.sample::<f64, _>(StandardNormal);
            Some(*position)
        }))
        .collect()
}

/// One random walk per key, generated in parallel.
///
/// Row `i` is identical to `random_walk(keys[i], steps)`.
pub fn random_walks(keys: &[Key], steps: usize) -> Array2<f64> {
    let mut walks = Array2::zeros((keys.len(), steps + 1));
    walks
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(keys.par_iter())
        .for_each(|(mut row, &key)| row.assign(&random_walk(key, steps)));
    walks
}

/// Noisy points around the line `slope * x + intercept`.
///
/// Inputs are standard normal; the targets get additive Gaussian noise with
/// standard deviation `noise`.
pub fn sample_linear(
    key: Key,
    slope: f64,
    intercept: f64,
    noise: f64,
    n: usize,
) -> Result<LinearRegression> {
    ensure!(
        noise >= 0.0 && noise.is_finite(),
        "The noise level must be non-negative and finite, got {}",
        noise
    );
    let noise_dist = Normal::new(0.0, noise).wrap_err("Invalid noise level")?;
    let (x_key, noise_key) = key.split2();

    let mut x_rng = x_key.rng();
    let x: Array1<f64> = (0..n)
        .map(|_| x_rng.sample::<f64, _>(StandardNormal))
        .collect();

    let mut noise_rng = noise_key.rng();
    let y = x.mapv(|xi| slope * xi + intercept + noise_dist.sample(&mut noise_rng));

    LinearRegression::new(x, y)
}
