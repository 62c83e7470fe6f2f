//! Likelihood of scalar observations under a finite Gaussian mixture
//!
//! A component contributes `ln w_k + ln N(x; μ_k, σ_k²)` to a datum, and the
//! mixture log-likelihood of the datum is the log-sum-exp over components.
//! The total log-likelihood of an i.i.d. sample is the sum over data, which is
//! evaluated in parallel over fixed-size chunks. Partial sums are combined in
//! chunk order, so the result does not depend on the number of threads.

use eyre::{ensure, Result};
use ndarray::{Array1, ArrayView1};
use rayon::prelude::*;

use crate::routines::math::{dirichlet_logpdf, log_softmax, logsumexp, normal_logpdf};
use crate::structs::observations::Observations;
use crate::structs::params::{MixtureParams, Params};

/// Number of observations handled by one parallel task.
pub(crate) const CHUNK_SIZE: usize = 1024;

/// Log-likelihood of a single datum under one weighted component:
/// `ln(weight) + ln N(datum; mean, exp(log_scale)²)`.
///
/// `weight` is a normalized probability in `(0, 1]`.
pub fn component_log_likelihood(weight: f64, mean: f64, log_scale: f64, datum: f64) -> f64 {
    component_log_density(weight.ln(), mean, log_scale, datum)
}

#[inline]
fn component_log_density(log_weight: f64, mean: f64, log_scale: f64, datum: f64) -> f64 {
    log_weight + normal_logpdf(datum, mean, log_scale.exp())
}

/// Log-likelihood of a single datum under the full mixture,
/// `ln Σ_k w_k N(datum; μ_k, σ_k²)`.
///
/// The log weights are normalized in log space before use.
///
/// # Errors
///
/// Returns an error if the three parameter vectors differ in length or are empty.
pub fn mixture_component_log_likelihood(
    log_weights: ArrayView1<f64>,
    means: ArrayView1<f64>,
    log_scales: ArrayView1<f64>,
    datum: f64,
) -> Result<f64> {
    check_components(log_weights, means, log_scales)?;
    let log_w = log_softmax(log_weights);
    let mut scratch = vec![0.0; log_w.len()];
    Ok(mixture_log_density(
        log_w.view(),
        means,
        log_scales,
        datum,
        &mut scratch,
    ))
}

/// Mixture log density for already normalized log weights.
///
/// `scratch` holds the per-component terms and must have one slot per component.
#[inline]
fn mixture_log_density(
    log_w: ArrayView1<f64>,
    means: ArrayView1<f64>,
    log_scales: ArrayView1<f64>,
    datum: f64,
    scratch: &mut [f64],
) -> f64 {
    for (k, slot) in scratch.iter_mut().enumerate() {
        *slot = component_log_density(log_w[k], means[k], log_scales[k], datum);
    }
    logsumexp(ArrayView1::from(&*scratch))
}

/// Total log-likelihood of an i.i.d. sample under the mixture.
///
/// # Errors
///
/// Returns an error if the three parameter vectors differ in length or are empty.
pub fn total_log_likelihood(
    log_weights: ArrayView1<f64>,
    means: ArrayView1<f64>,
    log_scales: ArrayView1<f64>,
    data: &[f64],
) -> Result<f64> {
    check_components(log_weights, means, log_scales)?;
    let log_w = log_softmax(log_weights);
    let k = log_w.len();

    let partial: Vec<f64> = data
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            let mut scratch = vec![0.0; k];
            chunk
                .iter()
                .map(|&x| mixture_log_density(log_w.view(), means, log_scales, x, &mut scratch))
                .sum::<f64>()
        })
        .collect();

    Ok(partial.into_iter().sum())
}

/// Log density of the normalized mixture weights under `Dirichlet(alpha_prior)`.
///
/// Concentrations are not validated here: non-positive entries yield NaN or
/// infinite values which propagate into the loss. Use
/// [crate::models::mixture::DirichletPrior] for a checked prior.
///
/// # Errors
///
/// Returns an error if `alpha_prior` and `log_weights` differ in length.
pub fn weights_log_prior(log_weights: ArrayView1<f64>, alpha_prior: ArrayView1<f64>) -> Result<f64> {
    ensure!(
        log_weights.len() == alpha_prior.len(),
        "The Dirichlet prior has {} concentrations but the mixture has {} components",
        alpha_prior.len(),
        log_weights.len()
    );
    let log_w = log_softmax(log_weights);
    Ok(dirichlet_logpdf(log_w.view(), alpha_prior))
}

/// Negative log posterior of the mixture parameters (up to a constant):
/// `-(total_log_likelihood + weights_log_prior)`.
pub fn negative_log_posterior(
    params: &MixtureParams,
    data: &Observations,
    alpha_prior: ArrayView1<f64>,
) -> Result<f64> {
    let log_likelihood = total_log_likelihood(
        params.log_weights(),
        params.means(),
        params.log_scales(),
        data.as_slice(),
    )?;
    let log_prior = weights_log_prior(params.log_weights(), alpha_prior)?;
    Ok(-(log_likelihood + log_prior))
}

/// Analytic gradient of [negative_log_posterior] with respect to every
/// entry of the parameters.
///
/// With `l_k = ln w_k + ln N(x; μ_k, σ_k²)`, `L = logsumexp(l)` and the
/// responsibilities `r_k = exp(l_k - L)`, one datum contributes
///
/// - `∂L/∂μ_k = r_k (x - μ_k) / σ_k²`
/// - `∂L/∂ln σ_k = r_k ((x - μ_k)² / σ_k² - 1)`
/// - `∂L/∂a_k = r_k - w_k`
///
/// and the Dirichlet prior adds `(α_k - 1) - w_k Σ_j (α_j - 1)` to `∂/∂a_k`.
/// The returned value uses the same layout as the parameters.
pub fn negative_log_posterior_gradient(
    params: &MixtureParams,
    data: &Observations,
    alpha_prior: ArrayView1<f64>,
) -> Result<MixtureParams> {
    let k = params.n_components();
    ensure!(
        alpha_prior.len() == k,
        "The Dirichlet prior has {} concentrations but the mixture has {} components",
        alpha_prior.len(),
        k
    );

    let log_w = params.normalized_log_weights();
    let means = params.means();
    let log_scales = params.log_scales();
    let scales = params.scales();

    // Per-chunk accumulators in flat layout: [Σr | ∂μ | ∂lnσ]
    let partial: Vec<Array1<f64>> = data
        .as_slice()
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            let mut acc = Array1::<f64>::zeros(3 * k);
            let mut terms = vec![0.0; k];
            for &x in chunk {
                for (j, term) in terms.iter_mut().enumerate() {
                    *term = component_log_density(log_w[j], means[j], log_scales[j], x);
                }
                let total = logsumexp(ArrayView1::from(&terms[..]));
                for j in 0..k {
                    let r = (terms[j] - total).exp();
                    let z = (x - means[j]) / scales[j];
                    acc[j] += r;
                    acc[k + j] += r * z / scales[j];
                    acc[2 * k + j] += r * (z * z - 1.0);
                }
            }
            acc
        })
        .collect();

    let mut grad = partial
        .into_iter()
        .fold(Array1::<f64>::zeros(3 * k), |sum, part| sum + part);

    let n = data.len() as f64;
    let alpha_excess: f64 = alpha_prior.iter().map(|a| a - 1.0).sum();
    for j in 0..k {
        let w = log_w[j].exp();
        grad[j] += -n * w + (alpha_prior[j] - 1.0) - w * alpha_excess;
    }

    // Gradient of the log posterior, negated for the loss
    grad.mapv_inplace(|g| -g);
    Ok(params.with_flat(grad.view()))
}

fn check_components(
    log_weights: ArrayView1<f64>,
    means: ArrayView1<f64>,
    log_scales: ArrayView1<f64>,
) -> Result<()> {
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
    Ok(())
}
