//! Numerically stable building blocks for the likelihood engine
//!
//! Everything here works in log space. Non-finite inputs are not rejected,
//! they propagate through the arithmetic so that divergence shows up in the
//! loss curve instead of being hidden.

use ndarray::{Array1, ArrayView1, Zip};
use statrs::function::gamma::ln_gamma;

/// `ln(sqrt(2π))`, the constant term of the Gaussian log density.
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Compute `ln(Σ exp(x_i))` without overflow.
///
/// The values are shifted by their maximum before exponentiating:
/// `logsumexp(x) = max(x) + ln(Σ exp(x_i - max(x)))`.
///
/// Returns `-inf` for an empty view or when every value is `-inf`, and `+inf`
/// when any value is `+inf`. A NaN anywhere in the input yields NaN.
///
/// # Example
/// ```
/// use mixfit::routines::math::logsumexp;
/// use ndarray::array;
///
/// let x = array![-1.0, -2.0, -3.0];
/// let expected = ((-1.0f64).exp() + (-2.0f64).exp() + (-3.0f64).exp()).ln();
/// assert!((logsumexp(x.view()) - expected).abs() < 1e-12);
/// ```
#[inline]
pub fn logsumexp(values: ArrayView1<f64>) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|x| x.is_nan()) {
        return f64::NAN;
    }

    let max_val = values.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));

    if max_val.is_infinite() {
        // Either every term is -inf, or one of them dominates at +inf
        return max_val;
    }

    max_val + values.iter().map(|&x| (x - max_val).exp()).sum::<f64>().ln()
}

/// Normalize unnormalized log weights into log probabilities.
///
/// This is a softmax carried out in log space: `a_j - logsumexp(a)`.
pub fn log_softmax(log_weights: ArrayView1<f64>) -> Array1<f64> {
    let lse = logsumexp(log_weights);
    log_weights.mapv(|a| a - lse)
}

/// Normalize unnormalized log weights into probabilities on the simplex.
pub fn softmax(log_weights: ArrayView1<f64>) -> Array1<f64> {
    log_softmax(log_weights).mapv(f64::exp)
}

/// Log density of `N(mean, scale²)` at `x`.
#[inline]
pub fn normal_logpdf(x: f64, mean: f64, scale: f64) -> f64 {
    let z = (x - mean) / scale;
    -0.5 * z * z - scale.ln() - LN_SQRT_2PI
}

/// Log density of a Dirichlet distribution with concentration `alpha`,
/// evaluated at the point whose component-wise logarithm is `log_x`.
///
/// Taking the point in log space avoids an `exp`/`ln` round trip when the
/// caller already has log probabilities.
///
/// `lnΓ(Σα) - Σ lnΓ(α_k) + Σ (α_k - 1) ln x_k`
///
/// Both views must have the same length; this is checked by the callers.
pub fn dirichlet_logpdf(log_x: ArrayView1<f64>, alpha: ArrayView1<f64>) -> f64 {
    let normalizer = ln_gamma(alpha.sum()) - alpha.iter().map(|&a| ln_gamma(a)).sum::<f64>();
    let kernel = Zip::from(&log_x)
        .and(&alpha)
        .fold(0.0, |acc, &lx, &a| {
            // α = 1 contributes nothing, even where x = 0
            if a == 1.0 {
                acc
            } else {
                acc + (a - 1.0) * lx
            }
        });
    normalizer + kernel
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_logsumexp_basic() {
        let values = array![-1.0, -2.0, -3.0];
        let expected = ((-1.0_f64).exp() + (-2.0_f64).exp() + (-3.0_f64).exp()).ln();
        assert!((logsumexp(values.view()) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_logsumexp_single_value_is_identity() {
        let values = array![-5.25];
        assert_eq!(logsumexp(values.view()), -5.25);
    }

    #[test]
    fn test_logsumexp_empty() {
        let values: Array1<f64> = Array1::zeros(0);
        let result = logsumexp(values.view());
        assert!(result.is_infinite() && result.is_sign_negative());
    }

    #[test]
    fn test_logsumexp_infinities() {
        let all_neg = array![f64::NEG_INFINITY, f64::NEG_INFINITY];
        assert_eq!(logsumexp(all_neg.view()), f64::NEG_INFINITY);

        let one_pos = array![0.0, f64::INFINITY];
        assert_eq!(logsumexp(one_pos.view()), f64::INFINITY);

        let mixed = array![f64::NEG_INFINITY, 0.0];
        assert!(logsumexp(mixed.view()).abs() < 1e-15);
    }

    #[test]
    fn test_logsumexp_nan_propagates() {
        let values = array![0.0, f64::NAN];
        assert!(logsumexp(values.view()).is_nan());
    }

    #[test]
    fn test_logsumexp_large_magnitudes() {
        let large = array![1000.0, 1001.0, 1002.0];
        let expected = 1002.0 + ((-2.0_f64).exp() + (-1.0_f64).exp() + 1.0).ln();
        assert!((logsumexp(large.view()) - expected).abs() < 1e-10);

        let small = array![-1000.0, -1001.0, -1002.0];
        let expected = -1000.0 + (1.0 + (-1.0_f64).exp() + (-2.0_f64).exp()).ln();
        assert!((logsumexp(small.view()) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let a = array![1.0, 5.0_f64.ln(), -3.0];
        let w = softmax(a.view());
        assert!((w.sum() - 1.0).abs() < 1e-12);
        assert!(w.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_normal_logpdf_standard() {
        assert!((normal_logpdf(0.0, 0.0, 1.0) - (-0.918_938_533_204_672_8)).abs() < 1e-12);
        assert!((LN_SQRT_2PI - 0.5 * (2.0 * std::f64::consts::PI).ln()).abs() < 1e-15);
        // One standard deviation away
        assert!((normal_logpdf(3.0, 1.0, 2.0) - (-0.5 - 2.0_f64.ln() - LN_SQRT_2PI)).abs() < 1e-12);
    }

    #[test]
    fn test_dirichlet_uniform_density() {
        // Dirichlet(1, 1, 1) is uniform on the 2-simplex with density Γ(3) = 2
        let log_x = array![0.2_f64.ln(), 0.3_f64.ln(), 0.5_f64.ln()];
        let alpha = array![1.0, 1.0, 1.0];
        assert!((dirichlet_logpdf(log_x.view(), alpha.view()) - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_dirichlet_unit_concentration_at_boundary() {
        // Dirichlet(1, 2) at (0, 1) is Beta(1, 2) at 0: density 2
        let log_x = array![f64::NEG_INFINITY, 0.0];
        let alpha = array![1.0, 2.0];
        let value = dirichlet_logpdf(log_x.view(), alpha.view());
        assert!((value - 2.0_f64.ln()).abs() < 1e-12, "{}", value);
    }

    #[test]
    fn test_dirichlet_beta_case() {
        // Dirichlet(2, 3) at (x, 1 - x) is Beta(2, 3): 12 x (1 - x)^2
        let x: f64 = 0.4;
        let log_x = array![x.ln(), (1.0 - x).ln()];
        let alpha = array![2.0, 3.0];
        let expected = (12.0 * x * (1.0 - x).powi(2)).ln();
        assert!((dirichlet_logpdf(log_x.view(), alpha.view()) - expected).abs() < 1e-10);
    }
}
