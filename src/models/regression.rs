use eyre::{ensure, Result};
use ndarray::{array, Array1, ArrayView1, Zip};

use crate::algorithms::Objective;
use crate::structs::params::Params;

/// Slope and intercept of a straight line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineParams {
    pub slope: f64,
    pub intercept: f64,
}

impl LineParams {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

impl Params for LineParams {
    fn to_flat(&self) -> Array1<f64> {
        array![self.slope, self.intercept]
    }

    fn with_flat(&self, flat: ArrayView1<f64>) -> Self {
        Self {
            slope: flat[0],
            intercept: flat[1],
        }
    }

    fn n_flat(&self) -> usize {
        2
    }
}

/// Least-squares fit of `y ≈ slope * x + intercept`.
///
/// The cost is the mean squared residual.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    x: Array1<f64>,
    y: Array1<f64>,
}

impl LinearRegression {
    pub fn new(x: Array1<f64>, y: Array1<f64>) -> Result<Self> {
        ensure!(!x.is_empty(), "Linear regression needs at least one point");
        ensure!(
            x.len() == y.len(),
            "Got {} inputs but {} targets",
            x.len(),
            y.len()
        );
        Ok(Self { x, y })
    }

    pub fn x(&self) -> ArrayView1<f64> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView1<f64> {
        self.y.view()
    }

    fn residuals(&self, params: &LineParams) -> Array1<f64> {
        Zip::from(&self.x)
            .and(&self.y)
            .map_collect(|&x, &y| params.predict(x) - y)
    }
}

impl Objective for LinearRegression {
    type Params = LineParams;

    fn cost(&self, params: &LineParams) -> Result<f64> {
        let residuals = self.residuals(params);
        Ok(residuals.mapv(|r| r * r).sum() / residuals.len() as f64)
    }

    fn gradient(&self, params: &LineParams) -> Result<LineParams> {
        let residuals = self.residuals(params);
        let n = residuals.len() as f64;
        Ok(LineParams {
            slope: 2.0 * residuals.dot(&self.x) / n,
            intercept: 2.0 * residuals.sum() / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_fit_has_zero_cost_and_gradient() {
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = x.mapv(|v| 2.0 * v - 1.0);
        let model = LinearRegression::new(x, y).unwrap();
        let truth = LineParams::new(2.0, -1.0);
        assert_eq!(model.cost(&truth).unwrap(), 0.0);
        let grad = model.gradient(&truth).unwrap();
        assert_eq!(grad, LineParams::new(0.0, 0.0));
    }

    #[test]
    fn test_gradient_by_hand() {
        let model = LinearRegression::new(array![1.0, 2.0], array![0.0, 0.0]).unwrap();
        // residuals = [1, 2] for slope 1, intercept 0
        let grad = model.gradient(&LineParams::new(1.0, 0.0)).unwrap();
        assert!((grad.slope - 5.0).abs() < 1e-12);
        assert!((grad.intercept - 3.0).abs() < 1e-12);
        assert!((model.cost(&LineParams::new(1.0, 0.0)).unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        assert!(LinearRegression::new(array![1.0, 2.0], array![1.0]).is_err());
        assert!(LinearRegression::new(Array1::zeros(0), Array1::zeros(0)).is_err());
    }
}
