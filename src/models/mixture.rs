use eyre::{ensure, Result};
use ndarray::{Array1, ArrayView1};

use crate::algorithms::Objective;
use crate::routines::likelihood::{negative_log_posterior, negative_log_posterior_gradient};
use crate::structs::observations::Observations;
use crate::structs::params::MixtureParams;

/// Dirichlet prior over the mixture weights.
///
/// Unlike the raw [crate::routines::likelihood::weights_log_prior], a
/// [DirichletPrior] can only be built from strictly positive, finite
/// concentrations.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletPrior {
    alpha: Array1<f64>,
}

impl DirichletPrior {
    pub fn new(alpha: Vec<f64>) -> Result<Self> {
        ensure!(!alpha.is_empty(), "The Dirichlet prior needs at least one concentration");
        ensure!(
            alpha.iter().all(|&a| a > 0.0 && a.is_finite()),
            "Dirichlet concentrations must be positive and finite, got {:?}",
            alpha
        );
        Ok(Self {
            alpha: Array1::from_vec(alpha),
        })
    }

    /// A symmetric prior with the same concentration for every component.
    pub fn symmetric(components: usize, concentration: f64) -> Result<Self> {
        Self::new(vec![concentration; components])
    }

    pub fn alpha(&self) -> ArrayView1<f64> {
        self.alpha.view()
    }

    pub fn len(&self) -> usize {
        self.alpha.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alpha.is_empty()
    }
}

/// The loss minimized when fitting a mixture: the negative log posterior of
/// the parameters given the observations and the Dirichlet weight prior.
///
/// Data and prior are fixed when the objective is built; the optimizer only
/// passes parameters.
#[derive(Debug, Clone)]
pub struct MixtureObjective {
    data: Observations,
    prior: DirichletPrior,
}

impl MixtureObjective {
    pub fn new(data: Observations, prior: DirichletPrior) -> Self {
        Self { data, prior }
    }

    pub fn data(&self) -> &Observations {
        &self.data
    }

    pub fn prior(&self) -> &DirichletPrior {
        &self.prior
    }

    /// Number of components the prior is defined for.
    pub fn n_components(&self) -> usize {
        self.prior.len()
    }
}

impl Objective for MixtureObjective {
    type Params = MixtureParams;

    fn cost(&self, params: &MixtureParams) -> Result<f64> {
        negative_log_posterior(params, &self.data, self.prior.alpha())
    }

    fn gradient(&self, params: &MixtureParams) -> Result<MixtureParams> {
        negative_log_posterior_gradient(params, &self.data, self.prior.alpha())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_prior_rejects_invalid_concentrations() {
        assert!(DirichletPrior::new(vec![]).is_err());
        assert!(DirichletPrior::new(vec![1.0, 0.0]).is_err());
        assert!(DirichletPrior::new(vec![1.0, -2.0]).is_err());
        assert!(DirichletPrior::new(vec![1.0, f64::NAN]).is_err());
        assert!(DirichletPrior::symmetric(3, 2.0).is_ok());
    }

    #[test]
    fn test_cost_is_repeatable() {
        let objective = MixtureObjective::new(
            Observations::new(vec![-1.0, 0.5, 2.0, 4.5]),
            DirichletPrior::symmetric(2, 1.5).unwrap(),
        );
        let params = MixtureParams::new(array![0.0, 0.4], array![-1.0, 3.0], array![0.0, 0.2]).unwrap();
        let first = objective.cost(&params).unwrap();
        let second = objective.cost(&params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_component_count_mismatch_fails() {
        let objective = MixtureObjective::new(
            Observations::new(vec![0.0]),
            DirichletPrior::symmetric(3, 1.0).unwrap(),
        );
        let params = MixtureParams::new(array![0.0, 0.0], array![0.0, 1.0], array![0.0, 0.0]).unwrap();
        assert!(objective.cost(&params).is_err());
        assert!(objective.gradient(&params).is_err());
    }
}
