use eyre::Result;

use crate::structs::params::Params;

pub mod adam;
pub mod lbfgs;

/// A scalar loss over a parameter set, together with its gradient.
///
/// Everything the loss depends on besides the parameters (observations,
/// priors, ...) is fixed when the implementor is built, so evaluating the
/// same parameters twice always gives the same result. The gradient has the
/// same layout as the parameters.
///
/// Implementors must be [Sync]: independent runs evaluate the same objective
/// from several threads.
pub trait Objective: Sync {
    type Params: Params;

    /// Evaluate the loss. Non-finite values are returned as is.
    fn cost(&self, params: &Self::Params) -> Result<f64>;

    /// Evaluate the gradient of [Objective::cost].
    fn gradient(&self, params: &Self::Params) -> Result<Self::Params>;
}
