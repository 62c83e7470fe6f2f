use argmin::core::{CostFunction, Error, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use eyre::{eyre, Result};
use ndarray::Array1;

use crate::algorithms::Objective;
use crate::structs::params::Params;

/// Exposes an [Objective] to `argmin` on flat parameter vectors.
///
/// `template` fixes the layout used to rebuild structured parameters from the
/// flat vectors `argmin` works with.
struct ArgminAdapter<'a, O: Objective> {
    objective: &'a O,
    template: O::Params,
}

impl<'a, O: Objective> CostFunction for ArgminAdapter<'a, O> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
        self.objective
            .cost(&self.template.with_flat(p.view()))
            .map_err(|e| Error::msg(format!("{:#}", e)))
    }
}

impl<'a, O: Objective> Gradient for ArgminAdapter<'a, O> {
    type Param = Array1<f64>;
    type Gradient = Array1<f64>;

    fn gradient(&self, p: &Self::Param) -> Result<Self::Gradient, Error> {
        self.objective
            .gradient(&self.template.with_flat(p.view()))
            .map(|g| g.to_flat())
            .map_err(|e| Error::msg(format!("{:#}", e)))
    }
}

/// Minimize an [Objective] with L-BFGS and a More-Thuente line search,
/// starting from `init`.
///
/// Returns the best parameters found and their cost. Used to polish the
/// result of a gradient-descent run, where a quasi-Newton method closes the
/// last bit of the gap much faster than a first-order one.
pub fn minimize<O: Objective>(objective: &O, init: &O::Params, max_iters: u64) -> Result<(O::Params, f64)> {
    let adapter = ArgminAdapter {
        objective,
        template: init.clone(),
    };
    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, 10)
        .with_tolerance_grad(1e-10)
        .map_err(|e| eyre!("Invalid L-BFGS configuration: {}", e))?;

    let result = Executor::new(adapter, solver)
        .configure(|state| state.param(init.to_flat()).max_iters(max_iters))
        .run()
        .map_err(|e| eyre!("L-BFGS failed: {}", e))?;

    tracing::debug!("L-BFGS stopped after {} iterations", result.state().get_iter());

    let best = result
        .state()
        .get_best_param()
        .ok_or_else(|| eyre!("L-BFGS finished without a best parameter"))?;
    let params = init.with_flat(best.view());
    let cost = objective.cost(&params)?;
    Ok((params, cost))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::regression::{LineParams, LinearRegression};
    use ndarray::array;

    #[test]
    fn test_lbfgs_solves_least_squares() {
        let x = array![0.0, 1.0, 2.0, 3.0, 4.0];
        let y = array![1.1, 2.9, 5.2, 6.8, 9.1];
        let model = LinearRegression::new(x.clone(), y.clone()).unwrap();

        let (fit, cost) = minimize(&model, &LineParams::new(0.0, 0.0), 200).unwrap();

        // Closed-form least squares
        let n = x.len() as f64;
        let (mx, my) = (x.sum() / n, y.sum() / n);
        let slope = (&x - mx).dot(&(&y - my)) / (&x - mx).mapv(|v| v * v).sum();
        let intercept = my - slope * mx;

        assert!((fit.slope - slope).abs() < 1e-6);
        assert!((fit.intercept - intercept).abs() < 1e-6);
        assert!((cost - model.cost(&LineParams::new(slope, intercept)).unwrap()).abs() < 1e-9);
    }
}
