use eyre::Result;
use mixfit::prelude::*;
use ndarray::{array, Array1};

fn observations() -> Result<Observations> {
    sample_mixture(Key::new(3), &[1.0, 5.0], &[-2.0, 5.0], &[1.1, 2.0], 2500)
}

#[test]
fn standard_normal_at_zero() {
    let ll = mixture_component_log_likelihood(
        array![0.0].view(),
        array![0.0].view(),
        array![0.0].view(),
        0.0,
    )
    .unwrap();
    assert!((ll + 0.918_938_533).abs() < 1e-8);
}

#[test]
fn single_component_matches_component_likelihood() {
    for &(mean, log_scale, x) in &[(0.0, 0.0, 0.0), (1.5, -0.3, 2.2), (-4.0, 1.2, 10.0)] {
        let mixture = mixture_component_log_likelihood(
            array![0.7].view(),
            array![mean].view(),
            array![log_scale].view(),
            x,
        )
        .unwrap();
        assert_eq!(mixture, component_log_likelihood(1.0, mean, log_scale, x));
    }
}

#[test]
fn total_likelihood_is_permutation_invariant() -> Result<()> {
    let data = observations()?;
    let lw = array![0.2, -0.4];
    let means = array![-1.0, 4.0];
    let ls = array![0.1, 0.5];

    let forward = total_log_likelihood(lw.view(), means.view(), ls.view(), data.as_slice())?;
    let mut reversed = data.as_slice().to_vec();
    reversed.reverse();
    let backward = total_log_likelihood(lw.view(), means.view(), ls.view(), &reversed)?;

    assert!((forward - backward).abs() <= 1e-9 * forward.abs());
    Ok(())
}

#[test]
fn weights_prior_ignores_shift() -> Result<()> {
    let lw = array![0.3, -1.2, 0.8];
    let alpha = array![2.0, 0.5, 3.0];
    let base = weights_log_prior(lw.view(), alpha.view())?;
    for shift in [-10.0, -0.5, 3.0, 25.0] {
        let shifted: Array1<f64> = &lw + shift;
        let value = weights_log_prior(shifted.view(), alpha.view())?;
        assert!((value - base).abs() < 1e-10, "shift {}: {} vs {}", shift, value, base);
    }
    Ok(())
}

#[test]
fn posterior_combines_likelihood_and_prior() -> Result<()> {
    let data = observations()?;
    let params = MixtureParams::from_natural(&[0.3, 0.7], &[-1.5, 4.5], &[1.0, 2.5])?;
    let alpha = array![2.0, 3.0];

    let nlp = negative_log_posterior(&params, &data, alpha.view())?;
    let ll = total_log_likelihood(
        params.log_weights(),
        params.means(),
        params.log_scales(),
        data.as_slice(),
    )?;
    let prior = weights_log_prior(params.log_weights(), alpha.view())?;
    assert!((nlp + ll + prior).abs() < 1e-9 * nlp.abs());
    Ok(())
}

#[test]
fn objective_cost_is_repeatable() -> Result<()> {
    let objective = MixtureObjective::new(observations()?, DirichletPrior::symmetric(2, 1.0)?);
    let params = random_params(Key::new(10), 2)?;
    assert_eq!(objective.cost(&params)?, objective.cost(&params)?);
    assert_eq!(objective.gradient(&params)?, objective.gradient(&params)?);
    Ok(())
}

#[test]
fn mismatched_prior_is_rejected() -> Result<()> {
    let objective = MixtureObjective::new(observations()?, DirichletPrior::symmetric(3, 1.0)?);
    let params = random_params(Key::new(10), 2)?;
    assert!(objective.cost(&params).is_err());
    assert!(objective.gradient(&params).is_err());
    Ok(())
}
