use crate::algorithms::adam::Driver;
use crate::algorithms::lbfgs;
use crate::algorithms::Objective;
use crate::models::mixture::MixtureObjective;
use crate::routines::logger;
use crate::routines::output::{FitResult, RunResult};
use crate::routines::sampling::{random_params, sample_mixture};
use crate::routines::settings::Settings;
use crate::structs::key::Key;
use crate::structs::observations::Observations;

use eyre::{Result, WrapErr};
use std::time::Instant;

/// Maximum number of L-BFGS iterations when polishing the best run
const POLISH_ITERATIONS: u64 = 100;

/// Primary entrypoint for mixfit
///
/// Fits a Gaussian mixture to the observations configured in `settings`. The
/// seed is split into one key for simulating observations (when no data file
/// is given) and one key per run for drawing the starting parameters. All runs
/// are optimized in parallel with Adam; the run with the lowest finite final
/// loss is selected and, if `config.polish` is set, refined with L-BFGS.
pub fn fit(settings: Settings) -> Result<FitResult> {
    let now = Instant::now();
    logger::setup_log(&settings)?;
    settings.validate()?;
    tracing::info!("Starting mixfit");

    let (data_key, init_key) = Key::new(settings.config.seed).split2();
    let data = load_observations(&settings, data_key)?;
    tracing::info!(
        "Fitting {} components to {} observations with mean {:.3}",
        settings.mixture.components,
        data.len(),
        data.mean()
    );

    // Tell the user where the output files will be written
    match settings.config.output {
        true => tracing::info!("Output files will be written to {}", settings.paths.output),
        false => tracing::info!("Output files will not be written - set `output = true` in the configuration file to enable output files"),
    }

    let n_observations = data.len();
    let objective = MixtureObjective::new(data, settings.prior()?);
    let driver = Driver::new(&objective, settings.optimizer.adam());

    let keys = init_key.split(settings.config.runs);
    let initial = keys
        .iter()
        .map(|&key| random_params(key, objective.n_components()))
        .collect::<Result<Vec<_>>>()?;
    let states = initial.iter().cloned().map(|p| driver.initialize(p)).collect();

    let outcomes = driver.run_many(states, settings.config.iterations)?;

    let mut runs = Vec::with_capacity(outcomes.len());
    for (run, ((last, history), (key, initial))) in outcomes
        .into_iter()
        .zip(keys.into_iter().zip(initial))
        .enumerate()
    {
        let losses = history.losses(driver.objective())?;
        let final_loss = driver.objective().cost(last.params())?;
        if final_loss.is_finite() {
            tracing::info!("Run {} finished with loss {:.4}", run, final_loss);
        } else {
            tracing::warn!("Run {} diverged, final loss is {}", run, final_loss);
        }
        runs.push(RunResult {
            run,
            key,
            initial,
            fitted: last.into_params(),
            losses,
            final_loss,
            history,
        });
    }

    let mut result = FitResult::new(settings.clone(), n_observations, runs);

    let best = result
        .best()
        .map(|run| (run.run, run.fitted.clone(), run.final_loss));
    match best {
        Some((run, start, start_loss)) => {
            tracing::info!("Best run is {} with loss {:.4}", run, start_loss);
            if settings.config.polish {
                match lbfgs::minimize(&objective, &start, POLISH_ITERATIONS) {
                    Ok((params, loss)) if loss < start_loss => {
                        tracing::info!("L-BFGS improved the loss to {:.4}", loss);
                        result = result.with_polished(params, loss);
                    }
                    Ok(_) => tracing::info!("L-BFGS did not improve the best run"),
                    Err(err) => tracing::warn!("L-BFGS polishing failed: {:#}", err),
                }
            }
        }
        None => tracing::warn!("Every run diverged, no best run selected"),
    }

    result.write_outputs()?;
    tracing::info!("Total time: {:.2?}", now.elapsed());
    Ok(result)
}

/// Read observations from the configured data file, or draw them from the
/// configured mixture.
fn load_observations(settings: &Settings, key: Key) -> Result<Observations> {
    match (&settings.paths.data, &settings.mixture.simulate) {
        (Some(path), _) => Observations::from_csv(path)
            .wrap_err_with(|| format!("Failed to read observations from '{}'", path)),
        (None, Some(sim)) => {
            tracing::info!("Simulating {} observations", sim.samples);
            sample_mixture(key, &sim.weights, &sim.means, &sim.scales, sim.samples)
        }
        (None, None) => eyre::bail!("No data file or simulation configured"),
    }
}
