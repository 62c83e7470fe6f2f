//! Fit a two-component mixture to simulated data.
//!
//! Run with `cargo run --release --example mixture [settings.toml]`. Without
//! a settings file, observations are drawn from the mixture
//! `1/6 N(-2, 1.1²) + 5/6 N(5, 2²)`.

use eyre::Result;
use mixfit::prelude::*;
use mixfit::routines::settings::Simulation;

fn main() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::read(&path)?,
        None => {
            let mut settings = Settings::default();
            settings.config.runs = 4;
            settings.mixture.simulate = Some(Simulation {
                weights: vec![1.0, 5.0],
                means: vec![-2.0, 5.0],
                scales: vec![1.1, 2.0],
                samples: 6000,
            });
            settings
        }
    };

    let result = fit(settings)?;
    if let Some(params) = result.params() {
        for k in params.order_by_mean() {
            println!(
                "weight {:.3}  mean {:>7.3}  scale {:.3}",
                params.weights()[k],
                params.means()[k],
                params.scales()[k]
            );
        }
    }
    Ok(())
}
