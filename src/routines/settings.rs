use config::Config as eConfig;
use eyre::{ensure, Result, WrapErr};
use serde_derive::{Deserialize, Serialize};

use crate::algorithms::adam::Adam;
use crate::models::mixture::DirichletPrior;
use crate::routines::output::OutputFile;

/// Symmetric Dirichlet concentration used when `mixture.alpha` is not set.
/// Above one, it keeps every weight away from zero.
pub const DEFAULT_CONCENTRATION: f64 = 2.0;

/// Settings for fitting a mixture
///
/// Read from a TOML file with [Settings::read]. Every value can be overridden
/// from the environment with the `MIXFIT` prefix and `__` as separator, e.g.
/// `MIXFIT__CONFIG__SEED=22`.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub mixture: Mixture,
    #[serde(default)]
    pub optimizer: Optimizer,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Paths {
    /// CSV file with one column of observations
    pub data: Option<String>,
    /// Folder receiving the output files
    #[serde(default = "default_output")]
    pub output: String,
    /// Optional log file
    pub log: Option<String>,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            data: None,
            output: default_output(),
            log: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of independent runs, each from its own random start
    #[serde(default = "default_runs")]
    pub runs: usize,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write output files
    #[serde(default = "default_true")]
    pub output: bool,
    /// Refine the best run with L-BFGS
    #[serde(default)]
    pub polish: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            runs: default_runs(),
            iterations: default_iterations(),
            log_level: default_log_level(),
            output: true,
            polish: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Mixture {
    #[serde(default = "default_components")]
    pub components: usize,
    /// Dirichlet concentrations for the weights, one per component.
    /// Defaults to [DEFAULT_CONCENTRATION] for every component.
    pub alpha: Option<Vec<f64>>,
    /// Draw observations from this mixture when no data file is given
    pub simulate: Option<Simulation>,
}

impl Default for Mixture {
    fn default() -> Self {
        Self {
            components: default_components(),
            alpha: None,
            simulate: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    pub weights: Vec<f64>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub samples: usize,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Optimizer {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_beta1")]
    pub beta1: f64,
    #[serde(default = "default_beta2")]
    pub beta2: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }
}

impl Optimizer {
    pub fn adam(&self) -> Adam {
        Adam::new(self.learning_rate)
            .with_betas(self.beta1, self.beta2)
            .with_epsilon(self.epsilon)
    }
}

impl Settings {
    /// Read settings from a TOML file, applying environment overrides.
    pub fn read(path: &str) -> Result<Settings> {
        let parsed = eConfig::builder()
            .add_source(config::File::with_name(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix("MIXFIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .wrap_err_with(|| format!("Unable to read settings from '{}'", path))?;

        let settings: Settings = parsed
            .try_deserialize()
            .wrap_err_with(|| format!("Invalid settings in '{}'", path))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for consistency.
    pub fn validate(&self) -> Result<()> {
        let k = self.mixture.components;
        ensure!(k > 0, "The mixture needs at least one component");
        ensure!(self.config.runs > 0, "At least one run is required");
        self.prior()?;
        self.optimizer.adam().validate()?;

        match (&self.paths.data, &self.mixture.simulate) {
            (None, None) => eyre::bail!(
                "No observations: set `paths.data` or provide a `[mixture.simulate]` section"
            ),
            (Some(_), Some(_)) => {
                tracing::warn!("Both a data file and a simulation are configured, the data file is used")
            }
            _ => {}
        }

        if let Some(sim) = &self.mixture.simulate {
            ensure!(
                sim.weights.len() == sim.means.len() && sim.means.len() == sim.scales.len(),
                "Simulation weights, means and scales must have equal length"
            );
            ensure!(sim.samples > 0, "The simulation must draw at least one sample");
        }
        Ok(())
    }

    /// The Dirichlet prior on the weights.
    pub fn prior(&self) -> Result<DirichletPrior> {
        let k = self.mixture.components;
        match &self.mixture.alpha {
            Some(alpha) => {
                ensure!(
                    alpha.len() == k,
                    "Got {} prior concentrations for {} components",
                    alpha.len(),
                    k
                );
                DirichletPrior::new(alpha.clone())
            }
            None => DirichletPrior::symmetric(k, DEFAULT_CONCENTRATION),
        }
    }

    /// Write the settings as JSON to the output folder.
    pub fn write(&self) -> Result<()> {
        let outputfile = OutputFile::new(&self.paths.output, "settings.json")?;
        serde_json::to_writer_pretty(outputfile.file(), self)
            .wrap_err("Failed to write settings")?;
        tracing::debug!("Settings written to {:?}", outputfile.relative_path());
        Ok(())
    }
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_output() -> String {
    "outputs/".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_seed() -> u64 {
    347
}

fn default_runs() -> usize {
    1
}

fn default_iterations() -> usize {
    1000
}

fn default_components() -> usize {
    2
}

fn default_learning_rate() -> f64 {
    0.5
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_epsilon() -> f64 {
    1e-8
}
