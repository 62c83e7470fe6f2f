use crate::algorithms::adam::TrainingHistory;
use crate::routines::settings::Settings;
use crate::structs::key::Key;
use crate::structs::params::MixtureParams;
use csv::WriterBuilder;
use eyre::{Result, WrapErr};
use serde_derive::Serialize;
use std::fs::{create_dir_all, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Outcome of a single optimization run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run: usize,
    /// Key the initial parameters were drawn from
    pub key: Key,
    pub initial: MixtureParams,
    pub fitted: MixtureParams,
    /// Loss after every iteration
    pub losses: Vec<f64>,
    pub final_loss: f64,
    pub history: TrainingHistory<MixtureParams>,
}

impl RunResult {
    pub fn diverged(&self) -> bool {
        !self.final_loss.is_finite()
    }
}

/// Defines the result objects from a fit
/// A [FitResult] holds every run, the index of the best one and the optional
/// L-BFGS refinement of it
#[derive(Debug)]
pub struct FitResult {
    settings: Settings,
    n_observations: usize,
    runs: Vec<RunResult>,
    best: Option<usize>,
    polished: Option<(MixtureParams, f64)>,
}

impl FitResult {
    /// Create a new FitResult, selecting the run with the lowest finite final loss
    pub fn new(settings: Settings, n_observations: usize, runs: Vec<RunResult>) -> Self {
        let best = runs
            .iter()
            .enumerate()
            .filter(|(_, run)| !run.diverged())
            .min_by(|(_, a), (_, b)| a.final_loss.total_cmp(&b.final_loss))
            .map(|(i, _)| i);

        Self {
            settings,
            n_observations,
            runs,
            best,
            polished: None,
        }
    }

    pub fn with_polished(mut self, params: MixtureParams, loss: f64) -> Self {
        self.polished = Some((params, loss));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    pub fn runs(&self) -> &[RunResult] {
        &self.runs
    }

    /// The run with the lowest finite final loss, if any run converged to a
    /// finite value
    pub fn best(&self) -> Option<&RunResult> {
        self.best.map(|i| &self.runs[i])
    }

    pub fn polished(&self) -> Option<&(MixtureParams, f64)> {
        self.polished.as_ref()
    }

    /// Best parameters overall: the polished ones when available
    pub fn params(&self) -> Option<&MixtureParams> {
        self.polished
            .as_ref()
            .map(|(params, _)| params)
            .or_else(|| self.best().map(|run| &run.fitted))
    }

    pub fn write_outputs(&self) -> Result<()> {
        if self.settings.config.output {
            tracing::debug!("Writing outputs to {:?}", self.settings.paths.output);
            self.settings.write()?;
            self.write_history().wrap_err("Failed to write history")?;
            self.write_summary().wrap_err("Failed to write summary")?;
        }
        Ok(())
    }

    /// Writes the parameters and loss of every iteration of every run to `history.csv`
    ///
    /// Weights are normalized, scales are standard deviations.
    pub fn write_history(&self) -> Result<()> {
        tracing::debug!("Writing optimization history...");
        let k = self.settings.mixture.components;

        let outputfile = OutputFile::new(&self.settings.paths.output, "history.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(outputfile.file());

        // Create the headers
        let mut header = vec!["run".to_string(), "iteration".to_string(), "loss".to_string()];
        for prefix in ["weight", "mean", "scale"] {
            header.extend((0..k).map(|j| format!("{}{}", prefix, j)));
        }
        writer.write_record(&header)?;

        // Write contents
        for run in &self.runs {
            for (i, (params, loss)) in run.history.params().zip(run.losses.iter()).enumerate() {
                let mut row = vec![run.run.to_string(), (i + 1).to_string(), loss.to_string()];
                row.extend(params.weights().iter().map(|v| v.to_string()));
                row.extend(params.means().iter().map(|v| v.to_string()));
                row.extend(params.scales().iter().map(|v| v.to_string()));
                writer.write_record(&row)?;
            }
        }
        writer.flush()?;
        tracing::debug!("History written to {:?}", outputfile.relative_path());
        Ok(())
    }

    /// Writes the per-run final losses and the selected parameters to `summary.json`
    pub fn write_summary(&self) -> Result<()> {
        #[derive(Debug, Serialize)]
        struct Run {
            run: usize,
            seed: u64,
            final_loss: Option<f64>,
        }

        #[derive(Debug, Serialize)]
        struct Fitted {
            run: usize,
            loss: f64,
            polished_loss: Option<f64>,
            weights: Vec<f64>,
            means: Vec<f64>,
            scales: Vec<f64>,
        }

        #[derive(Debug, Serialize)]
        struct Summary {
            observations: usize,
            components: usize,
            iterations: usize,
            runs: Vec<Run>,
            best: Option<Fitted>,
        }

        // Non-finite losses become `null`, JSON has no representation for them
        let runs = self
            .runs
            .iter()
            .map(|run| Run {
                run: run.run,
                seed: run.key.seed(),
                final_loss: Some(run.final_loss).filter(|l| l.is_finite()),
            })
            .collect();

        let best = match (self.best(), self.params()) {
            (Some(run), Some(params)) => Some(Fitted {
                run: run.run,
                loss: run.final_loss,
                polished_loss: self.polished.as_ref().map(|(_, loss)| *loss),
                weights: params.weights().to_vec(),
                means: params.means().to_vec(),
                scales: params.scales().to_vec(),
            }),
            _ => None,
        };

        let summary = Summary {
            observations: self.n_observations,
            components: self.settings.mixture.components,
            iterations: self.settings.config.iterations,
            runs,
            best,
        };

        let outputfile = OutputFile::new(&self.settings.paths.output, "summary.json")?;
        serde_json::to_writer_pretty(outputfile.file(), &summary)?;
        tracing::debug!("Summary written to {:?}", outputfile.relative_path());
        Ok(())
    }
}

/// Contains all the necessary information of an output file
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    relative_path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let relative_path = Path::new(&folder).join(file_name);

        if let Some(parent) = relative_path.parent() {
            create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directories for {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&relative_path)
            .wrap_err_with(|| format!("Failed to open file: {:?}", relative_path))?;

        Ok(OutputFile {
            file,
            relative_path,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_owned(self) -> File {
        self.file
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}
