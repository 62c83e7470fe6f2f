//! mixfit fits one-dimensional Gaussian mixtures by maximum a posteriori
//! estimation, optimizing the negative log posterior with Adam.
//!
//! The likelihood lives in [routines::likelihood], the optimizer in
//! [algorithms::adam] and the complete pipeline, configured through
//! [routines::settings::Settings], in [entrypoints::fit].

/// Provides the optimizers and the [algorithms::Objective] trait they work on
pub mod algorithms;

/// Entry points for fitting a mixture from a settings file
pub mod entrypoints;

/// Objectives: the mixture posterior and a linear regression
pub mod models;

/// Routines: likelihood, sampling, settings, logging and output
pub mod routines;

/// Parameters, observations and random keys
pub mod structs;

pub mod prelude {
    pub use crate::algorithms::adam::{Adam, Driver, OptimizerState, TrainingHistory};
    pub use crate::algorithms::Objective;
    pub use crate::entrypoints::fit;
    pub use crate::models::mixture::{DirichletPrior, MixtureObjective};
    pub use crate::models::regression::{LineParams, LinearRegression};
    pub use crate::routines::likelihood::*;
    pub use crate::routines::logger;
    pub use crate::routines::output::{FitResult, RunResult};
    pub use crate::routines::sampling::*;
    pub use crate::routines::settings::Settings;
    pub use crate::structs::key::Key;
    pub use crate::structs::observations::Observations;
    pub use crate::structs::params::{MixtureParams, Params};
}
