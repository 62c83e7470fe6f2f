//! Objectives that can be minimized by the drivers in [crate::algorithms]
//!
//! - [mixture::MixtureObjective]: negative log posterior of a Gaussian mixture
//! - [regression::LinearRegression]: mean squared error of a straight line

pub mod mixture;
pub mod regression;
