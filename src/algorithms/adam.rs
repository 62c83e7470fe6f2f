//! Adam optimizer expressed as a pure step function
//!
//! The loop-carried [OptimizerState] is never mutated: [Driver::step] takes a
//! state and returns the next one, [Driver::run] folds the step over a fixed
//! number of iterations and [Driver::run_many] does so for several
//! independent starting states in parallel.

use eyre::{ensure, Result};
use ndarray::{Array1, ArrayView1, Zip};
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};

use crate::algorithms::Objective;
use crate::structs::params::Params;

/// Hyperparameters of the Adam update rule.
///
/// For every parameter entry, with gradient `g` at step `t`:
///
/// ```text
/// m ← β1 m + (1 - β1) g
/// v ← β2 v + (1 - β2) g²
/// θ ← θ - lr · (m / (1 - β1ᵗ)) / (sqrt(v / (1 - β2ᵗ)) + ε)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for Adam {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl Adam {
    /// Default decay rates and epsilon with the given learning rate.
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            ..Default::default()
        }
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Check that the hyperparameters describe a valid update rule.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.learning_rate > 0.0 && self.learning_rate.is_finite(),
            "The learning rate must be positive, got {}",
            self.learning_rate
        );
        ensure!(
            (0.0..1.0).contains(&self.beta1) && (0.0..1.0).contains(&self.beta2),
            "Decay rates must lie in [0, 1), got beta1 = {} and beta2 = {}",
            self.beta1,
            self.beta2
        );
        ensure!(
            self.epsilon > 0.0 && self.epsilon.is_finite(),
            "Epsilon must be positive and finite, got {}",
            self.epsilon
        );
        Ok(())
    }
}

/// Current parameters plus the moment estimates Adam carries between steps.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerState<P> {
    params: P,
    m: Array1<f64>,
    v: Array1<f64>,
    step: u64,
}

impl<P: Params> OptimizerState<P> {
    /// Get the current parameters.
    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn into_params(self) -> P {
        self.params
    }

    /// Number of updates applied so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Exponential moving average of the gradient, in flat layout.
    pub fn first_moment(&self) -> ArrayView1<f64> {
        self.m.view()
    }

    /// Exponential moving average of the squared gradient, in flat layout.
    pub fn second_moment(&self) -> ArrayView1<f64> {
        self.v.view()
    }
}

/// Every state produced by a run, in order. The last entry is the final state.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingHistory<P> {
    states: Vec<OptimizerState<P>>,
}

impl<P: Params> TrainingHistory<P> {
    pub fn states(&self) -> &[OptimizerState<P>] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn last(&self) -> Option<&OptimizerState<P>> {
        self.states.last()
    }

    /// Iterate over the parameter snapshots.
    pub fn params(&self) -> impl Iterator<Item = &P> + '_ {
        self.states.iter().map(|state| state.params())
    }

    /// Evaluate the loss at every snapshot, giving the loss curve of the run.
    pub fn losses<O>(&self, objective: &O) -> Result<Vec<f64>>
    where
        O: Objective<Params = P>,
    {
        self.states
            .par_iter()
            .map(|state| objective.cost(state.params()))
            .collect()
    }
}

/// Minimizes an [Objective] with [Adam].
///
/// The driver only bundles the objective and the update rule; all loop state
/// lives in the [OptimizerState] values passed in and returned.
pub struct Driver<'a, O: Objective> {
    objective: &'a O,
    adam: Adam,
}

impl<'a, O: Objective> Driver<'a, O> {
    pub fn new(objective: &'a O, adam: Adam) -> Self {
        Self { objective, adam }
    }

    pub fn objective(&self) -> &O {
        self.objective
    }

    pub fn adam(&self) -> &Adam {
        &self.adam
    }

    /// Create the starting state: zeroed moments, step counter at zero.
    pub fn initialize(&self, params: O::Params) -> OptimizerState<O::Params> {
        let n = params.n_flat();
        OptimizerState {
            params,
            m: Array1::zeros(n),
            v: Array1::zeros(n),
            step: 0,
        }
    }

    /// Gradient of the objective at `params`, in the layout of the parameters.
    pub fn gradient(&self, params: &O::Params) -> Result<O::Params> {
        self.objective.gradient(params)
    }

    /// Apply one Adam update and return the new state.
    ///
    /// The input state is left untouched; either the whole update is applied
    /// or an error is returned.
    pub fn step(&self, state: &OptimizerState<O::Params>) -> Result<OptimizerState<O::Params>> {
        let grad = self.gradient(&state.params)?.to_flat();
        ensure!(
            grad.len() == state.m.len(),
            "Gradient has {} entries but the optimizer state tracks {}",
            grad.len(),
            state.m.len()
        );

        let Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.adam;
        let step = state.step + 1;
        let bias1 = 1.0 - beta1.powf(step as f64);
        let bias2 = 1.0 - beta2.powf(step as f64);

        let mut theta = state.params.to_flat();
        let mut m = state.m.clone();
        let mut v = state.v.clone();

        Zip::from(&mut theta)
            .and(&mut m)
            .and(&mut v)
            .and(&grad)
            .for_each(|theta, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *theta -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            });

        Ok(OptimizerState {
            params: state.params.with_flat(theta.view()),
            m,
            v,
            step,
        })
    }

    /// Fold [Driver::step] over `num_iterations` iterations.
    ///
    /// Returns the final state and the history of every state produced,
    /// which has exactly `num_iterations` entries. With zero iterations the
    /// initial state is returned unchanged alongside an empty history.
    pub fn run(
        &self,
        initial: OptimizerState<O::Params>,
        num_iterations: usize,
    ) -> Result<(OptimizerState<O::Params>, TrainingHistory<O::Params>)> {
        let states = (0..num_iterations)
            .scan(initial.clone(), |state, _| match self.step(state) {
                Ok(next) => {
                    *state = next.clone();
                    Some(Ok(next))
                }
                Err(err) => Some(Err(err)),
            })
            .collect::<Result<Vec<_>>>()?;
        let last = states.last().cloned().unwrap_or(initial);

        tracing::debug!(
            "Run finished after {} iterations (step counter {})",
            num_iterations,
            last.step
        );
        Ok((last, TrainingHistory { states }))
    }

    /// Run several independent optimizations in parallel.
    ///
    /// Runs share nothing but the (read-only) objective, so every entry of the
    /// output equals what [Driver::run] returns for the matching input. Output
    /// order follows input order.
    pub fn run_many(
        &self,
        initial_states: Vec<OptimizerState<O::Params>>,
        num_iterations: usize,
    ) -> Result<Vec<(OptimizerState<O::Params>, TrainingHistory<O::Params>)>> {
        tracing::debug!(
            "Starting {} independent runs of {} iterations",
            initial_states.len(),
            num_iterations
        );
        initial_states
            .into_par_iter()
            .map(|state| self.run(state, num_iterations))
            .collect()
    }
}
