//! Baum-Welch training loop.
//!
//! An [`Estimator`] owns the observation sequence, the live parameters and
//! everything a run produces. Training is driven through [`Estimator::training`],
//! a lazy stream of [`IterationRecord`]s, or through the callback adapter
//! [`Estimator::train_with_callback`].
//!
//! After the loop stops (converged or capped) one extra forward/backward/E-step
//! pass runs on the *updated* parameters, so `final_alpha` and `final_gamma`
//! describe the model one M-step ahead of the last recorded log-likelihood.

use crate::baum_welch::{self, expectation};
use crate::error::HmmError;
use crate::matrix::Matrix;
use crate::model::{check_observations, DiscreteHmm};
use crate::rng::Mulberry32;
use serde::{Deserialize, Serialize};

/// Shortest sequence the estimator accepts.
pub const MIN_SEQUENCE_LEN: usize = 3;

/// Training hyperparameters. Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorOptions {
    /// Iteration cap.
    pub max_iter: usize,
    /// Convergence threshold on |ll_k - ll_{k-1}|.
    pub epsilon: f64,
    /// Seed for parameter initialization.
    pub seed: u32,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            epsilon: 1e-6,
            seed: 42,
        }
    }
}

impl EstimatorOptions {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Parse options from a JSON document such as `{"max_iter": 50}`.
    pub fn from_json_str(json: &str) -> Result<Self, HmmError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Where a training run stands. `Converged` and `MaxIterReached` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingState {
    Ready,
    Running,
    Converged,
    MaxIterReached,
}

impl TrainingState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::MaxIterReached)
    }
}

/// Deep copy of the parameters after one M-step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub iteration: usize,
    pub log_likelihood: f64,
    pub initial_probs: Vec<f64>,
    pub transition: Matrix,
    pub emission: Matrix,
}

impl Snapshot {
    fn capture(iteration: usize, log_likelihood: f64, model: &DiscreteHmm) -> Self {
        Self {
            iteration,
            log_likelihood,
            initial_probs: model.initial_probs().to_vec(),
            transition: model.transition().clone(),
            emission: model.emission().clone(),
        }
    }
}

/// One progress notification.
///
/// Every completed iteration yields one record with `done == false`; the
/// iteration that triggers convergence is followed by a second record with
/// `done == true`.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub message: String,
    pub done: bool,
    pub snapshot: Snapshot,
}

/// Serializable summary of a finished (or in-progress) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub initial_probs: Vec<f64>,
    pub transition: Matrix,
    pub emission: Matrix,
    pub log_likelihood_history: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub state: TrainingState,
    pub final_alpha: Option<Matrix>,
    pub final_gamma: Option<Matrix>,
}

impl TrainingReport {
    pub fn to_json(&self) -> Result<String, HmmError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Baum-Welch estimator for a single observation sequence.
#[derive(Debug, Clone)]
pub struct Estimator {
    observations: Vec<usize>,
    options: EstimatorOptions,
    start: DiscreteHmm,
    model: DiscreteHmm,
    state: TrainingState,
    history: Vec<Snapshot>,
    log_likelihood_history: Vec<f64>,
    final_alpha: Option<Matrix>,
    final_gamma: Option<Matrix>,
}

impl Estimator {
    /// Validate the inputs and draw starting parameters from `options.seed`.
    pub fn new(
        observations: Vec<usize>,
        n_states: usize,
        n_symbols: usize,
        options: EstimatorOptions,
    ) -> Result<Self, HmmError> {
        if n_states == 0 {
            return Err(HmmError::InvalidStateCount(n_states));
        }
        if n_symbols == 0 {
            return Err(HmmError::InvalidSymbolCount(n_symbols));
        }
        check_observations(&observations, n_symbols, MIN_SEQUENCE_LEN)?;

        let mut rng = Mulberry32::new(options.seed);
        let model = DiscreteHmm::random(n_states, n_symbols, &mut rng)?;
        Ok(Self::assemble(observations, model, options))
    }

    /// Start EM from caller-supplied parameters instead of a random draw.
    /// `options.seed` is unused.
    pub fn with_model(
        observations: Vec<usize>,
        model: DiscreteHmm,
        options: EstimatorOptions,
    ) -> Result<Self, HmmError> {
        check_observations(&observations, model.n_symbols(), MIN_SEQUENCE_LEN)?;
        Ok(Self::assemble(observations, model, options))
    }

    fn assemble(observations: Vec<usize>, model: DiscreteHmm, options: EstimatorOptions) -> Self {
        Self {
            observations,
            options,
            start: model.clone(),
            model,
            state: TrainingState::Ready,
            history: Vec::new(),
            log_likelihood_history: Vec::new(),
            final_alpha: None,
            final_gamma: None,
        }
    }

    /// Begin a new run and return its iteration stream.
    ///
    /// Parameters are reset to the starting draw and all history from a
    /// previous run is discarded. Dropping the stream early leaves the run in
    /// [`TrainingState::Running`] without final artifacts.
    pub fn training(&mut self) -> Training<'_> {
        self.model = self.start.clone();
        self.state = TrainingState::Running;
        self.history.clear();
        self.log_likelihood_history.clear();
        self.final_alpha = None;
        self.final_gamma = None;

        tracing::debug!(
            "Starting Baum-Welch: T={}, N={}, M={}, max_iter={}, epsilon={:e}",
            self.observations.len(),
            self.model.n_states(),
            self.model.n_symbols(),
            self.options.max_iter,
            self.options.epsilon
        );

        Training {
            estimator: self,
            iteration: 0,
            pending: None,
        }
    }

    /// Run to completion and return the terminal state.
    pub fn train(&mut self) -> TrainingState {
        self.training().for_each(drop);
        self.state
    }

    /// Run to completion, reporting `(message, iteration, done)` after every
    /// iteration.
    pub fn train_with_callback<F>(&mut self, mut callback: F) -> TrainingState
    where
        F: FnMut(&str, usize, bool),
    {
        for record in self.training() {
            callback(&record.message, record.iteration, record.done);
        }
        self.state
    }

    /// Recompute occupancy for the current parameters and enter `state`.
    fn finish(&mut self, state: TrainingState) {
        let exp = expectation(&self.model, &self.observations);
        self.final_alpha = Some(exp.forward.log_alpha());
        self.final_gamma = Some(exp.occupancy.gamma);
        self.state = state;
    }

    pub fn observations(&self) -> &[usize] {
        &self.observations
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    /// Current parameter estimate.
    pub fn model(&self) -> &DiscreteHmm {
        &self.model
    }

    pub fn initial_probs(&self) -> &[f64] {
        self.model.initial_probs()
    }

    pub fn transition(&self) -> &Matrix {
        self.model.transition()
    }

    pub fn emission(&self) -> &Matrix {
        self.model.emission()
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    pub fn converged(&self) -> bool {
        self.state == TrainingState::Converged
    }

    /// Number of iterations completed in the current run.
    pub fn iterations(&self) -> usize {
        self.log_likelihood_history.len()
    }

    pub fn log_likelihood_history(&self) -> &[f64] {
        &self.log_likelihood_history
    }

    /// Per-iteration parameter snapshots.
    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    /// Unscaled log-forward matrix for the final parameters.
    pub fn final_alpha(&self) -> Option<&Matrix> {
        self.final_alpha.as_ref()
    }

    /// State occupancy for the final parameters.
    pub fn final_gamma(&self) -> Option<&Matrix> {
        self.final_gamma.as_ref()
    }

    pub fn report(&self) -> TrainingReport {
        TrainingReport {
            initial_probs: self.initial_probs().to_vec(),
            transition: self.transition().clone(),
            emission: self.emission().clone(),
            log_likelihood_history: self.log_likelihood_history.clone(),
            iterations: self.iterations(),
            converged: self.converged(),
            state: self.state,
            final_alpha: self.final_alpha.clone(),
            final_gamma: self.final_gamma.clone(),
        }
    }
}

/// Lazy, finite stream of iteration records for one run.
///
/// Not restartable: once it returns `None` it keeps returning `None`.
/// Start another run with [`Estimator::training`].
#[derive(Debug)]
pub struct Training<'a> {
    estimator: &'a mut Estimator,
    iteration: usize,
    pending: Option<IterationRecord>,
}

impl Iterator for Training<'_> {
    type Item = IterationRecord;

    fn next(&mut self) -> Option<IterationRecord> {
        if let Some(record) = self.pending.take() {
            return Some(record);
        }

        let est = &mut *self.estimator;
        if est.state != TrainingState::Running {
            return None;
        }
        if self.iteration >= est.options.max_iter {
            // only reachable with max_iter == 0
            est.finish(TrainingState::MaxIterReached);
            tracing::warn!("Baum-Welch stopped before the first iteration (max_iter = 0)");
            return None;
        }

        let iteration = self.iteration;
        let out = baum_welch::step(&est.model, &est.observations);
        let ll = out.log_likelihood;
        let prev_ll = est.log_likelihood_history.last().copied();

        est.model = out.model;
        est.log_likelihood_history.push(ll);
        let snapshot = Snapshot::capture(iteration, ll, &est.model);
        est.history.push(snapshot.clone());
        self.iteration += 1;

        let message = format!("Iteration {}: log-likelihood = {:.6}", iteration + 1, ll);
        tracing::debug!("{}", message);

        let record = IterationRecord {
            iteration,
            message,
            done: false,
            snapshot,
        };

        let converged = prev_ll.is_some_and(|prev| (ll - prev).abs() < est.options.epsilon);
        if converged {
            est.finish(TrainingState::Converged);
            tracing::info!("Converged after {} iterations", iteration + 1);
            self.pending = Some(IterationRecord {
                message: format!(
                    "Converged after {} iterations (log-likelihood = {:.6})",
                    iteration + 1,
                    ll
                ),
                done: true,
                ..record.clone()
            });
        } else if self.iteration >= est.options.max_iter {
            est.finish(TrainingState::MaxIterReached);
            tracing::warn!(
                "Reached max_iter = {} without converging (log-likelihood = {:.6})",
                est.options.max_iter,
                ll
            );
        }

        Some(record)
    }
}
