//! Baum-Welch estimation of discrete-output hidden Markov models.
//!
//! The forward and backward recursions stay in probability space and use
//! Rabiner scaling, so sequences of any practical length train without
//! underflow.
//!
//! ```
//! use discrete_hmm::{Estimator, EstimatorOptions, TrainingState};
//!
//! let obs = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
//! let mut est = Estimator::new(obs, 2, 2, EstimatorOptions::default()).unwrap();
//! assert_eq!(est.train(), TrainingState::Converged);
//! assert_eq!(est.transition().rows(), 2);
//! ```

mod baum_welch;
pub mod error;
pub mod estimator;
mod forward;
mod forward_backward;
pub mod matrix;
pub mod model;
pub mod rng;
pub mod utils;

pub use error::HmmError;
pub use estimator::{
    Estimator, EstimatorOptions, IterationRecord, Snapshot, Training, TrainingReport,
    TrainingState,
};
pub use matrix::Matrix;
pub use model::DiscreteHmm;
pub use rng::Mulberry32;
pub use utils::log_sum_exp;
