use crate::error::HmmError;
use crate::forward::forward;
use crate::forward_backward::{backward, occupancy};
use crate::matrix::Matrix;
use crate::rng::Mulberry32;
use crate::utils::{self, INIT_OFFSET};
use serde::{Deserialize, Serialize};
use std::path::Path;

const PROB_EPSILON: f64 = 1e-6;

/// Discrete-output hidden Markov model: `n_states` hidden states emitting
/// symbols from `0..n_symbols`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DiscreteHmm {
    n_states: usize,
    n_symbols: usize,
    /// pi[i] = P(state_0 = i)
    initial_probs: Vec<f64>,
    /// A[i][j] = P(state_{t+1} = j | state_t = i), N x N
    transition: Matrix,
    /// B[i][k] = P(symbol k | state i), N x M
    emission: Matrix,
}

impl DiscreteHmm {
    pub fn new(
        initial_probs: Vec<f64>,
        transition: Vec<Vec<f64>>,
        emission: Vec<Vec<f64>>,
    ) -> Result<Self, HmmError> {
        let n_states = initial_probs.len();
        if n_states == 0 {
            return Err(HmmError::InvalidStateCount(0));
        }
        if transition.len() != n_states {
            return Err(HmmError::DimensionMismatch {
                expected: n_states,
                actual: transition.len(),
            });
        }
        if emission.len() != n_states {
            return Err(HmmError::DimensionMismatch {
                expected: n_states,
                actual: emission.len(),
            });
        }

        let model = Self {
            n_states,
            n_symbols: emission[0].len(),
            initial_probs,
            transition: Matrix::from_rows(&transition)?,
            emission: Matrix::from_rows(&emission)?,
        };
        model.validate()?;
        Ok(model)
    }

    /// Random starting parameters: every entry is `draw + 0.2`, then each row
    /// is normalized. Rows are drawn in the order pi, A, B.
    pub fn random(
        n_states: usize,
        n_symbols: usize,
        rng: &mut Mulberry32,
    ) -> Result<Self, HmmError> {
        if n_states == 0 {
            return Err(HmmError::InvalidStateCount(n_states));
        }
        if n_symbols == 0 {
            return Err(HmmError::InvalidSymbolCount(n_symbols));
        }

        let mut draw_row = |row: &mut [f64]| {
            for value in row.iter_mut() {
                *value = rng.next_f64() + INIT_OFFSET;
            }
            utils::normalize(row);
        };

        let mut initial_probs = vec![0.0; n_states];
        draw_row(&mut initial_probs);

        let mut transition = Matrix::zeros(n_states, n_states);
        for i in 0..n_states {
            draw_row(transition.row_mut(i));
        }

        let mut emission = Matrix::zeros(n_states, n_symbols);
        for i in 0..n_states {
            draw_row(emission.row_mut(i));
        }

        Ok(Self {
            n_states,
            n_symbols,
            initial_probs,
            transition,
            emission,
        })
    }

    /// Assemble re-estimated parameters. Shapes are trusted.
    pub(crate) fn from_parts(initial_probs: Vec<f64>, transition: Matrix, emission: Matrix) -> Self {
        debug_assert_eq!(transition.rows(), initial_probs.len());
        debug_assert_eq!(emission.rows(), initial_probs.len());
        Self {
            n_states: initial_probs.len(),
            n_symbols: emission.cols(),
            initial_probs,
            transition,
            emission,
        }
    }

    /// Load model from JSON file.
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self, HmmError> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HmmError::ModelFileNotFound(path_ref.display().to_string())
            } else {
                HmmError::IoError(e)
            }
        })?;

        let model: Self = serde_json::from_str(&content)?;
        model.validate()?;
        Ok(model)
    }

    /// Save model to JSON file.
    pub fn save_to_json<P: AsRef<Path>>(&self, path: P) -> Result<(), HmmError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Get number of states.
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Get number of symbols.
    pub fn n_symbols(&self) -> usize {
        self.n_symbols
    }

    pub fn initial_probs(&self) -> &[f64] {
        &self.initial_probs
    }

    pub fn transition(&self) -> &Matrix {
        &self.transition
    }

    pub fn emission(&self) -> &Matrix {
        &self.emission
    }

    /// B[state][symbol] with exact zeros replaced by the probability floor.
    #[inline]
    pub(crate) fn emission_prob(&self, state: usize, symbol: usize) -> f64 {
        utils::floor_prob(self.emission[(state, symbol)])
    }

    /// Log-likelihood of a sequence under this model.
    pub fn log_likelihood(&self, observations: &[usize]) -> Result<f64, HmmError> {
        check_observations(observations, self.n_symbols, 1)?;
        Ok(forward(self, observations).log_likelihood)
    }

    /// Filtered state probabilities: row t is P(state_t | o_0, ..., o_t).
    pub fn filter(&self, observations: &[usize]) -> Result<Matrix, HmmError> {
        check_observations(observations, self.n_symbols, 1)?;
        Ok(forward(self, observations).alpha)
    }

    /// Smoothed state probabilities: row t is P(state_t | o_0, ..., o_{T-1}).
    pub fn posteriors(&self, observations: &[usize]) -> Result<Matrix, HmmError> {
        check_observations(observations, self.n_symbols, 1)?;
        let fwd = forward(self, observations);
        let beta = backward(self, observations, &fwd.scales);
        Ok(occupancy(self, observations, &fwd.alpha, &beta).gamma)
    }

    /// Validate shapes and row sums.
    fn validate(&self) -> Result<(), HmmError> {
        if self.n_states == 0 {
            return Err(HmmError::InvalidStateCount(0));
        }
        if self.n_symbols == 0 {
            return Err(HmmError::InvalidSymbolCount(0));
        }
        if self.initial_probs.len() != self.n_states {
            return Err(HmmError::DimensionMismatch {
                expected: self.n_states,
                actual: self.initial_probs.len(),
            });
        }
        for (matrix, rows, cols) in [
            (&self.transition, self.n_states, self.n_states),
            (&self.emission, self.n_states, self.n_symbols),
        ] {
            if matrix.rows() != rows {
                return Err(HmmError::DimensionMismatch {
                    expected: rows,
                    actual: matrix.rows(),
                });
            }
            if matrix.cols() != cols {
                return Err(HmmError::DimensionMismatch {
                    expected: cols,
                    actual: matrix.cols(),
                });
            }
        }

        check_probabilities(&self.initial_probs)?;
        let prob_sum: f64 = self.initial_probs.iter().sum();
        if (prob_sum - 1.0).abs() > PROB_EPSILON {
            return Err(HmmError::InvalidProbabilitySum { sum: prob_sum });
        }

        for (name, matrix) in [("transition", &self.transition), ("emission", &self.emission)] {
            for (row, values) in matrix.iter_rows().enumerate() {
                check_probabilities(values)?;
                let sum: f64 = values.iter().sum();
                if (sum - 1.0).abs() > PROB_EPSILON {
                    return Err(HmmError::InvalidRowSum {
                        matrix: name,
                        row,
                        sum,
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_probabilities(values: &[f64]) -> Result<(), HmmError> {
    if let Some((index, &value)) = values
        .iter()
        .enumerate()
        .find(|(_, &p)| !(0.0..=1.0).contains(&p))
    {
        return Err(HmmError::InvalidProbability { index, value });
    }
    Ok(())
}

/// Check length and symbol range of an observation sequence.
pub(crate) fn check_observations(
    observations: &[usize],
    n_symbols: usize,
    min_len: usize,
) -> Result<(), HmmError> {
    if observations.len() < min_len {
        return Err(HmmError::SequenceTooShort {
            len: observations.len(),
            min: min_len,
        });
    }
    if let Some((index, &symbol)) = observations
        .iter()
        .enumerate()
        .find(|(_, &o)| o >= n_symbols)
    {
        return Err(HmmError::SymbolOutOfRange {
            index,
            symbol,
            n_symbols,
        });
    }
    Ok(())
}
