use crate::matrix::Matrix;
use crate::model::DiscreteHmm;
use crate::utils::PROB_FLOOR;

/// Output of the scaled forward recursion.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPass {
    /// Scaled forward variables; every row sums to 1, so row t is
    /// P(state_t | o_0, ..., o_t).
    pub alpha: Matrix,
    /// c[t] = 1 / (sum of row t before scaling), or 1 for a zero row.
    pub scales: Vec<f64>,
    /// log P(o_0, ..., o_{T-1}) = -Σ_t log c[t]
    pub log_likelihood: f64,
}

impl ForwardPass {
    /// Unscaled log-forward matrix: log α_t(i) = log(alpha[t][i]) - Σ_{s≤t} log c[s].
    ///
    /// Meant for export only; training never reads it.
    pub fn log_alpha(&self) -> Matrix {
        let mut log_alpha = Matrix::zeros(self.alpha.rows(), self.alpha.cols());
        let mut unscale = 0.0;
        for (t, &c) in self.scales.iter().enumerate() {
            unscale -= scale_log(c);
            for (out, &a) in log_alpha.row_mut(t).iter_mut().zip(self.alpha.row(t)) {
                *out = a.max(PROB_FLOOR).ln() + unscale;
            }
        }
        log_alpha
    }
}

#[inline]
pub(crate) fn scale_log(c: f64) -> f64 {
    if c > 0.0 {
        c.ln()
    } else {
        PROB_FLOOR.ln()
    }
}

/// Forward algorithm with Rabiner scaling.
///
/// 1. **Initialize**: α_0(i) = π_i · B_i(o_0)
/// 2. **Induction**: α_t(j) = (Σ_i α_{t-1}(i) · A_ij) · B_j(o_t)
/// 3. **Scale**: divide each row by its sum and record c[t] = 1 / sum
///
/// Every symbol in `observations` must be below `model.n_symbols()`.
pub fn forward(model: &DiscreteHmm, observations: &[usize]) -> ForwardPass {
    let n_states = model.n_states();
    let t_len = observations.len();
    let transition = model.transition();

    let mut alpha = Matrix::zeros(t_len, n_states);
    let mut scales = vec![1.0; t_len];

    for (t, &symbol) in observations.iter().enumerate() {
        for j in 0..n_states {
            let reach = if t == 0 {
                model.initial_probs()[j]
            } else {
                (0..n_states)
                    .map(|i| alpha[(t - 1, i)] * transition[(i, j)])
                    .sum::<f64>()
            };
            alpha[(t, j)] = reach * model.emission_prob(j, symbol);
        }

        let row = alpha.row_mut(t);
        let sum: f64 = row.iter().sum();
        if sum > 0.0 {
            for value in row.iter_mut() {
                *value /= sum;
            }
            scales[t] = 1.0 / sum;
        }
    }

    let log_likelihood = -scales.iter().map(|&c| scale_log(c)).sum::<f64>();

    ForwardPass {
        alpha,
        scales,
        log_likelihood,
    }
}
