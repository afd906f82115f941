use crate::matrix::Matrix;
use crate::model::DiscreteHmm;
use crate::utils;

/// Backward recursion sharing the forward pass's scale factors.
///
/// 1. **Initialize**: β_{T-1}(i) = c[T-1]
/// 2. **Induction**: β_t(i) = (Σ_j A_ij · B_j(o_{t+1}) · β_{t+1}(j)) · c[t]
///
/// `scales` must come from [`forward`](crate::forward::forward) on the same
/// model and observations.
pub fn backward(model: &DiscreteHmm, observations: &[usize], scales: &[f64]) -> Matrix {
    let n_states = model.n_states();
    let t_len = observations.len();
    let transition = model.transition();
    let mut beta = Matrix::zeros(t_len, n_states);

    if t_len == 0 {
        return beta;
    }

    beta.row_mut(t_len - 1).fill(scales[t_len - 1]);

    for t in (0..t_len - 1).rev() {
        let next_symbol = observations[t + 1];
        for i in 0..n_states {
            let sum: f64 = (0..n_states)
                .map(|j| transition[(i, j)] * model.emission_prob(j, next_symbol) * beta[(t + 1, j)])
                .sum();
            beta[(t, i)] = sum * scales[t];
        }
    }

    beta
}

/// Posterior occupancy statistics for one E-step.
#[derive(Debug, Clone, PartialEq)]
pub struct Occupancy {
    /// γ_t(i) = P(state_t = i | O), T x N
    pub gamma: Matrix,
    /// ξ_t(i, j) = P(state_t = i, state_{t+1} = j | O), stored as
    /// (T-1) x (N·N) with slice t laid out row-major over (i, j)
    pub xi: Matrix,
}

impl Occupancy {
    #[inline]
    pub fn xi(&self, t: usize, i: usize, j: usize) -> f64 {
        let n_states = self.gamma.cols();
        self.xi[(t, i * n_states + j)]
    }
}

/// E-step: turn scaled alpha/beta into normalized gamma and xi.
pub fn occupancy(
    model: &DiscreteHmm,
    observations: &[usize],
    alpha: &Matrix,
    beta: &Matrix,
) -> Occupancy {
    let n_states = model.n_states();
    let t_len = observations.len();
    let transition = model.transition();

    let mut gamma = Matrix::zeros(t_len, n_states);
    for t in 0..t_len {
        let row = gamma.row_mut(t);
        for (i, value) in row.iter_mut().enumerate() {
            *value = alpha[(t, i)] * beta[(t, i)];
        }
        utils::normalize(row);
    }

    let mut xi = Matrix::zeros(t_len.saturating_sub(1), n_states * n_states);
    for t in 0..t_len.saturating_sub(1) {
        let next_symbol = observations[t + 1];
        let slice = xi.row_mut(t);
        for i in 0..n_states {
            for j in 0..n_states {
                slice[i * n_states + j] = alpha[(t, i)]
                    * transition[(i, j)]
                    * model.emission_prob(j, next_symbol)
                    * beta[(t + 1, j)];
            }
        }
        utils::normalize(slice);
    }

    Occupancy { gamma, xi }
}
