//! One Baum-Welch iteration expressed as a pipeline of pure stages:
//! forward → backward → E-step → M-step.

use crate::forward::{forward, ForwardPass};
use crate::forward_backward::{backward, occupancy, Occupancy};
use crate::matrix::Matrix;
use crate::model::DiscreteHmm;
use crate::utils::{self, PROB_FLOOR};

/// Forward pass plus occupancy statistics for one parameter set.
#[derive(Debug, Clone)]
pub struct Expectation {
    pub forward: ForwardPass,
    pub occupancy: Occupancy,
}

/// Run forward, backward and the E-step for `model`.
pub fn expectation(model: &DiscreteHmm, observations: &[usize]) -> Expectation {
    let forward = forward(model, observations);
    let beta = backward(model, observations, &forward.scales);
    let occupancy = occupancy(model, observations, &forward.alpha, &beta);
    Expectation { forward, occupancy }
}

/// M-step: re-estimate π, A and B from occupancy statistics.
///
/// - π_i = γ_0(i)
/// - A_ij = Σ_{t<T-1} ξ_t(i, j) / Σ_{t<T-1} γ_t(i)
/// - B_ik = Σ_{t: o_t = k} γ_t(i) / Σ_t γ_t(i)
///
/// Zero denominators are floored and every row is renormalized afterwards.
pub fn reestimate(observations: &[usize], n_symbols: usize, occupancy: &Occupancy) -> DiscreteHmm {
    let gamma = &occupancy.gamma;
    let n_states = gamma.cols();
    let t_len = observations.len();

    let mut initial_probs = gamma.row(0).to_vec();
    utils::normalize(&mut initial_probs);

    let mut transition = Matrix::zeros(n_states, n_states);
    for i in 0..n_states {
        let denom = floor_denominator((0..t_len - 1).map(|t| gamma[(t, i)]).sum());
        let row = transition.row_mut(i);
        for (j, value) in row.iter_mut().enumerate() {
            let numer: f64 = (0..t_len - 1).map(|t| occupancy.xi(t, i, j)).sum();
            *value = numer / denom;
        }
        utils::normalize(row);
    }

    let mut emission = Matrix::zeros(n_states, n_symbols);
    for i in 0..n_states {
        let denom = floor_denominator((0..t_len).map(|t| gamma[(t, i)]).sum());
        let row = emission.row_mut(i);
        for (k, value) in row.iter_mut().enumerate() {
            let numer: f64 = observations
                .iter()
                .enumerate()
                .filter(|&(_, &o)| o == k)
                .map(|(t, _)| gamma[(t, i)])
                .sum();
            *value = numer / denom;
        }
        utils::normalize(row);
    }

    DiscreteHmm::from_parts(initial_probs, transition, emission)
}

#[inline]
fn floor_denominator(denom: f64) -> f64 {
    if denom > 0.0 {
        denom
    } else {
        PROB_FLOOR
    }
}

/// Result of one full EM iteration.
#[derive(Debug, Clone)]
pub struct IterationOutput {
    /// Parameters after the M-step.
    pub model: DiscreteHmm,
    /// Log-likelihood of the observations under the parameters *before* the
    /// M-step.
    pub log_likelihood: f64,
}

/// One Baum-Welch iteration. `observations` must hold at least two symbols,
/// all below `model.n_symbols()`.
pub fn step(model: &DiscreteHmm, observations: &[usize]) -> IterationOutput {
    let Expectation {
        forward,
        occupancy,
    } = expectation(model, observations);
    IterationOutput {
        model: reestimate(observations, model.n_symbols(), &occupancy),
        log_likelihood: forward.log_likelihood,
    }
}
