/// Stand-in for an exact zero probability (emissions, scale factors,
/// re-estimation denominators).
pub const PROB_FLOOR: f64 = 1e-300;

/// Offset added to every random draw during initialization so no parameter
/// starts at exactly zero.
pub const INIT_OFFSET: f64 = 0.2;

/// Log-space sum-exp trick: log(Σ exp(x_i)) = max(x) + log(Σ exp(x_i - max(x)))
///
/// `max` is taken over the finite inputs only. An empty slice, or one holding
/// nothing but `-inf`, yields `-inf` instead of NaN.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.iter().any(|&x| x == f64::INFINITY) {
        return f64::INFINITY;
    }
    let max_val = values
        .iter()
        .copied()
        .filter(|x| x.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if max_val == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = values.iter().map(|&x| (x - max_val).exp()).sum();
    max_val + sum.ln()
}

/// Scale `row` in place so it sums to 1 and return the pre-normalization sum.
///
/// A row whose sum is not a positive finite number is replaced by the uniform
/// distribution.
pub fn normalize(row: &mut [f64]) -> f64 {
    let sum: f64 = row.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for value in row.iter_mut() {
            *value /= sum;
        }
    } else if !row.is_empty() {
        let uniform = 1.0 / row.len() as f64;
        row.fill(uniform);
    }
    sum
}

/// Replace a non-positive probability with [`PROB_FLOOR`].
#[inline]
pub(crate) fn floor_prob(p: f64) -> f64 {
    if p > 0.0 {
        p
    } else {
        PROB_FLOOR
    }
}
