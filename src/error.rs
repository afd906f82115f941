use thiserror::Error;

/// Errors that can occur when building or training a discrete HMM.
#[derive(Debug, Error)]
pub enum HmmError {
    #[error("Invalid number of states: {0} (must be > 0)")]
    InvalidStateCount(usize),

    #[error("Invalid number of symbols: {0} (must be > 0)")]
    InvalidSymbolCount(usize),

    #[error("Observation sequence too short: {len} symbols (need at least {min})")]
    SequenceTooShort { len: usize, min: usize },

    #[error("Observation {index} is symbol {symbol}, outside [0, {n_symbols})")]
    SymbolOutOfRange {
        index: usize,
        symbol: usize,
        n_symbols: usize,
    },

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Probability vector must sum to 1.0 (got {sum})")]
    InvalidProbabilitySum { sum: f64 },

    #[error("{matrix} row {row} must sum to 1.0 (got {sum})")]
    InvalidRowSum {
        matrix: &'static str,
        row: usize,
        sum: f64,
    },

    #[error("Probability must be in [0, 1] (got {value} at index {index})")]
    InvalidProbability { index: usize, value: f64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Model file not found: {0}")]
    ModelFileNotFound(String),
}
