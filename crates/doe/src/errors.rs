use thiserror::Error;

/// A result type for grid evaluation
pub type Result<T> = std::result::Result<T, DoeError>;

/// An error when deriving statistics from evaluated grids
#[derive(Error, Debug)]
pub enum DoeError {
    /// When quantile computation fails (empty values, quantile out of [0, 1])
    #[error(transparent)]
    QuantileError(#[from] ndarray_stats::errors::QuantileError),
    /// When min/max search fails
    #[error(transparent)]
    MinMaxError(#[from] ndarray_stats::errors::MinMaxError),
    /// When a value or a gradient is NaN or infinite
    #[error("Non finite value: {0}")]
    NonFiniteValue(String),
}
