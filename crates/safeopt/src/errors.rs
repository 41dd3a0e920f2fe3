use thiserror::Error;

/// A result type for SafeOpt errors
pub type Result<T> = std::result::Result<T, SafeOptError>;

/// An error for safe optimization algorithm
#[derive(Error, Debug)]
pub enum SafeOptError {
    /// When configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When the safe set is empty
    #[error("There are no safe points to evaluate")]
    NoSafePointError,
    /// When an invalid value is encountered
    #[error("Value error: {0}")]
    InvalidValue(String),
    /// When GP prediction or conditioning fails
    #[error("GP error")]
    GpError(#[from] safebench_gp::GpError),
}
