use thiserror::Error;

/// A result type for benchmark errors
pub type Result<T> = std::result::Result<T, BenchError>;

/// An error raised while setting up or running safe optimization benchmarks
#[derive(Error, Debug)]
pub enum BenchError {
    /// When the safety percentile is not in [0, 0.9)
    #[error("Safety percentile should be in [0, 0.9), got {0}")]
    InvalidPercentile(f64),
    /// When no grid point lies within the band used to draw seeds
    #[error("No grid point within the safe band ({0}, {1})")]
    EmptySafeRegion(f64, f64),
    /// When the grid maximum is not safe
    #[error("Optimum y = {y} is unsafe with threshold {threshold}")]
    UnsafeOptimum {
        /// Optimum value
        y: f64,
        /// Safety threshold
        threshold: f64,
    },
    /// When evaluating the objective at the optimum does not give the stored grid value
    #[error("Optimum value {stored} differs from objective evaluation {evaluated}")]
    OptimumMismatch {
        /// Grid value
        stored: f64,
        /// Fresh evaluation
        evaluated: f64,
    },
    /// When a seed is not safe
    #[error("Seed at grid index {index} is unsafe: y = {y} < {threshold}")]
    UnsafeSeed {
        /// Grid index of the seed
        index: usize,
        /// Seed value
        y: f64,
        /// Safety threshold
        threshold: f64,
    },
    /// When less seeds than requested are available
    #[error("{requested} safe seeds requested, only {available} available")]
    NotEnoughSeeds {
        /// Requested seeds number
        requested: usize,
        /// Available seeds number
        available: usize,
    },
    /// When the evaluation budget does not exceed the seeds number
    #[error("Evaluation budget ({n_evals}) should exceed the number of seeds ({n_seeds})")]
    InsufficientBudget {
        /// Evaluation budget
        n_evals: usize,
        /// Seeds number
        n_seeds: usize,
    },
    /// When configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When an invalid value is encountered
    #[error("Value error: {0}")]
    InvalidValue(String),
    /// When grid statistics cannot be computed
    #[error("Grid error")]
    DoeError(#[from] safebench_doe::DoeError),
    /// When SafeOpt fails
    #[error("SafeOpt error")]
    SafeOptError(#[from] safebench_safeopt::SafeOptError),
    /// When GP construction fails
    #[error("GP error")]
    GpError(#[from] safebench_gp::GpError),
    /// When IO fails
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    /// When results writing fails
    #[error("CSV error")]
    CsvError(#[from] csv::Error),
    /// When configuration reading fails
    #[error("JSON error")]
    JsonError(#[from] serde_json::Error),
}
