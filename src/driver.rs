//! Safe optimization runs: a SafeOpt optimizer searching the problem grid is
//! initialized with safe seeds then asked for points to evaluate until the
//! evaluation budget is exhausted.
use crate::errors::{BenchError, Result};
use crate::problem::{Problem, SafeSeeds};

use clap::ValueEnum;
use linfa::prelude::{Dataset, Fit};
use log::info;
use ndarray::{Array1, ArrayView1};
use safebench_gp::correlation_models::{CorrelationModel, Matern52Corr, SquaredExponentialCorr};
use safebench_gp::GaussianProcess;
use safebench_safeopt::{SafeOptServiceBuilder, SafetyCertificate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence interval scaling factor
pub const BETA: f64 = 2.;

/// Safe optimization algorithm variants
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Algorithm {
    /// SafeOpt using the problem Lipschitz constant estimate to find expanders
    #[value(name = "SafeOpt")]
    SafeOpt,
    /// SafeOpt relying on GP confidence bounds only
    #[value(name = "SafeOptMod")]
    SafeOptMod,
}

impl Algorithm {
    /// Name used in result file names
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::SafeOpt => "SafeOpt",
            Algorithm::SafeOptMod => "SafeOptMod",
        }
    }

    /// Expander certificate of the variant given a Lipschitz constant
    pub fn certificate(&self, lipschitz: f64) -> SafetyCertificate {
        match self {
            Algorithm::SafeOpt => SafetyCertificate::Lipschitz(lipschitz),
            Algorithm::SafeOptMod => SafetyCertificate::ConfidenceBounds,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// GP kernel, with unit variance and unit length scales
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Kernel {
    /// Squared exponential (aka RBF)
    #[default]
    SquaredExponential,
    /// Matern 5/2
    Matern52,
}

/// A single evaluation of a trial
#[derive(Clone, Debug, PartialEq)]
pub struct TrialStep {
    /// Step number starting from 1
    pub t: usize,
    /// Evaluated point
    pub x: Array1<f64>,
    /// Objective value
    pub y: f64,
    /// Whether `y` is safe
    pub safe: bool,
}

/// Record of a safe optimization run
#[derive(Clone, Debug, PartialEq)]
pub struct Trial {
    /// Algorithm variant
    pub algorithm: Algorithm,
    /// Number of seeds the optimizer started with
    pub n_seeds: usize,
    /// Evaluations in order
    pub steps: Vec<TrialStep>,
    /// Problem evaluations counted during the run
    pub n_evaluations: usize,
    /// Unsafe problem evaluations counted during the run
    pub n_unsafe: usize,
    /// Optimizer final best estimate as location and lower confidence bound
    pub best_estimate: Option<(Array1<f64>, f64)>,
}

impl Trial {
    /// Objective values in evaluation order
    pub fn ys(&self) -> Array1<f64> {
        self.steps.iter().map(|s| s.y).collect()
    }

    /// Best objective value observed
    pub fn best_y(&self) -> Option<f64> {
        self.steps.iter().map(|s| s.y).reduce(f64::max)
    }
}

/// SafeOpt driver configuration
#[derive(Clone, Debug, PartialEq)]
pub struct SafeOptDriver {
    algorithm: Algorithm,
    kernel: Kernel,
    beta: f64,
    threshold: Option<f64>,
}

impl SafeOptDriver {
    /// Driver of the given algorithm variant
    pub fn new(algorithm: Algorithm) -> Self {
        SafeOptDriver {
            algorithm,
            kernel: Kernel::default(),
            beta: BETA,
            threshold: None,
        }
    }

    /// Sets GP kernel
    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Sets confidence interval scaling factor
    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Sets the expander width threshold, the problem safety threshold if not set
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Run SafeOpt on `problem` from the given `seeds` for `n_evals` evaluations.
    ///
    /// Problem counters are not reset so that they account for the run
    /// only if reset beforehand.
    pub fn run<O: Fn(&ArrayView1<f64>) -> f64>(
        &self,
        problem: &mut Problem<O>,
        seeds: &SafeSeeds,
        n_evals: usize,
    ) -> Result<Trial> {
        if n_evals <= seeds.len() {
            return Err(BenchError::InsufficientBudget {
                n_evals,
                n_seeds: seeds.len(),
            });
        }
        match self.kernel {
            Kernel::SquaredExponential => {
                self.run_with(SquaredExponentialCorr(), problem, seeds, n_evals)
            }
            Kernel::Matern52 => self.run_with(Matern52Corr(), problem, seeds, n_evals),
        }
    }

    fn run_with<O: Fn(&ArrayView1<f64>) -> f64, Corr: CorrelationModel<f64>>(
        &self,
        corr: Corr,
        problem: &mut Problem<O>,
        seeds: &SafeSeeds,
        n_evals: usize,
    ) -> Result<Trial> {
        let gp = GaussianProcess::<f64, Corr>::params(corr)
            .variance(1.)
            .length_scales(Array1::ones(problem.xdim()))
            .noise_variance(0.)
            .fit(&Dataset::new(seeds.x.to_owned(), seeds.y.to_owned()))?;

        let fmin = problem.safe_threshold();
        let threshold = self.threshold.unwrap_or(fmin);
        let certificate = self.algorithm.certificate(problem.lipschitz());
        let mut safeopt = SafeOptServiceBuilder::optimize()
            .configure(|conf| {
                conf.fmin(fmin)
                    .beta(self.beta)
                    .certificate(certificate)
                    .threshold(threshold)
            })
            .within(problem.x_matrix(), gp)?;

        let mut steps = Vec::with_capacity(n_evals);
        for t in 1..=n_evals {
            let x_next = safeopt.suggest()?;
            let y = problem.evaluate(&x_next.view());
            safeopt.add_observation(&x_next.view(), y)?;
            let safe = y >= fmin;
            info!(
                "evals={}\tx_next={}\ty={}\tsafe={}",
                safeopt.t(),
                x_next,
                y,
                safe
            );
            steps.push(TrialStep {
                t,
                x: x_next,
                y,
                safe,
            });
        }

        Ok(Trial {
            algorithm: self.algorithm,
            n_seeds: seeds.len(),
            steps,
            n_evaluations: problem.n_evaluations(),
            n_unsafe: problem.n_unsafe(),
            best_estimate: safeopt.best_estimate()?,
        })
    }
}

/// Run SafeOpt with Lipschitz expanders and default settings
pub fn run_safeopt<O: Fn(&ArrayView1<f64>) -> f64>(
    problem: &mut Problem<O>,
    seeds: &SafeSeeds,
    n_evals: usize,
) -> Result<Trial> {
    SafeOptDriver::new(Algorithm::SafeOpt).run(problem, seeds, n_evals)
}

/// Run SafeOpt relying on GP confidence bounds only with default settings
pub fn run_modified_safeopt<O: Fn(&ArrayView1<f64>) -> f64>(
    problem: &mut Problem<O>,
    seeds: &SafeSeeds,
    n_evals: usize,
) -> Result<Trial> {
    SafeOptDriver::new(Algorithm::SafeOptMod).run(problem, seeds, n_evals)
}
