//! `safebench` benchmarks safe Bayesian optimization strategies on synthetic
//! test functions.
//!
//! A [Problem] restricts an objective to a 2D box and derives from an evaluation
//! on a regular grid:
//! * a safety threshold given by a percentile of grid values: evaluations below are unsafe,
//! * a Lipschitz constant estimate from numeric gradients,
//! * the grid optimum,
//! * safe seeds used as initial observations of optimizers.
//!
//! A [SafeOptDriver] runs the SafeOpt algorithm (see [safebench_safeopt]) on the
//! problem grid for a given evaluation budget, either certifying safe set
//! expansions with the Lipschitz constant ([Algorithm::SafeOpt]) or with GP
//! confidence bounds only ([Algorithm::SafeOptMod]).
//!
//! An [ExperimentRunner] repeats runs for several algorithms and seed numbers
//! and writes trajectories in CSV files.
//!
//! # Example
//!
//! ```no_run
//! use safebench::{BenchmarkProblem, ExperimentConfig, ExperimentRunner};
//!
//! let mut problem = BenchmarkProblem::Sphere2d75.build(500).expect("problem built");
//! let runner = ExperimentRunner::new(ExperimentConfig::default().n_reps(2).outdir("results"))
//!     .expect("valid configuration");
//! for summary in runner.run(&mut problem).expect("experiment run") {
//!     println!("{summary}");
//! }
//! ```
#![warn(missing_docs)]

mod driver;
mod errors;
mod problem;
mod runner;
mod test_functions;

pub use driver::*;
pub use errors::*;
pub use problem::*;
pub use runner::*;
pub use test_functions::*;
