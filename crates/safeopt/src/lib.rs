//! This library implements SafeOpt, a safe Bayesian optimization method
//! maximizing an unknown function `f` while only evaluating points where
//! `f(x) >= fmin` with high probability.
//!
//! `f` is modeled by a Gaussian process (see [safebench_gp]) initialized
//! with observations known to be safe. The search space is a finite set of
//! candidate points, typically a regular grid of the input domain.
//!
//! Safety of a candidate is assessed with the GP lower confidence bound, whereas
//! the ability of a safe candidate to enlarge the safe set can be certified either
//! with a Lipschitz constant of `f` or with the GP confidence bounds only
//! (see [SafetyCertificate]).
//!
//! # Example
//!
//! ```
//! use linfa::prelude::*;
//! use ndarray::{array, Array, Axis};
//! use safebench_gp::{correlation_models::SquaredExponentialCorr, GaussianProcess};
//! use safebench_safeopt::SafeOptServiceBuilder;
//!
//! fn f(x: f64) -> f64 {
//!     1. - (x - 1.) * (x - 1.)
//! }
//!
//! // GP conditioned on a known safe point
//! let gp = GaussianProcess::<f64, SquaredExponentialCorr>::params(SquaredExponentialCorr())
//!     .fit(&Dataset::new(array![[0.]], array![f(0.)]))
//!     .expect("GP fitted");
//!
//! let candidates = Array::linspace(-2., 2., 41).insert_axis(Axis(1));
//! let mut safeopt = SafeOptServiceBuilder::optimize()
//!     .configure(|conf| conf.fmin(-0.5).beta(2.))
//!     .within(&candidates, gp)
//!     .expect("SafeOpt configured");
//!
//! for _ in 0..5 {
//!     // ask for the next safe point then tell the observed value
//!     let x = safeopt.suggest().expect("safe point");
//!     safeopt.add_observation(&x.view(), f(x[0])).expect("observation added");
//! }
//!
//! let (x_best, _) = safeopt.best_estimate().unwrap().expect("some safe point");
//! println!("SafeOpt best estimate = {x_best}");
//! ```
#![warn(missing_docs)]

mod config;
mod errors;
mod service;

pub use config::*;
pub use errors::*;
pub use service::*;
