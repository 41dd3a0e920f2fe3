//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! with a zero prior mean and given kernel hyperparameters, as used by safe Bayesian optimization
//! where the prior (variance and length scales) is part of the problem setup and is not learned
//! from the data.
//!
//! GP methods are implemented by [GaussianProcess] parameterized by [GpParams].
//!
//! Kernels are defined by a prior variance and a [correlation model](correlation_models)
//! with one length scale by input component.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod correlation_models;
mod errors;
mod parameters;
mod utils;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
