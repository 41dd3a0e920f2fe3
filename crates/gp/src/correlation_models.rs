//! A module for correlation models used as GP kernels with one length scale
//! by input component (aka ARD kernels).
//!
//! The following correlation models are implemented:
//! * squared exponential (aka RBF),
//! * matern 5/2.
//!
//! Models are parameterized by `theta`, the inverse of the length scales.

use linfa::Float;
use ndarray::{Array1, ArrayBase, Axis, Data, Ix1, Ix2};
use std::fmt;

/// A trait for using a correlation model in GP regression
pub trait CorrelationModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Compute correlation values r(x, x') given differences `d` between x and x'
    /// and `theta` parameters, where:
    /// `d`     : differences (n, nx)
    /// `theta` : inverse length scales (nx,)
    /// Returns n correlation values
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F>;
}

/// Scaled squared distances sum_j (theta_j * d_j)^2
fn scaled_sq_dist<F: Float>(
    d: &ArrayBase<impl Data<Elem = F>, Ix2>,
    theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Array1<F> {
    (d * theta).mapv(|v| v * v).sum_axis(Axis(1))
}

/// Squared exponential correlation model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    ///   nx
    /// prod exp( - (theta_j * d_j)^2 / 2 )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        scaled_sq_dist(d, theta).mapv(|v| F::exp(F::cast(-0.5) * v))
    }
}

impl fmt::Display for SquaredExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

/// Matern 5/2 correlation model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Matern52Corr();

impl<F: Float> CorrelationModel<F> for Matern52Corr {
    /// (1 + sqrt(5) r + 5 r^2 / 3) exp(-sqrt(5) r)
    /// with r = sqrt(sum_j (theta_j * d_j)^2)
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let sqrt5 = F::cast(5.).sqrt();
        scaled_sq_dist(d, theta).mapv(|r2| {
            let r = r2.sqrt();
            (F::one() + sqrt5 * r + F::cast(5. / 3.) * r2) * F::exp(-sqrt5 * r)
        })
    }
}

impl fmt::Display for Matern52Corr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern52")
    }
}
