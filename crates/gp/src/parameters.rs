use crate::correlation_models::CorrelationModel;
use crate::errors::{GpError, Result};
use linfa::{Float, ParamGuard};

use ndarray::{array, Array1};

/// A set of validated GP parameters.
///
/// Kernel hyperparameters are given, not estimated: the GP is
/// `k(x, x') = variance * corr(x, x')` with one length scale by input component.
#[derive(Clone, Debug, PartialEq)]
pub struct GpValidParams<F: Float, Corr: CorrelationModel<F>> {
    /// Correlation model representing the spatial correlation between errors at e(x) and e(x')
    pub(crate) corr: Corr,
    /// Prior variance of the process
    pub(crate) variance: F,
    /// Length scales of the correlation model, either one value for all components or one by component
    pub(crate) length_scales: Array1<F>,
    /// Variance of observation noise
    pub(crate) noise_variance: F,
    /// Parameter to improve numerical stability
    pub(crate) nugget: F,
}

impl<F: Float, Corr: CorrelationModel<F>> Default for GpValidParams<F, Corr> {
    fn default() -> GpValidParams<F, Corr> {
        GpValidParams {
            corr: Corr::default(),
            variance: F::one(),
            length_scales: array![F::one()],
            noise_variance: F::zero(),
            nugget: F::cast(100.0) * F::epsilon(),
        }
    }
}

impl<F: Float, Corr: CorrelationModel<F>> GpValidParams<F, Corr> {
    /// Get correlation corr k(x, x')
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Get prior variance
    pub fn variance(&self) -> F {
        self.variance
    }

    /// Get length scales
    pub fn length_scales(&self) -> &Array1<F> {
        &self.length_scales
    }

    /// Get observation noise variance
    pub fn noise_variance(&self) -> F {
        self.noise_variance
    }

    /// Get nugget
    pub fn nugget(&self) -> F {
        self.nugget
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](crate::GaussianProcess).
pub struct GpParams<F: Float, Corr: CorrelationModel<F>>(GpValidParams<F, Corr>);

impl<F: Float, Corr: CorrelationModel<F>> GpParams<F, Corr> {
    /// A constructor for GP parameters given a correlation model
    pub fn new(corr: Corr) -> GpParams<F, Corr> {
        Self(GpValidParams {
            corr,
            ..Default::default()
        })
    }

    /// Set correlation model.
    pub fn corr(mut self, corr: Corr) -> Self {
        self.0.corr = corr;
        self
    }

    /// Set prior variance of the process.
    pub fn variance(mut self, variance: F) -> Self {
        self.0.variance = variance;
        self
    }

    /// Set length scales.
    ///
    /// Either a one-element array used for every input component
    /// or one length scale by input component.
    pub fn length_scales(mut self, length_scales: Array1<F>) -> Self {
        self.0.length_scales = length_scales;
        self
    }

    /// Set observation noise variance.
    pub fn noise_variance(mut self, noise_variance: F) -> Self {
        self.0.noise_variance = noise_variance;
        self
    }

    /// Set nugget.
    ///
    /// Nugget is used to improve numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }
}

impl<F: Float, Corr: CorrelationModel<F>> From<GpValidParams<F, Corr>> for GpParams<F, Corr> {
    fn from(valid: GpValidParams<F, Corr>) -> Self {
        GpParams(valid)
    }
}

impl<F: Float, Corr: CorrelationModel<F>> ParamGuard for GpParams<F, Corr> {
    type Checked = GpValidParams<F, Corr>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if !(self.0.variance > F::zero()) {
            return Err(GpError::InvalidValueError(format!(
                "`variance` should be strictly positive, got {}",
                self.0.variance
            )));
        }
        if self.0.length_scales.is_empty() {
            return Err(GpError::InvalidValueError(
                "`length_scales` cannot be empty!".to_string(),
            ));
        }
        if self.0.length_scales.iter().any(|l| !(*l > F::zero())) {
            return Err(GpError::InvalidValueError(format!(
                "`length_scales` should be strictly positive, got {}",
                self.0.length_scales
            )));
        }
        if self.0.noise_variance < F::zero() || self.0.nugget < F::zero() {
            return Err(GpError::InvalidValueError(
                "`noise_variance` and `nugget` cannot be negative!".to_string(),
            ));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
