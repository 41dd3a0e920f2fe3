//! SafeOpt configuration.
use crate::errors::{Result, SafeOptError};

/// Certificate used to decide whether a safe point may enlarge the safe set
/// once evaluated (aka expander)
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SafetyCertificate {
    /// Lipschitz continuity with the given constant:
    /// `x` is an expander if `u(x) - L * |x - z| >= fmin` for some unsafe `z`
    Lipschitz(f64),
    /// GP confidence bounds only: `x` is an expander if conditioning the GP
    /// on its optimistic value `u(x)` lifts the lower bound of some unsafe `z`
    /// above `fmin`
    ConfidenceBounds,
}

/// SafeOpt optimizer configuration
#[derive(Clone, Debug, PartialEq)]
pub struct SafeOptConfig {
    /// Safety threshold: a point is safe when its lower confidence bound is above `fmin`
    pub(crate) fmin: f64,
    /// Confidence interval half width as a multiple of the GP standard deviation
    pub(crate) beta: f64,
    /// Expander certificate
    pub(crate) certificate: SafetyCertificate,
    /// Points whose confidence interval width is below `threshold * beta`
    /// are not considered as expanders
    pub(crate) threshold: f64,
}

impl Default for SafeOptConfig {
    fn default() -> Self {
        SafeOptConfig {
            fmin: 0.,
            beta: 2.,
            certificate: SafetyCertificate::ConfidenceBounds,
            threshold: 0.,
        }
    }
}

impl SafeOptConfig {
    /// Sets the safety threshold
    pub fn fmin(mut self, fmin: f64) -> Self {
        self.fmin = fmin;
        self
    }

    /// Sets the confidence scaling factor
    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Sets the expander certificate
    pub fn certificate(mut self, certificate: SafetyCertificate) -> Self {
        self.certificate = certificate;
        self
    }

    /// Shortcut for a Lipschitz certificate with constant `lipschitz`
    pub fn lipschitz(self, lipschitz: f64) -> Self {
        self.certificate(SafetyCertificate::Lipschitz(lipschitz))
    }

    /// Sets the minimal confidence width (as multiple of `beta`) of expander candidates
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Get safety threshold
    pub fn get_fmin(&self) -> f64 {
        self.fmin
    }

    /// Get confidence scaling factor
    pub fn get_beta(&self) -> f64 {
        self.beta
    }

    /// Get expander certificate
    pub fn get_certificate(&self) -> SafetyCertificate {
        self.certificate
    }

    /// Check the configuration and return it if valid
    pub fn check(self) -> Result<Self> {
        if !self.fmin.is_finite() {
            return Err(SafeOptError::InvalidConfigError(format!(
                "fmin should be finite, got {}",
                self.fmin
            )));
        }
        if !(self.beta > 0.) {
            return Err(SafeOptError::InvalidConfigError(format!(
                "beta should be strictly positive, got {}",
                self.beta
            )));
        }
        if !self.threshold.is_finite() {
            return Err(SafeOptError::InvalidConfigError(format!(
                "threshold should be finite, got {}",
                self.threshold
            )));
        }
        if let SafetyCertificate::Lipschitz(l) = self.certificate {
            if !(l > 0.) || !l.is_finite() {
                return Err(SafeOptError::InvalidConfigError(format!(
                    "Lipschitz constant should be strictly positive, got {l}"
                )));
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SafeOptConfig::default().check().expect("valid config");
        assert_eq!(config.get_beta(), 2.);
        assert_eq!(config.get_certificate(), SafetyCertificate::ConfidenceBounds);
    }

    #[test]
    fn test_invalid_config() {
        assert!(SafeOptConfig::default().beta(0.).check().is_err());
        assert!(SafeOptConfig::default().lipschitz(-1.).check().is_err());
        assert!(SafeOptConfig::default().fmin(f64::NAN).check().is_err());
        assert!(SafeOptConfig::default().threshold(f64::INFINITY).check().is_err());
    }
}
