use crate::correlation_models::*;
use crate::errors::{GpError, Result};
use crate::parameters::{GpParams, GpValidParams};
use crate::utils::pairwise_differences;

use linfa::prelude::{Dataset, DatasetBase, Fit, Float};
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{s, Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};

use log::warn;
use rayon::prelude::*;
use std::fmt;

/// Number of points predicted at once in batch predictions
pub const GP_PREDICTION_CHUNK: usize = 2048;
/// Max number of jitter increases tried when factorizing the covariance matrix
pub const GP_MAX_JITTER_TRIES: usize = 6;

/// A GP regression model with zero prior mean and fixed kernel hyperparameters.
///
/// The observed output is modeled as a realization of the stochastic process
///
/// `Y(x) = Z(x) + eps`
///
/// where:
/// * `Z(x)` is a gaussian process with zero mean and covariance `variance * corr(x, x')`,
/// * `eps ~ Normal(0, noise_variance)` is the observation noise.
///
/// Unlike a Kriging model, neither the data nor the hyperparameters are fitted:
/// the prior is exactly the given one, and conditioning on new observations
/// only refactorizes the covariance matrix.
///
/// # Example
///
/// ```
/// use safebench_gp::{correlation_models::SquaredExponentialCorr, GaussianProcess};
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// let xt = array![[0.0, 0.0], [1.0, 0.5], [2.5, 1.0]];
/// let yt = array![1.0, 2.0, 0.5];
///
/// let gp = GaussianProcess::<f64, SquaredExponentialCorr>::params(SquaredExponentialCorr())
///     .length_scales(array![1.0, 2.0])
///     .fit(&Dataset::new(xt.to_owned(), yt))
///     .expect("GP fitted");
///
/// let (mean, var) = gp.predict_valvar(&xt).expect("GP prediction");
/// ```
#[derive(Debug, Clone)]
pub struct GaussianProcess<F: Float, Corr: CorrelationModel<F>> {
    /// Parameter of the autocorrelation model equal to the inverse of length scales
    theta: Array1<F>,
    /// Lower triangle of the Cholesky decomposition of the training covariance matrix
    k_chol: Array2<F>,
    /// Solution of the linear equation system: \[K\] x alpha = yt
    alpha: Array1<F>,
    /// Training inputs
    xt: Array2<F>,
    /// Training outputs
    yt: Array1<F>,
    /// Parameters used to fit this model
    pub(crate) params: GpValidParams<F, Corr>,
}

/// GP with squared exponential kernel
pub type RbfGp<F> = GaussianProcess<F, SquaredExponentialCorr>;

impl<F: Float, Corr: CorrelationModel<F>> fmt::Display for GaussianProcess<F, Corr> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP(corr={}, variance={}, length_scales={}, noise={}, n_obs={})",
            self.params.corr,
            self.params.variance,
            self.length_scales(),
            self.params.noise_variance,
            self.xt.nrows()
        )
    }
}

impl<F: Float, Corr: CorrelationModel<F>> GaussianProcess<F, Corr> {
    /// Gp parameters contructor
    pub fn params<NewCorr: CorrelationModel<F>>(corr: NewCorr) -> GpParams<F, NewCorr> {
        GpParams::new(corr)
    }

    /// Predict both output values and noiseless variances at n given `x` points
    /// of nx components specified as a (n, nx) matrix.
    ///
    /// Points are processed by chunks of [GP_PREDICTION_CHUNK] in parallel.
    pub fn predict_valvar(
        &self,
        x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        if x.ncols() != self.xt.ncols() {
            return Err(GpError::InvalidValueError(format!(
                "Prediction points have {} components, training points have {}",
                x.ncols(),
                self.xt.ncols()
            )));
        }
        let n = x.nrows();
        let starts: Vec<usize> = (0..n).step_by(GP_PREDICTION_CHUNK).collect();
        let chunks = starts
            .par_iter()
            .map(|&start| {
                let end = (start + GP_PREDICTION_CHUNK).min(n);
                self.predict_chunk(&x.slice(s![start..end, ..]))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut mean = Array1::zeros(n);
        let mut var = Array1::zeros(n);
        for (start, (m, v)) in starts.iter().zip(chunks) {
            let end = start + m.len();
            mean.slice_mut(s![*start..end]).assign(&m);
            var.slice_mut(s![*start..end]).assign(&v);
        }
        Ok((mean, var))
    }

    fn predict_chunk(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let k_star = self.cross_covariance(x)?;
        let mean = k_star.dot(&self.alpha);

        // v = L^-1 . k(X, x)
        let v = self.k_chol.solve_triangular(&k_star.t(), UPLO::Lower)?;
        let var = v
            .mapv(|e| e * e)
            .sum_axis(Axis(0))
            .mapv(|e| self.params.variance - e);

        // Variance might be slightly negative depending on
        // machine precision: set to zero in that case
        Ok((mean, var.mapv(|e| if e < F::zero() { F::zero() } else { e })))
    }

    /// Covariance between given `x` points (m, nx) and training points as a (m, nt) matrix
    fn cross_covariance(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let dx = pairwise_differences(x, &self.xt);
        let r = self.params.corr.value(&dx, &self.theta);
        let k = r.mapv(|v| v * self.params.variance);
        Ok(k.into_shape((x.nrows(), self.xt.nrows()))?)
    }

    /// Return a new GP conditioned on the training data plus the observation `y` at `x`.
    pub fn with_observation(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>, y: F) -> Result<Self> {
        let mut xt = self.xt.to_owned();
        xt.push_row(x.view()).map_err(|_| {
            GpError::InvalidValueError(format!(
                "Observation has {} components, training points have {}",
                x.len(),
                self.xt.ncols()
            ))
        })?;
        let mut yt = self.yt.to_vec();
        yt.push(y);
        self.params.fit(&Dataset::new(xt, Array1::from(yt)))
    }

    /// Condition the GP on the observation `y` at `x`.
    pub fn add_observation(&mut self, x: &ArrayBase<impl Data<Elem = F>, Ix1>, y: F) -> Result<()> {
        *self = self.with_observation(x, y)?;
        Ok(())
    }

    /// Retrieve length scales, one by input component
    pub fn length_scales(&self) -> Array1<F> {
        self.theta.mapv(|v| F::one() / v)
    }

    /// Prior variance of the process
    pub fn variance(&self) -> F {
        self.params.variance
    }

    /// Number of training points
    pub fn n_obs(&self) -> usize {
        self.xt.nrows()
    }

    /// Retrieve input dimension
    pub fn input_dim(&self) -> usize {
        self.xt.ncols()
    }

    /// Last training observation if any
    pub fn last_observation(&self) -> Option<(ArrayView1<'_, F>, F)> {
        let n = self.xt.nrows();
        (n > 0).then(|| (self.xt.row(n - 1), self.yt[n - 1]))
    }
}

/// Cholesky factorization of `k` where diagonal jitter is added in case of failure,
/// starting from 1e-6 times the mean diagonal and increased tenfold at each try.
fn jittered_cholesky<F: Float>(k: &Array2<F>) -> Result<Array2<F>> {
    if let Ok(l) = k.cholesky() {
        return Ok(l);
    }
    let mean_diag = k.diag().mean().unwrap_or_else(F::one);
    let mut jitter = mean_diag * F::cast(1e-6);
    for _ in 0..GP_MAX_JITTER_TRIES {
        let mut kj = k.to_owned();
        kj.diag_mut().mapv_inplace(|v| v + jitter);
        if let Ok(l) = kj.cholesky() {
            warn!("Covariance matrix not positive definite, added jitter {jitter}");
            return Ok(l);
        }
        jitter *= F::cast(10.);
    }
    Err(GpError::NotPositiveDefinite(
        jitter.to_f64().unwrap_or(f64::NAN) / 10.,
    ))
}

impl<F: Float, Corr: CorrelationModel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError> for GpValidParams<F, Corr>
{
    type Object = GaussianProcess<F, Corr>;

    /// Condition the GP prior on the training data
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();

        if x.nrows() == 0 {
            return Err(GpError::InvalidValueError(
                "GP requires at least one training point".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(GpError::InvalidValueError(format!(
                "{} training inputs given for {} outputs",
                x.nrows(),
                y.len()
            )));
        }

        let dim = x.ncols();
        let ls = self.length_scales();
        let theta = if ls.len() == 1 {
            Array1::from_elem(dim, F::one() / ls[0])
        } else if ls.len() == dim {
            ls.mapv(|v| F::one() / v)
        } else {
            return Err(GpError::InvalidValueError(format!(
                "Length scales should be either 1-dim or dim of xtrain ({}), got {}",
                dim,
                ls.len()
            )));
        };

        let nt = x.nrows();
        let dx = pairwise_differences(x, x);
        let r = self.corr().value(&dx, &theta);
        let mut k = r.mapv(|v| v * self.variance()).into_shape((nt, nt))?;
        let diag_add = self.variance() * self.nugget() + self.noise_variance();
        k.diag_mut().mapv_inplace(|v| v + diag_add);

        let k_chol = jittered_cholesky(&k)?;
        let yt = y.to_owned();
        // alpha = L^-t . L^-1 . y
        let z = k_chol.solve_triangular(&yt.view().insert_axis(Axis(1)), UPLO::Lower)?;
        let alpha = k_chol.t().solve_triangular(&z, UPLO::Upper)?;

        Ok(GaussianProcess {
            theta,
            k_chol,
            alpha: alpha.column(0).to_owned(),
            xt: x.to_owned(),
            yt,
            params: self.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linfa::ParamGuard;
    use ndarray::{array, Array};

    fn training_data() -> (Array2<f64>, Array1<f64>) {
        let xt = array![[0.0, 0.0], [1.0, 0.5], [2.5, 1.0], [-1.0, 2.0]];
        let yt = array![1.0, 2.0, 0.5, -0.3];
        (xt, yt)
    }

    #[test]
    fn test_interpolation_without_noise() {
        let (xt, yt) = training_data();
        let gp = RbfGp::<f64>::params(SquaredExponentialCorr())
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
            .expect("GP fitted");
        let (mean, var) = gp.predict_valvar(&xt).expect("GP prediction");
        assert_abs_diff_eq!(mean, yt, epsilon = 1e-6);
        assert_abs_diff_eq!(var, Array1::zeros(4), epsilon = 1e-6);
    }

    #[test]
    fn test_prior_far_from_data() {
        let (xt, yt) = training_data();
        let gp = RbfGp::<f64>::params(SquaredExponentialCorr())
            .variance(4.)
            .fit(&Dataset::new(xt, yt))
            .expect("GP fitted");
        let (mean, var) = gp
            .predict_valvar(&array![[100., 100.]])
            .expect("GP prediction");
        // zero prior mean and prior variance recovered away from data
        assert_abs_diff_eq!(mean[0], 0., epsilon = 1e-12);
        assert_abs_diff_eq!(var[0], 4., epsilon = 1e-12);
    }

    #[test]
    fn test_single_point_posterior() {
        let gp = RbfGp::<f64>::params(SquaredExponentialCorr())
            .nugget(0.)
            .fit(&Dataset::new(array![[0., 0.]], array![2.]))
            .expect("GP fitted");
        let (mean, var) = gp.predict_valvar(&array![[1., 0.]]).expect("GP prediction");
        let k = (-0.5f64).exp();
        assert_abs_diff_eq!(mean[0], 2. * k, epsilon = 1e-12);
        assert_abs_diff_eq!(var[0], 1. - k * k, epsilon = 1e-12);
    }

    #[test]
    fn test_noise_variance() {
        let gp = RbfGp::<f64>::params(SquaredExponentialCorr())
            .noise_variance(1.)
            .nugget(0.)
            .fit(&Dataset::new(array![[0., 0.]], array![2.]))
            .expect("GP fitted");
        let (mean, var) = gp.predict_valvar(&array![[0., 0.]]).expect("GP prediction");
        assert_abs_diff_eq!(mean[0], 1., epsilon = 1e-12);
        assert_abs_diff_eq!(var[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_duplicated_points() {
        let gp = RbfGp::<f64>::params(SquaredExponentialCorr())
            .nugget(0.)
            .fit(&Dataset::new(array![[0., 0.], [0., 0.]], array![1., 1.]))
            .expect("GP fitted with jitter");
        let mean = gp.predict_valvar(&array![[0., 0.]]).expect("GP prediction").0;
        assert_abs_diff_eq!(mean[0], 1., epsilon = 1e-4);
    }

    #[test]
    fn test_add_observation() {
        let (xt, yt) = training_data();
        let mut gp = RbfGp::<f64>::params(SquaredExponentialCorr())
            .length_scales(array![0.5, 2.])
            .fit(&Dataset::new(xt, yt))
            .expect("GP fitted");
        let fake = gp
            .with_observation(&array![3., 3.], 5.)
            .expect("GP conditioned");
        assert_eq!(gp.n_obs(), 4);
        assert_eq!(fake.n_obs(), 5);

        gp.add_observation(&array![3., 3.], 5.).expect("GP conditioned");
        assert_eq!(gp.n_obs(), 5);
        let (x, y) = gp.last_observation().expect("observation");
        assert_eq!(x, array![3., 3.]);
        assert_eq!(y, 5.);
        assert_abs_diff_eq!(
            gp.predict_valvar(&array![[3., 3.]]).expect("GP prediction").0[0],
            5.,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(gp.length_scales(), array![0.5, 2.], epsilon = 1e-12);
    }

    #[test]
    fn test_batch_prediction_matches_pointwise() {
        let (xt, yt) = training_data();
        let gp = GaussianProcess::<f64, Matern52Corr>::params(Matern52Corr())
            .fit(&Dataset::new(xt, yt))
            .expect("GP fitted");
        let n = GP_PREDICTION_CHUNK + 17;
        let x = Array::linspace(-3., 3., n)
            .insert_axis(Axis(1))
            .broadcast((n, 2))
            .expect("broadcast")
            .to_owned();
        let (mean, var) = gp.predict_valvar(&x).expect("GP prediction");
        for i in [0, GP_PREDICTION_CHUNK - 1, GP_PREDICTION_CHUNK, n - 1] {
            let (m, v) = gp
                .predict_valvar(&x.slice(s![i..i + 1, ..]))
                .expect("GP prediction");
            assert_abs_diff_eq!(mean[i], m[0], epsilon = 1e-12);
            assert_abs_diff_eq!(var[i], v[0], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_bad_length_scales() {
        let (xt, yt) = training_data();
        let params = RbfGp::<f64>::params(SquaredExponentialCorr())
            .length_scales(array![1., 1., 1.])
            .check()
            .expect("valid params");
        assert!(params.fit(&Dataset::new(xt, yt)).is_err());
    }
}
