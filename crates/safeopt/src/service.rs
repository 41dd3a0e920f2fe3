//! SafeOpt service exposes the SafeOpt algorithm with an ask-and-tell interface
//! over a finite set of candidate points: the caller asks for the next safe point
//! to evaluate with [SafeOptService::suggest] then tells the observed value with
//! [SafeOptService::add_observation].
//!
//! At each suggestion, given confidence intervals `Q = [l, u]` computed from the GP
//! noiseless predictions at every candidate:
//! * the safe set `S` gathers candidates with `l > fmin`,
//! * the maximizers `M` are safe candidates with `u >= max(l over S)`,
//! * the expanders `G` are safe candidates which, once evaluated, would certify
//!   some currently unsafe candidate as safe,
//!
//! and the next point is the most uncertain one within `M` and `G`.
use crate::config::{SafeOptConfig, SafetyCertificate};
use crate::errors::{Result, SafeOptError};

use log::debug;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix2, Zip};
use safebench_gp::{correlation_models::CorrelationModel, GaussianProcess};

/// SafeOpt service builder
pub struct SafeOptServiceBuilder {
    config: SafeOptConfig,
}

impl SafeOptServiceBuilder {
    /// Start a SafeOpt optimizer build with a default configuration
    pub fn optimize() -> Self {
        SafeOptServiceBuilder {
            config: SafeOptConfig::default(),
        }
    }

    /// Configure the SafeOpt optimizer with a closure
    /// taking and returning a SafeOptConfig structure.
    pub fn configure<F: FnOnce(SafeOptConfig) -> SafeOptConfig>(mut self, init: F) -> Self {
        self.config = init(self.config);
        self
    }

    /// Build a SafeOpt optimizer maximizing within the given candidate points
    /// `parameter_set` specified as a (n, nx) matrix, starting from the `gp`
    /// already conditioned on safe initial observations.
    pub fn within<Corr: CorrelationModel<f64>>(
        self,
        parameter_set: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        gp: GaussianProcess<f64, Corr>,
    ) -> Result<SafeOptService<Corr>> {
        let config = self.config.check()?;
        if parameter_set.nrows() == 0 {
            return Err(SafeOptError::InvalidConfigError(
                "Candidate set cannot be empty".to_string(),
            ));
        }
        if parameter_set.ncols() != gp.input_dim() {
            return Err(SafeOptError::InvalidConfigError(format!(
                "Candidates have {} components, GP inputs have {}",
                parameter_set.ncols(),
                gp.input_dim()
            )));
        }
        let scaling = gp.variance().sqrt();
        let n = parameter_set.nrows();
        Ok(SafeOptService {
            config,
            gp,
            parameter_set: parameter_set.to_owned(),
            scaling,
            lower: Array1::zeros(n),
            upper: Array1::zeros(n),
            s: Array1::from_elem(n, false),
            m: Array1::from_elem(n, false),
            g: Array1::from_elem(n, false),
        })
    }
}

/// SafeOpt optimizer service API
#[derive(Clone, Debug)]
pub struct SafeOptService<Corr: CorrelationModel<f64>> {
    config: SafeOptConfig,
    gp: GaussianProcess<f64, Corr>,
    parameter_set: Array2<f64>,
    scaling: f64,
    /// Lower confidence bounds at candidates
    lower: Array1<f64>,
    /// Upper confidence bounds at candidates
    upper: Array1<f64>,
    /// Safe set
    s: Array1<bool>,
    /// Potential maximizers
    m: Array1<bool>,
    /// Potential expanders
    g: Array1<bool>,
}

impl<Corr: CorrelationModel<f64>> SafeOptService<Corr> {
    /// Recompute confidence intervals `mean -/+ beta * std` at every candidate
    pub fn update_confidence_intervals(&mut self) -> Result<()> {
        let (mean, var) = self.gp.predict_valvar(&self.parameter_set)?;
        let beta = self.config.beta;
        Zip::from(&mut self.lower)
            .and(&mut self.upper)
            .and(&mean)
            .and(&var)
            .for_each(|l, u, &m, &v| {
                let w = beta * v.sqrt();
                *l = m - w;
                *u = m + w;
            });
        Ok(())
    }

    /// Update the safe set from current confidence intervals
    pub fn compute_safe_set(&mut self) {
        let fmin = self.config.fmin;
        self.s = self.lower.mapv(|l| l > fmin);
    }

    /// Update safe set, maximizers and expanders from current confidence intervals.
    ///
    /// Only the expander candidates more uncertain than every maximizer are
    /// tested, by decreasing uncertainty, and the search stops at the first
    /// expander found as it is the only one which may be suggested.
    pub fn compute_sets(&mut self) -> Result<()> {
        self.compute_safe_set();
        self.m.fill(false);
        self.g.fill(false);
        if !self.s.iter().any(|&s| s) {
            return Ok(());
        }

        let max_l = masked_max(&self.lower, &self.s);
        Zip::from(&mut self.m)
            .and(&self.s)
            .and(&self.upper)
            .for_each(|m, &s, &u| *m = s && u >= max_l);

        let width = &self.upper - &self.lower;
        let max_var = masked_max(&width, &self.m) / self.scaling;
        let min_width = self.config.threshold * self.config.beta;
        let mut candidates: Vec<usize> = (0..width.len())
            .filter(|&i| {
                self.s[i]
                    && !self.m[i]
                    && width[i] / self.scaling > max_var
                    && width[i] > min_width
            })
            .collect();
        if candidates.is_empty() {
            self.log_sets();
            return Ok(());
        }
        candidates.sort_by(|&a, &b| width[b].total_cmp(&width[a]));

        let unsafe_indices: Vec<usize> = (0..width.len()).filter(|&i| !self.s[i]).collect();
        let unsafe_points = self.parameter_set.select(Axis(0), &unsafe_indices);
        for i in candidates {
            let x = self.parameter_set.row(i);
            let expander = match self.config.certificate {
                SafetyCertificate::Lipschitz(lipschitz) => is_lipschitz_expander(
                    &x,
                    self.upper[i],
                    &unsafe_points,
                    lipschitz,
                    self.config.fmin,
                ),
                SafetyCertificate::ConfidenceBounds => {
                    self.is_gp_expander(&x, self.upper[i], &unsafe_points)?
                }
            };
            if expander {
                self.g[i] = true;
                break;
            }
        }
        self.log_sets();
        Ok(())
    }

    /// Whether conditioning the GP on the optimistic value `ux` at `x`
    /// makes some of `unsafe_points` safe
    fn is_gp_expander(
        &self,
        x: &ArrayView1<f64>,
        ux: f64,
        unsafe_points: &ArrayBase<impl Data<Elem = f64> + Sync, Ix2>,
    ) -> Result<bool> {
        if unsafe_points.nrows() == 0 {
            return Ok(false);
        }
        let gp = self.gp.with_observation(x, ux)?;
        let (mean, var) = gp.predict_valvar(unsafe_points)?;
        let beta = self.config.beta;
        let fmin = self.config.fmin;
        Ok(Zip::from(&mean)
            .and(&var)
            .fold(false, |acc, &m, &v| acc || m - beta * v.sqrt() >= fmin))
    }

    fn log_sets(&self) {
        debug!(
            "SafeOpt sets: |S|={} |M|={} |G|={}",
            count(&self.s),
            count(&self.m),
            count(&self.g)
        );
    }

    fn new_query_point(&self, ucb: bool) -> Result<Array1<f64>> {
        if !self.s.iter().any(|&s| s) {
            return Err(SafeOptError::NoSafePointError);
        }
        let best = if ucb {
            masked_argmax(&self.upper, &self.s)
        } else {
            let mg = Zip::from(&self.m).and(&self.g).map_collect(|&m, &g| m || g);
            let value = (&self.upper - &self.lower) / self.scaling;
            masked_argmax(&value, &mg)
        };
        best.map(|i| self.parameter_set.row(i).to_owned())
            .ok_or(SafeOptError::NoSafePointError)
    }

    /// Ask for the next point to evaluate: the most uncertain point among
    /// maximizers and expanders.
    pub fn suggest(&mut self) -> Result<Array1<f64>> {
        self.update_confidence_intervals()?;
        self.compute_sets()?;
        self.new_query_point(false)
    }

    /// Ask for the safe point with the highest upper confidence bound.
    pub fn suggest_ucb(&mut self) -> Result<Array1<f64>> {
        self.update_confidence_intervals()?;
        self.compute_safe_set();
        self.new_query_point(true)
    }

    /// Tell the value `y` observed at `x`
    pub fn add_observation(&mut self, x: &ArrayView1<f64>, y: f64) -> Result<()> {
        if x.len() != self.parameter_set.ncols() {
            return Err(SafeOptError::InvalidValue(format!(
                "Observation has {} components, candidates have {}",
                x.len(),
                self.parameter_set.ncols()
            )));
        }
        self.gp.add_observation(x, y)?;
        Ok(())
    }

    /// Return the safe point with the highest lower confidence bound together with
    /// this bound, or None if there is no safe point.
    pub fn best_estimate(&mut self) -> Result<Option<(Array1<f64>, f64)>> {
        self.update_confidence_intervals()?;
        self.compute_safe_set();
        Ok(masked_argmax(&self.lower, &self.s)
            .map(|i| (self.parameter_set.row(i).to_owned(), self.lower[i])))
    }

    /// Number of observations the GP is conditioned on, initial ones included
    pub fn t(&self) -> usize {
        self.gp.n_obs()
    }

    /// The underlying GP
    pub fn gp(&self) -> &GaussianProcess<f64, Corr> {
        &self.gp
    }

    /// Candidate points
    pub fn parameter_set(&self) -> &Array2<f64> {
        &self.parameter_set
    }

    /// Configuration in use
    pub fn config(&self) -> &SafeOptConfig {
        &self.config
    }

    /// Confidence interval widths scaling in use
    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    /// Lower and upper confidence bounds computed at last update
    pub fn confidence_intervals(&self) -> (&Array1<f64>, &Array1<f64>) {
        (&self.lower, &self.upper)
    }

    /// Safe set mask computed at last update
    pub fn safe_set(&self) -> &Array1<bool> {
        &self.s
    }

    /// Maximizers mask computed at last update
    pub fn maximizers(&self) -> &Array1<bool> {
        &self.m
    }

    /// Expanders mask computed at last update
    pub fn expanders(&self) -> &Array1<bool> {
        &self.g
    }
}

/// Whether some `z` within `unsafe_points` verifies `ux - lipschitz * |x - z| >= fmin`
fn is_lipschitz_expander(
    x: &ArrayView1<f64>,
    ux: f64,
    unsafe_points: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    lipschitz: f64,
    fmin: f64,
) -> bool {
    unsafe_points.rows().into_iter().any(|z| {
        let d = Zip::from(x)
            .and(&z)
            .fold(0., |acc, &a, &b| acc + (a - b) * (a - b))
            .sqrt();
        ux - lipschitz * d >= fmin
    })
}

fn count(mask: &Array1<bool>) -> usize {
    mask.iter().filter(|&&v| v).count()
}

fn masked_max(values: &Array1<f64>, mask: &Array1<bool>) -> f64 {
    Zip::from(values)
        .and(mask)
        .fold(f64::NEG_INFINITY, |acc, &v, &inside| {
            if inside && v > acc {
                v
            } else {
                acc
            }
        })
}

/// Index of the first max value within the mask
fn masked_argmax(values: &Array1<f64>, mask: &Array1<bool>) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, (&v, &inside)) in values.iter().zip(mask.iter()).enumerate() {
        if inside && best.map_or(true, |b| v > values[b]) {
            best = Some(i);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::*;
    use ndarray::{array, Array};
    use safebench_gp::correlation_models::SquaredExponentialCorr;

    fn service(y0: f64, fmin: f64) -> SafeOptService<SquaredExponentialCorr> {
        let gp = GaussianProcess::<f64, SquaredExponentialCorr>::params(SquaredExponentialCorr())
            .fit(&Dataset::new(array![[0.]], array![y0]))
            .expect("GP fitted");
        let parameter_set = Array::linspace(-2., 2., 41).insert_axis(Axis(1));
        SafeOptServiceBuilder::optimize()
            .configure(|conf| conf.fmin(fmin))
            .within(&parameter_set, gp)
            .expect("SafeOpt configured")
    }

    fn xsq(x: f64) -> f64 {
        1. - (x - 1.) * (x - 1.)
    }

    #[test]
    fn test_safe_set_around_seed() {
        let mut safeopt = service(1., 0.5);
        safeopt.update_confidence_intervals().unwrap();
        safeopt.compute_safe_set();
        // candidates -0.2, -0.1, 0, 0.1, 0.2
        assert_eq!(count(safeopt.safe_set()), 5);
        assert!(safeopt.safe_set()[20]);
        assert!(!safeopt.safe_set()[0]);
        assert!(!safeopt.safe_set()[40]);
    }

    #[test]
    fn test_suggest_most_uncertain_maximizer() {
        let mut safeopt = service(1., 0.5);
        let x = safeopt.suggest().expect("safe suggestion");
        assert_abs_diff_eq!(x[0].abs(), 0.2, epsilon = 1e-9);
        assert_eq!(safeopt.maximizers(), safeopt.safe_set());
        assert_eq!(count(safeopt.expanders()), 0);
    }

    #[test]
    fn test_suggest_ucb() {
        let mut safeopt = service(1., 0.5);
        let x = safeopt.suggest_ucb().expect("safe suggestion");
        assert_abs_diff_eq!(x[0].abs(), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_no_safe_point() {
        let mut safeopt = service(-5., 0.);
        assert!(matches!(
            safeopt.suggest(),
            Err(SafeOptError::NoSafePointError)
        ));
        assert!(safeopt.best_estimate().unwrap().is_none());
    }

    #[test]
    fn test_ask_and_tell() {
        let mut safeopt = service(xsq(0.), -0.5);
        for _ in 0..10 {
            let x = safeopt.suggest().expect("safe suggestion");
            assert!(safeopt
                .parameter_set()
                .rows()
                .into_iter()
                .any(|row| row == x));
            safeopt.add_observation(&x.view(), xsq(x[0])).unwrap();
        }
        assert_eq!(safeopt.t(), 11);
        let (_, lower) = safeopt
            .best_estimate()
            .unwrap()
            .expect("some safe point");
        assert!(lower > -0.5);
    }

    #[test]
    fn test_lipschitz_expander() {
        let unsafe_points = array![[1.], [2.]];
        let x = array![0.];
        assert!(is_lipschitz_expander(
            &x.view(),
            1.,
            &unsafe_points,
            0.4,
            0.5
        ));
        assert!(!is_lipschitz_expander(
            &x.view(),
            1.,
            &unsafe_points,
            1.,
            0.5
        ));
    }

    #[test]
    fn test_gp_expander() {
        let safeopt = service(1., 0.5);
        let x = array![0.2];
        // optimistic value at 0.2 lifts the lower bound nearby only
        assert!(safeopt
            .is_gp_expander(&x.view(), 1.376, &array![[0.3]])
            .unwrap());
        assert!(!safeopt
            .is_gp_expander(&x.view(), 1.376, &array![[2.0]])
            .unwrap());
    }

    #[test]
    fn test_candidates_dimension_mismatch() {
        let gp = GaussianProcess::<f64, SquaredExponentialCorr>::params(SquaredExponentialCorr())
            .fit(&Dataset::new(array![[0.]], array![1.]))
            .expect("GP fitted");
        let res = SafeOptServiceBuilder::optimize().within(&array![[0., 1.]], gp);
        assert!(matches!(res, Err(SafeOptError::InvalidConfigError(_))));
    }

    #[test]
    fn test_masked_argmax_first_on_ties() {
        let values = array![1., 3., 3., 5.];
        let mask = array![true, true, true, false];
        assert_eq!(masked_argmax(&values, &mask), Some(1));
        assert_eq!(masked_argmax(&values, &array![false, false, false, false]), None);
    }
}
