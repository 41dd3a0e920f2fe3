//! Safe optimization test problems: an objective restricted to a bounded 2D
//! domain, evaluated once on a regular grid which provides the safety threshold,
//! a Lipschitz constant estimate, the optimum and candidate safe seeds.
use crate::errors::{BenchError, Result};
use crate::test_functions::TestFn;

use log::info;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix2};
use ndarray_rand::rand::{seq::index, Rng};
use safebench_doe::{quantile, Grid, GridData};

/// Grid resolution by axis used to evaluate problems
pub const DEFAULT_GRID_STEPS: usize = 500;
/// Quantile of grid values above which points are not drawn as seeds
pub const SEEDS_UPPER_QUANTILE: f64 = 0.9;

/// Location and value of the grid maximum
#[derive(Clone, Debug, PartialEq)]
pub struct Optimum {
    /// Index within grid points
    pub index: usize,
    /// Optimum location
    pub x: Array1<f64>,
    /// Optimum value
    pub y: f64,
}

/// Safe grid points used to initialize optimizers
#[derive(Clone, Debug, PartialEq)]
pub struct SafeSeeds {
    /// Indices within grid points
    pub indices: Vec<usize>,
    /// Seed locations as a (n, 2) matrix
    pub x: Array2<f64>,
    /// Seed values
    pub y: Array1<f64>,
}

impl SafeSeeds {
    /// Number of seeds
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether there is no seed
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Problem builder
pub struct ProblemBuilder<O = TestFn> {
    name: String,
    fun: O,
    bounds: Array2<f64>,
    percentile: f64,
    default_safe_seeds: Vec<usize>,
    n_steps: usize,
}

impl<O: Fn(&ArrayView1<f64>) -> f64> ProblemBuilder<O> {
    /// Start building the problem `name` maximizing `fun` within `bounds`
    /// given as `[[x_1 lower, x_1 upper], [x_2 lower, x_2 upper]]`.
    pub fn new(
        name: impl Into<String>,
        fun: O,
        bounds: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Self {
        ProblemBuilder {
            name: name.into(),
            fun,
            bounds: bounds.to_owned(),
            percentile: 0.75,
            default_safe_seeds: vec![],
            n_steps: DEFAULT_GRID_STEPS,
        }
    }

    /// Sets the percentile of grid values used as safety threshold
    pub fn percentile(mut self, percentile: f64) -> Self {
        self.percentile = percentile;
        self
    }

    /// Sets the grid indices returned by [Problem::default_safe_seeds]
    pub fn default_safe_seeds(mut self, indices: &[usize]) -> Self {
        self.default_safe_seeds = indices.to_vec();
        self
    }

    /// Sets the grid resolution by axis
    pub fn n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    /// Evaluate the grid and build the problem.
    ///
    /// *Panics* if bounds are not two `(lower, upper)` rows with `lower < upper`
    /// or if `n_steps < 2`. Fails if grid values or gradients are not finite.
    pub fn build(self) -> Result<Problem<O>> {
        if !(0. ..0.9).contains(&self.percentile) {
            return Err(BenchError::InvalidPercentile(self.percentile));
        }

        let grid = Grid::new(&self.bounds, self.n_steps).evaluate(&self.fun);
        let safe_threshold = quantile(&grid.y, self.percentile)?;
        info!("Safe threshold ({}) = {}", self.percentile, safe_threshold);
        let lipschitz = grid.lipschitz_estimate()?;
        info!("Lipschitz constant = {lipschitz}");

        let index = grid.argmax();
        let optimum = Optimum {
            index,
            x: grid.x_matrix.row(index).to_owned(),
            y: grid.y[index],
        };
        let evaluated = (self.fun)(&optimum.x.view());
        if evaluated != optimum.y {
            return Err(BenchError::OptimumMismatch {
                stored: optimum.y,
                evaluated,
            });
        }
        if optimum.y < safe_threshold {
            return Err(BenchError::UnsafeOptimum {
                y: optimum.y,
                threshold: safe_threshold,
            });
        }

        Ok(Problem {
            name: self.name,
            fun: self.fun,
            percentile: self.percentile,
            grid,
            safe_threshold,
            lipschitz,
            optimum,
            default_safe_seeds: self.default_safe_seeds,
            n_evaluations: 0,
            n_unsafe: 0,
        })
    }
}

/// A safe maximization problem
///
/// The objective is meant to be evaluated through [Problem::evaluate]
/// which counts evaluations and safety violations.
pub struct Problem<O = TestFn> {
    name: String,
    fun: O,
    percentile: f64,
    grid: GridData<f64>,
    safe_threshold: f64,
    lipschitz: f64,
    optimum: Optimum,
    default_safe_seeds: Vec<usize>,
    n_evaluations: usize,
    n_unsafe: usize,
}

impl<O: Fn(&ArrayView1<f64>) -> f64> Problem<O> {
    /// Build the problem `name` with default grid resolution
    pub fn new(
        name: impl Into<String>,
        fun: O,
        bounds: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        percentile: f64,
        default_safe_seeds: &[usize],
    ) -> Result<Self> {
        ProblemBuilder::new(name, fun, bounds)
            .percentile(percentile)
            .default_safe_seeds(default_safe_seeds)
            .build()
    }

    /// Problem name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input dimension
    pub fn xdim(&self) -> usize {
        self.grid.x_matrix.ncols()
    }

    /// Percentile used as safety threshold
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// Evaluated grid
    pub fn grid(&self) -> &GridData<f64> {
        &self.grid
    }

    /// Grid points as a (n, 2) matrix
    pub fn x_matrix(&self) -> &Array2<f64> {
        &self.grid.x_matrix
    }

    /// Objective values at grid points
    pub fn y(&self) -> &Array1<f64> {
        &self.grid.y
    }

    /// Values below this threshold are unsafe
    pub fn safe_threshold(&self) -> f64 {
        self.safe_threshold
    }

    /// Lipschitz constant estimate of the objective
    pub fn lipschitz(&self) -> f64 {
        self.lipschitz
    }

    /// Grid maximum
    pub fn optimum(&self) -> &Optimum {
        &self.optimum
    }

    /// Grid maximum location
    pub fn optimal_x(&self) -> ArrayView1<'_, f64> {
        self.optimum.x.view()
    }

    /// Grid maximum value
    pub fn optimal_y(&self) -> f64 {
        self.optimum.y
    }

    /// Number of evaluations since last counters reset
    pub fn n_evaluations(&self) -> usize {
        self.n_evaluations
    }

    /// Number of unsafe evaluations since last counters reset
    pub fn n_unsafe(&self) -> usize {
        self.n_unsafe
    }

    /// Whether `y` is safe
    pub fn is_safe(&self, y: f64) -> bool {
        y >= self.safe_threshold
    }

    /// Reset evaluation counters
    pub fn reset_counters(&mut self) {
        self.n_evaluations = 0;
        self.n_unsafe = 0;
    }

    /// Evaluate the objective at `x` updating counters
    pub fn evaluate(&mut self, x: &ArrayView1<f64>) -> f64 {
        self.n_evaluations += 1;
        let y = (self.fun)(x);
        if !self.is_safe(y) {
            self.n_unsafe += 1;
        }
        y
    }

    /// Seeds given by the `n` first default indices
    pub fn default_safe_seeds(&self, n: usize) -> Result<SafeSeeds> {
        if n == 0 || n > self.default_safe_seeds.len() {
            return Err(BenchError::NotEnoughSeeds {
                requested: n,
                available: self.default_safe_seeds.len(),
            });
        }
        let indices = self.default_safe_seeds[..n].to_vec();
        if let Some(&index) = indices.iter().find(|&&i| i >= self.grid.len()) {
            return Err(BenchError::InvalidValue(format!(
                "Default seed index {} out of grid of {} points",
                index,
                self.grid.len()
            )));
        }
        self.gather_seeds(indices)
    }

    /// `n` seeds drawn without replacement among grid points with values
    /// between the safety threshold and the top decile
    pub fn uniform_safe_seeds<R: Rng>(&self, rng: &mut R, n: usize) -> Result<SafeSeeds> {
        let upper = quantile(&self.grid.y, SEEDS_UPPER_QUANTILE)?;
        let band: Vec<usize> = self
            .grid
            .y
            .iter()
            .enumerate()
            .filter(|&(_, &y)| y > self.safe_threshold && y < upper)
            .map(|(i, _)| i)
            .collect();
        if band.is_empty() {
            return Err(BenchError::EmptySafeRegion(self.safe_threshold, upper));
        }
        if n == 0 || n > band.len() {
            return Err(BenchError::NotEnoughSeeds {
                requested: n,
                available: band.len(),
            });
        }
        let indices = index::sample(rng, band.len(), n)
            .into_iter()
            .map(|k| band[k])
            .collect();
        self.gather_seeds(indices)
    }

    fn gather_seeds(&self, indices: Vec<usize>) -> Result<SafeSeeds> {
        let x = self.grid.x_matrix.select(Axis(0), &indices);
        let y = self.grid.y.select(Axis(0), &indices);
        info!("Safe seeds:\n X = {x}\n y = {y}\n idx = {indices:?}");
        if let Some((&index, &y)) = indices
            .iter()
            .zip(y.iter())
            .find(|&(_, &y)| !self.is_safe(y))
        {
            return Err(BenchError::UnsafeSeed {
                index,
                y,
                threshold: self.safe_threshold,
            });
        }
        Ok(SafeSeeds { indices, x, y })
    }
}
