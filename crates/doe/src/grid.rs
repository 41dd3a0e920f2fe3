use crate::errors::{DoeError, Result};
use crate::utils::gradient;
use linfa::Float;
use ndarray::{Array, Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix2, Zip};
use ndarray_stats::QuantileExt;

/// The Grid design consists of all combinations of `n_steps` evenly spaced
/// levels for both components of a two-dimensional design space.
#[derive(Clone, Debug)]
pub struct Grid<F: Float> {
    /// Design space definition as
    /// The ith row is the [lower_bound, upper_bound] of xi, the ith component of a sample x
    xlimits: Array2<F>,
    /// Number of levels by component
    n_steps: usize,
}

impl<F: Float> Grid<F> {
    /// Constructor given a design space given a (2, 2) matrix \[\[lower bound, upper bound\], ...\]
    /// and the number of levels by component.
    ///
    /// ```
    /// use safebench_doe::Grid;
    /// use ndarray::arr2;
    ///
    /// let grid = Grid::new(&arr2(&[[0.0, 1.0], [5.0, 10.0]]), 500);
    /// ```
    ///
    /// **Panics** if xlimits is not a (2, 2) matrix, if a lower bound is not strictly
    /// less than its upper bound or if `n_steps` is less than 2.
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>, n_steps: usize) -> Self {
        if xlimits.ncols() != 2 {
            panic!("xlimits must have 2 columns (lower, upper)");
        }
        if xlimits.nrows() != 2 {
            panic!(
                "grid is defined on a 2D design space, got {} components",
                xlimits.nrows()
            );
        }
        for bounds in xlimits.rows() {
            if !(bounds[0] < bounds[1]) {
                panic!(
                    "lower bound must be less than upper bound, got [{}, {}]",
                    bounds[0], bounds[1]
                );
            }
        }
        if n_steps < 2 {
            panic!("grid requires at least 2 steps by component, got {n_steps}");
        }
        Grid {
            xlimits: xlimits.to_owned(),
            n_steps,
        }
    }

    /// Design space definition
    pub fn xlimits(&self) -> &Array2<F> {
        &self.xlimits
    }

    /// Number of levels by component
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Evenly spaced levels of the ith component
    pub fn axis(&self, i: usize) -> Array1<F> {
        Array::linspace(self.xlimits[[i, 0]], self.xlimits[[i, 1]], self.n_steps)
    }

    /// Grid points as a (n_steps * n_steps, 2) matrix.
    ///
    /// The first component varies fastest: row `i * n_steps + j` is `(x_1[j], x_2[i])`.
    pub fn points(&self) -> Array2<F> {
        let (x_1, x_2) = (self.axis(0), self.axis(1));
        let n = self.n_steps;
        Array2::from_shape_fn((n * n, 2), |(k, c)| {
            if c == 0 {
                x_1[k % n]
            } else {
                x_2[k / n]
            }
        })
    }

    /// Evaluate `fun` at every grid point
    pub fn evaluate<O: Fn(&ArrayView1<F>) -> F>(&self, fun: O) -> GridData<F> {
        let x_matrix = self.points();
        let mut y = Array1::zeros(x_matrix.nrows());
        Zip::from(&mut y)
            .and(x_matrix.rows())
            .for_each(|yi, xi| *yi = fun(&xi));
        GridData {
            x_1: self.axis(0),
            x_2: self.axis(1),
            x_matrix,
            y,
            n_steps: self.n_steps,
        }
    }
}

/// Objective function values at every point of a [Grid]
#[derive(Clone, Debug)]
pub struct GridData<F: Float> {
    /// Levels of the first component
    pub x_1: Array1<F>,
    /// Levels of the second component
    pub x_2: Array1<F>,
    /// Grid points (n_steps * n_steps, 2), first component varies fastest
    pub x_matrix: Array2<F>,
    /// Function values, `y[k]` is the value at `x_matrix.row(k)`
    pub y: Array1<F>,
    n_steps: usize,
}

impl<F: Float> GridData<F> {
    /// Number of levels by component
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Number of grid points
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Always false as a grid has at least 2x2 points
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Values as a (n_steps, n_steps) matrix: axis 0 runs along `x_2`, axis 1 along `x_1`
    pub fn values_2d(&self) -> Array2<F> {
        let n = self.n_steps;
        Array2::from_shape_fn((n, n), |(i, j)| self.y[i * n + j])
    }

    /// Discrete gradients of the values wrt `x_1` and `x_2` respectively,
    /// both given as (n_steps, n_steps) matrices laid out as [GridData::values_2d]
    pub fn gradients(&self) -> (Array2<F>, Array2<F>) {
        let values = self.values_2d();
        let dx_1 = gradient(&values, &self.x_1, Axis(1));
        let dx_2 = gradient(&values, &self.x_2, Axis(0));
        (dx_1, dx_2)
    }

    /// Lipschitz constant estimate as the maximum absolute discrete gradient
    /// over both components.
    ///
    /// This is an approximation from finite differences on the grid,
    /// not a guaranteed bound of the function rate of change.
    /// Fails if a gradient is not finite.
    pub fn lipschitz_estimate(&self) -> Result<F> {
        let (dx_1, dx_2) = self.gradients();
        let max_abs = |g: Array2<F>, name: &str| -> Result<F> {
            if let Some(k) = g.iter().position(|v| !v.is_finite()) {
                return Err(DoeError::NonFiniteValue(format!(
                    "gradient wrt {name} at grid index {k}"
                )));
            }
            Ok(*g.mapv(|v| v.abs()).max()?)
        };
        Ok(F::max(max_abs(dx_1, "x_1")?, max_abs(dx_2, "x_2")?))
    }

    /// Index of the grid point with the maximal value (first one on ties)
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (k, v) in self.y.iter().enumerate() {
            if *v > self.y[best] {
                best = k;
            }
        }
        best
    }
}

/// Evaluate `fun` on a regular grid of `n_steps` by component within `xlimits`
pub fn eval_on_grid<F: Float, O: Fn(&ArrayView1<F>) -> F>(
    fun: O,
    xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>,
    n_steps: usize,
) -> GridData<F> {
    Grid::new(xlimits, n_steps).evaluate(fun)
}

/// Estimate Lipschitz constant of `fun` within `xlimits` using discrete gradients
/// on a regular grid of `n_steps` by component (see [GridData::lipschitz_estimate])
pub fn estimate_lipschitz<F: Float, O: Fn(&ArrayView1<F>) -> F>(
    fun: O,
    xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>,
    n_steps: usize,
) -> Result<F> {
    eval_on_grid(fun, xlimits, n_steps).lipschitz_estimate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr2, array};

    fn sphere(x: &ArrayView1<f64>) -> f64 {
        100. - (x[0] + 1.).powi(2) - (x[1] + 2.).powi(2)
    }

    fn plane(x: &ArrayView1<f64>) -> f64 {
        3. * x[0] - 2. * x[1]
    }

    fn sum(x: &ArrayView1<f64>) -> f64 {
        x[0] + x[1]
    }

    #[test]
    fn test_grid_points() {
        let xlimits = arr2(&[[0., 1.], [10., 20.]]);
        let expected = array![
            [0., 10.],
            [0.5, 10.],
            [1., 10.],
            [0., 15.],
            [0.5, 15.],
            [1., 15.],
            [0., 20.],
            [0.5, 20.],
            [1., 20.],
        ];
        let actual = Grid::new(&xlimits, 3).points();
        assert_abs_diff_eq!(expected, actual, epsilon = 1e-12);
    }

    #[test]
    fn test_eval_on_grid() {
        let xlimits = arr2(&[[-5., 5.], [-5., 5.]]);
        let grid = eval_on_grid(sphere, &xlimits, 50);
        assert_eq!(grid.x_1.len(), 50);
        assert_eq!(grid.x_2.len(), 50);
        assert_eq!(grid.x_matrix.nrows(), 50 * 50);
        assert_eq!(grid.y.len(), grid.x_matrix.nrows());
        Zip::from(&grid.y)
            .and(grid.x_matrix.rows())
            .for_each(|y, x| assert_eq!(*y, sphere(&x)));
    }

    #[test]
    fn test_values_2d_layout() {
        let xlimits = arr2(&[[0., 1.], [10., 20.]]);
        let grid = eval_on_grid(sum, &xlimits, 3);
        let values = grid.values_2d();
        // row i follows x_2[i], column j follows x_1[j]
        assert_abs_diff_eq!(values[[0, 2]], 11., epsilon = 1e-12);
        assert_abs_diff_eq!(values[[2, 0]], 20., epsilon = 1e-12);
    }

    #[test]
    fn test_lipschitz_of_plane() {
        let xlimits = arr2(&[[-5., 5.], [-3., 3.]]);
        let grid = eval_on_grid(plane, &xlimits, 20);
        let (dx_1, dx_2) = grid.gradients();
        assert_abs_diff_eq!(dx_1, Array2::from_elem((20, 20), 3.), epsilon = 1e-9);
        assert_abs_diff_eq!(dx_2, Array2::from_elem((20, 20), -2.), epsilon = 1e-9);
        assert_abs_diff_eq!(
            estimate_lipschitz(plane, &xlimits, 20).unwrap(),
            3.,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_lipschitz_of_sphere() {
        let xlimits = arr2(&[[-5., 5.], [-5., 5.]]);
        let lipschitz = estimate_lipschitz(sphere, &xlimits, 500).unwrap();
        // max |df/dx_2| = 2 * |5 + 2| reached on the boundary
        assert_abs_diff_eq!(lipschitz, 14., epsilon = 5e-2);
    }

    #[test]
    fn test_lipschitz_of_singular_function() {
        // infinite at the origin, a grid point for odd n_steps
        fn singular(x: &ArrayView1<f64>) -> f64 {
            -(x[0] * x[0] + x[1] * x[1]).ln()
        }
        let xlimits = arr2(&[[-1., 1.], [-1., 1.]]);
        assert!(matches!(
            estimate_lipschitz(singular, &xlimits, 5),
            Err(DoeError::NonFiniteValue(_))
        ));
        assert!(estimate_lipschitz(singular, &xlimits, 4).is_ok());
    }

    #[test]
    fn test_argmax() {
        let xlimits = arr2(&[[-5., 5.], [-5., 5.]]);
        let grid = eval_on_grid(sphere, &xlimits, 101);
        let k = grid.argmax();
        assert_abs_diff_eq!(grid.x_matrix.row(k), array![-1., -2.], epsilon = 1e-9);
        assert_abs_diff_eq!(grid.y[k], 100., epsilon = 1e-9);
    }

    #[test]
    #[should_panic]
    fn test_bad_bounds() {
        Grid::new(&arr2(&[[5., -5.], [-5., 5.]]), 10);
    }

    #[test]
    #[should_panic]
    fn test_bad_dimension() {
        Grid::new(&arr2(&[[-5., 5.], [-5., 5.], [-5., 5.]]), 10);
    }

    #[test]
    #[should_panic]
    fn test_too_few_steps() {
        Grid::new(&arr2(&[[-5., 5.], [-5., 5.]]), 1);
    }
}
