/*!
This library evaluates benchmark functions on a regular grid of a two-dimensional
design space, the ground truth used to build safe optimization test problems.

A design space is defined as a 2D ndarray `(2, 2)`, specifying lower bound and upper bound
of each of the two components of the samples `x`. The grid is the full factorial design
with `n_steps` evenly spaced levels by component.

Example:
```
use safebench_doe::{Grid, eval_on_grid, estimate_lipschitz};
use ndarray::{arr2, ArrayView1};

fn plane(x: &ArrayView1<f64>) -> f64 {
    3. * x[0] - 2. * x[1]
}

// Design space is defined as [-5., 5.] x [-5., 5.]
let xlimits = arr2(&[[-5., 5.], [-5., 5.]]);
let grid = Grid::new(&xlimits, 11).evaluate(plane);
assert_eq!(grid.x_matrix.nrows(), 121);

// or else in one go
let grid = eval_on_grid(plane, &xlimits, 11);
let lipschitz = estimate_lipschitz(plane, &xlimits, 11).unwrap();
assert!((lipschitz - 3.).abs() < 1e-9);
```

From the evaluated grid are derived:
* a [linear-interpolated quantile](crate::quantile) of the values, used as safety threshold,
* a [Lipschitz constant estimate](crate::GridData::lipschitz_estimate) given by
  the maximum of absolute discrete [gradients](crate::gradient).
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod errors;
mod grid;
mod utils;

pub use errors::*;
pub use grid::*;
pub use utils::*;
