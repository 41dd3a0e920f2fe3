//! Benchmark objective functions to be maximized and the problems built upon them.
use crate::errors::Result;
use crate::problem::{Problem, ProblemBuilder};

use clap::ValueEnum;
use ndarray::{array, s, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Function type of benchmark objectives
pub type TestFn = fn(&ArrayView1<f64>) -> f64;

/// Concave quadratic with maximum 100 reached at (-1, -2)
pub fn sphere(x: &ArrayView1<f64>) -> f64 {
    let x_opt = array![-1., -2.];
    100. - (x - &x_opt).mapv(|v| v * v).sum()
}

/// Rosenbrock function shifted by one, log-transformed to get a smaller
/// Lipschitz constant and flipped to be maximized: `100 - ln(r(x + 1))`
/// where `r` is the classic Rosenbrock valley.
pub fn rosenbrock(x: &ArrayView1<f64>) -> f64 {
    let z = x.mapv(|v| v + 1.);
    let head = z.slice(s![..-1]);
    let tail = z.slice(s![1..]);
    let r = ndarray::Zip::from(&head)
        .and(&tail)
        .fold(0., |acc, &zi, &zn| {
            acc + 100. * (zn - zi * zi).powi(2) + (1. - zi).powi(2)
        });
    100. - r.ln()
}

const SPHERE_DEFAULT_SEEDS: [usize; 10] = [
    18643, 118129, 18766, 101797, 64078, 63071, 108293, 19281, 29693, 125759,
];

const SHIFTED_SPHERE_DEFAULT_SEEDS: [usize; 10] = [
    86225, 199784, 86241, 180581, 137070, 136068, 188095, 86672, 96619, 209639,
];

/// Built-in benchmark problems
///
/// Default seeds are grid indices valid with the default grid resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum BenchmarkProblem {
    /// Sphere over [-5, 5]^2 with the 0.75 percentile as safety threshold
    #[serde(rename = "sphere_2D_75")]
    #[value(name = "sphere_2D_75")]
    Sphere2d75,
    /// Sphere over [-5, 5] x [-8, 2] with the 0.75 percentile as safety threshold
    #[serde(rename = "shifted_sphere_2D_75")]
    #[value(name = "shifted_sphere_2D_75")]
    ShiftedSphere2d75,
    /// Rosenbrock over [-3, 3]^2 with the median as safety threshold, without default seeds
    #[serde(rename = "rosenbrock_2D_50")]
    #[value(name = "rosenbrock_2D_50")]
    Rosenbrock2d50,
}

impl BenchmarkProblem {
    /// Name used in result file names
    pub fn name(&self) -> &'static str {
        match self {
            BenchmarkProblem::Sphere2d75 => "sphere_2D_75",
            BenchmarkProblem::ShiftedSphere2d75 => "shifted_sphere_2D_75",
            BenchmarkProblem::Rosenbrock2d50 => "rosenbrock_2D_50",
        }
    }

    /// Problem builder with default settings
    pub fn builder(&self) -> ProblemBuilder<TestFn> {
        match self {
            BenchmarkProblem::Sphere2d75 => {
                ProblemBuilder::new(self.name(), sphere as TestFn, &array![[-5., 5.], [-5., 5.]])
                    .percentile(0.75)
                    .default_safe_seeds(&SPHERE_DEFAULT_SEEDS)
            }
            BenchmarkProblem::ShiftedSphere2d75 => {
                ProblemBuilder::new(self.name(), sphere as TestFn, &array![[-5., 5.], [-8., 2.]])
                    .percentile(0.75)
                    .default_safe_seeds(&SHIFTED_SPHERE_DEFAULT_SEEDS)
            }
            BenchmarkProblem::Rosenbrock2d50 => ProblemBuilder::new(
                self.name(),
                rosenbrock as TestFn,
                &array![[-3., 3.], [-3., 3.]],
            )
            .percentile(0.5),
        }
    }

    /// Build the problem evaluated on a grid of `n_steps` per axis
    pub fn build(&self, n_steps: usize) -> Result<Problem<TestFn>> {
        self.builder().n_steps(n_steps).build()
    }
}

impl fmt::Display for BenchmarkProblem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sphere() {
        assert_abs_diff_eq!(sphere(&array![-1., -2.].view()), 100.);
        assert_abs_diff_eq!(sphere(&array![0., 0.].view()), 95.);
    }

    #[test]
    fn test_rosenbrock() {
        // z = (1, 3): r = 100 * (3 - 1)^2 + 0
        assert_abs_diff_eq!(rosenbrock(&array![0., 2.].view()), 100. - 400f64.ln());
        // z = (0, 0): r = 1
        assert_abs_diff_eq!(rosenbrock(&array![-1., -1.].view()), 100.);
    }

    #[test]
    fn test_problem_names() {
        assert_eq!(BenchmarkProblem::Sphere2d75.to_string(), "sphere_2D_75");
        let p: BenchmarkProblem = serde_json::from_str("\"rosenbrock_2D_50\"").unwrap();
        assert_eq!(p, BenchmarkProblem::Rosenbrock2d50);
    }
}
