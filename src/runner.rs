//! Benchmark experiments: SafeOpt variants are run repeatedly for several seed
//! numbers on a problem, and the trajectories of all repetitions are saved
//! in one CSV file by (algorithm, seed number) with header `t,y,rep`.
use crate::driver::{Algorithm, Kernel, SafeOptDriver, Trial};
use crate::errors::{BenchError, Result};
use crate::problem::Problem;

use clap::ValueEnum;
use log::info;
use ndarray::ArrayView1;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Strategy used to pick the safe seeds of a trial
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SeedSelection {
    /// First default seeds of the problem, identical for every repetition
    #[default]
    Default,
    /// Seeds drawn at random with the repetition random generator
    Uniform,
}

/// Experiment configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Evaluation budget of each trial
    pub n_evals: usize,
    /// Number of repetitions by (algorithm, seed number)
    pub n_reps: usize,
    /// Seed numbers
    pub n_seeds: Vec<usize>,
    /// Algorithm variants
    pub algorithms: Vec<Algorithm>,
    /// Seed selection strategy
    pub seeding: SeedSelection,
    /// GP kernel
    pub kernel: Kernel,
    /// Directory where result files are written
    pub outdir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            n_evals: 100,
            n_reps: 10,
            n_seeds: vec![1, 5, 10],
            algorithms: vec![Algorithm::SafeOpt, Algorithm::SafeOptMod],
            seeding: SeedSelection::Default,
            kernel: Kernel::SquaredExponential,
            outdir: PathBuf::from("."),
        }
    }
}

impl ExperimentConfig {
    /// Sets evaluation budget
    pub fn n_evals(mut self, n_evals: usize) -> Self {
        self.n_evals = n_evals;
        self
    }

    /// Sets repetitions number
    pub fn n_reps(mut self, n_reps: usize) -> Self {
        self.n_reps = n_reps;
        self
    }

    /// Sets seed numbers
    pub fn n_seeds(mut self, n_seeds: &[usize]) -> Self {
        self.n_seeds = n_seeds.to_vec();
        self
    }

    /// Sets algorithm variants
    pub fn algorithms(mut self, algorithms: &[Algorithm]) -> Self {
        self.algorithms = algorithms.to_vec();
        self
    }

    /// Sets seed selection strategy
    pub fn seeding(mut self, seeding: SeedSelection) -> Self {
        self.seeding = seeding;
        self
    }

    /// Sets GP kernel
    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Sets output directory
    pub fn outdir(mut self, outdir: impl Into<PathBuf>) -> Self {
        self.outdir = outdir.into();
        self
    }

    /// Read a JSON configuration file, missing fields take default values
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check the configuration and return it if valid
    pub fn check(self) -> Result<Self> {
        if self.n_reps == 0 {
            return Err(BenchError::InvalidConfigError(
                "at least one repetition required".to_string(),
            ));
        }
        if self.algorithms.is_empty() || self.n_seeds.is_empty() {
            return Err(BenchError::InvalidConfigError(
                "algorithms and seed numbers cannot be empty".to_string(),
            ));
        }
        if let Some(&n_seeds) = self.n_seeds.iter().find(|&&n| n >= self.n_evals) {
            return Err(BenchError::InsufficientBudget {
                n_evals: self.n_evals,
                n_seeds,
            });
        }
        Ok(self)
    }
}

/// Summary of the repetitions of one (algorithm, seed number) pair
#[derive(Clone, Debug)]
pub struct SweepSummary {
    /// Algorithm variant
    pub algorithm: Algorithm,
    /// Seed number
    pub n_seeds: usize,
    /// Written result file
    pub path: PathBuf,
    /// Mean number of unsafe evaluations by trial
    pub mean_unsafe: f64,
    /// Mean of the best value observed by trial
    pub mean_best_y: f64,
    /// Trials in repetition order
    pub trials: Vec<Trial>,
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} nseeds={} reps={}: mean unsafe = {}, mean best y = {} ({})",
            self.algorithm,
            self.n_seeds,
            self.trials.len(),
            self.mean_unsafe,
            self.mean_best_y,
            self.path.display()
        )
    }
}

#[derive(Serialize)]
struct ResultRow {
    t: usize,
    y: f64,
    rep: usize,
}

/// Result file name of the given (algorithm, problem, seed number)
pub fn results_filename(algorithm: Algorithm, problem: &str, n_seeds: usize) -> String {
    format!("results-{algorithm}-{problem}-nseeds={n_seeds}.csv")
}

/// Write `trials` trajectories as `t,y,rep` rows, `rep` being
/// the position of the trial starting from 1
pub fn write_results(path: impl AsRef<Path>, trials: &[Trial]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (r, trial) in trials.iter().enumerate() {
        for step in trial.steps.iter() {
            writer.serialize(ResultRow {
                t: step.t,
                y: step.y,
                rep: r + 1,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Experiment runner
pub struct ExperimentRunner {
    config: ExperimentConfig,
}

impl ExperimentRunner {
    /// Runner with the given configuration
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        Ok(ExperimentRunner {
            config: config.check()?,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run repetition `rep` of `algorithm` starting from `n_seeds` seeds.
    ///
    /// The random generator of the repetition is seeded with `rep`.
    pub fn run_trial<O: Fn(&ArrayView1<f64>) -> f64>(
        &self,
        problem: &mut Problem<O>,
        algorithm: Algorithm,
        n_seeds: usize,
        rep: usize,
    ) -> Result<Trial> {
        let mut rng = Xoshiro256Plus::seed_from_u64(rep as u64);
        problem.reset_counters();
        let seeds = match self.config.seeding {
            SeedSelection::Default => problem.default_safe_seeds(n_seeds)?,
            SeedSelection::Uniform => problem.uniform_safe_seeds(&mut rng, n_seeds)?,
        };
        SafeOptDriver::new(algorithm)
            .kernel(self.config.kernel)
            .run(problem, &seeds, self.config.n_evals)
    }

    /// Run every (algorithm, seed number) sweep and write result files
    pub fn run<O: Fn(&ArrayView1<f64>) -> f64>(
        &self,
        problem: &mut Problem<O>,
    ) -> Result<Vec<SweepSummary>> {
        fs::create_dir_all(&self.config.outdir)?;
        let mut summaries = vec![];
        for &algorithm in self.config.algorithms.iter() {
            for &n_seeds in self.config.n_seeds.iter() {
                let trials = (0..self.config.n_reps)
                    .map(|r| self.run_trial(problem, algorithm, n_seeds, r))
                    .collect::<Result<Vec<_>>>()?;

                let path = self.config.outdir.join(results_filename(
                    algorithm,
                    problem.name(),
                    n_seeds,
                ));
                write_results(&path, &trials)?;

                let n = trials.len() as f64;
                let mean_unsafe = trials.iter().map(|t| t.n_unsafe as f64).sum::<f64>() / n;
                let mean_best_y = trials
                    .iter()
                    .filter_map(|t| t.best_y())
                    .sum::<f64>()
                    / n;
                let summary = SweepSummary {
                    algorithm,
                    n_seeds,
                    path,
                    mean_unsafe,
                    mean_best_y,
                    trials,
                };
                info!("{summary}");
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ProblemBuilder;
    use crate::test_functions::{sphere, TestFn};
    use ndarray::array;

    fn coarse_sphere() -> Problem<TestFn> {
        ProblemBuilder::new("sphere", sphere as TestFn, &array![[-5., 5.], [-5., 5.]])
            .default_safe_seeds(&[7 * 26 + 10, 7 * 26 + 11, 8 * 26 + 10])
            .n_steps(26)
            .build()
            .expect("problem built")
    }

    #[test]
    fn test_results_filename() {
        assert_eq!(
            results_filename(Algorithm::SafeOptMod, "sphere_2D_75", 5),
            "results-SafeOptMod-sphere_2D_75-nseeds=5.csv"
        );
    }

    #[test]
    fn test_config_check() {
        assert!(ExperimentConfig::default().check().is_ok());
        assert!(matches!(
            ExperimentConfig::default().n_evals(10).check(),
            Err(BenchError::InsufficientBudget { n_seeds: 10, .. })
        ));
        assert!(ExperimentConfig::default().n_reps(0).check().is_err());
        assert!(ExperimentConfig::default().algorithms(&[]).check().is_err());
    }

    #[test]
    fn test_config_json() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"n_evals": 20, "algorithms": ["SafeOptMod"], "seeding": "Uniform"}"#)
                .unwrap();
        assert_eq!(config.n_evals, 20);
        assert_eq!(config.algorithms, vec![Algorithm::SafeOptMod]);
        assert_eq!(config.seeding, SeedSelection::Uniform);
        assert_eq!(config.n_reps, 10);
    }

    #[test]
    fn test_uniform_trials_are_reproducible() {
        let mut problem = coarse_sphere();
        let runner = ExperimentRunner::new(
            ExperimentConfig::default()
                .n_evals(4)
                .n_seeds(&[2])
                .seeding(SeedSelection::Uniform),
        )
        .unwrap();
        let first = runner
            .run_trial(&mut problem, Algorithm::SafeOptMod, 2, 3)
            .unwrap();
        let again = runner
            .run_trial(&mut problem, Algorithm::SafeOptMod, 2, 3)
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(problem.n_evaluations(), 4);
    }

    #[test]
    fn test_run_writes_all_repetitions() {
        let outdir = std::env::temp_dir().join("safebench-runner-test");
        let mut problem = coarse_sphere();
        let runner = ExperimentRunner::new(
            ExperimentConfig::default()
                .n_evals(4)
                .n_reps(3)
                .n_seeds(&[1, 2])
                .algorithms(&[Algorithm::SafeOpt])
                .outdir(&outdir),
        )
        .unwrap();
        let summaries = runner.run(&mut problem).expect("experiment run");
        assert_eq!(summaries.len(), 2);

        let summary = &summaries[1];
        assert_eq!(summary.n_seeds, 2);
        assert_eq!(
            summary.path,
            outdir.join("results-SafeOpt-sphere-nseeds=2.csv")
        );
        let content = fs::read_to_string(&summary.path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "t,y,rep");
        assert_eq!(lines.len(), 1 + 3 * 4);
        assert!(lines[1].starts_with("1,"));
        assert!(lines[1].ends_with(",1"));
        assert!(lines[12].starts_with("4,"));
        assert!(lines[12].ends_with(",3"));
    }
}
