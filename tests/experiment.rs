use approx::assert_abs_diff_eq;
use safebench::{
    Algorithm, BenchError, BenchmarkProblem, ExperimentConfig, ExperimentRunner, SeedSelection,
    DEFAULT_GRID_STEPS,
};
use std::fs;

#[test]
fn test_sphere_2d_75_setup() {
    let problem = BenchmarkProblem::Sphere2d75
        .build(DEFAULT_GRID_STEPS)
        .expect("problem built");
    assert_eq!(problem.x_matrix().nrows(), 500 * 500);
    // 25% of the [-5, 5]^2 area lies within the disk of radius sqrt(25 / pi)
    assert_abs_diff_eq!(problem.safe_threshold(), 92.01, epsilon = 0.05);
    // on the x_2 = 5 boundary
    assert_abs_diff_eq!(problem.lipschitz(), 13.98, epsilon = 0.01);
    assert_abs_diff_eq!(problem.optimal_y(), 100., epsilon = 1e-3);

    let seeds = problem.default_safe_seeds(10).expect("safe seeds");
    assert_eq!(seeds.len(), 10);
    assert!(seeds.y.iter().all(|&y| problem.is_safe(y)));
}

#[test]
fn test_shifted_sphere_setup() {
    let problem = BenchmarkProblem::ShiftedSphere2d75
        .build(DEFAULT_GRID_STEPS)
        .expect("problem built");
    assert_abs_diff_eq!(problem.lipschitz(), 11.98, epsilon = 0.01);
    assert!(problem.default_safe_seeds(10).is_ok());
}

#[test]
fn test_rosenbrock_has_no_default_seeds() {
    let problem = BenchmarkProblem::Rosenbrock2d50.build(50).expect("problem built");
    assert!(matches!(
        problem.default_safe_seeds(1),
        Err(BenchError::NotEnoughSeeds { available: 0, .. })
    ));
}

#[test]
fn test_coarse_experiment() {
    let outdir = std::env::temp_dir().join("safebench-coarse-experiment");
    let mut problem = BenchmarkProblem::Rosenbrock2d50.build(30).expect("problem built");
    let runner = ExperimentRunner::new(
        ExperimentConfig::default()
            .n_evals(6)
            .n_reps(2)
            .n_seeds(&[1, 3])
            .seeding(SeedSelection::Uniform)
            .outdir(&outdir),
    )
    .expect("valid configuration");
    let summaries = runner.run(&mut problem).expect("experiment run");

    assert_eq!(summaries.len(), 4);
    for summary in summaries.iter() {
        assert_eq!(summary.trials.len(), 2);
        for trial in summary.trials.iter() {
            assert_eq!(trial.steps.len(), 6);
            assert_eq!(trial.n_evaluations, 6);
            assert_eq!(trial.n_seeds, summary.n_seeds);
        }
        let content = fs::read_to_string(&summary.path).expect("results file");
        assert_eq!(content.lines().count(), 1 + 2 * 6);
    }
    assert!(outdir
        .join(format!(
            "results-{}-rosenbrock_2D_50-nseeds=3.csv",
            Algorithm::SafeOptMod
        ))
        .exists());
}
