use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use safebench::{
    Algorithm, BenchmarkProblem, ExperimentConfig, ExperimentRunner, Kernel, SeedSelection,
    DEFAULT_GRID_STEPS,
};
use std::path::PathBuf;

/// Run safe Bayesian optimization benchmarks and write trajectories as CSV files
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Benchmark problem
    #[arg(long, value_enum, default_value_t = BenchmarkProblem::Sphere2d75)]
    problem: BenchmarkProblem,

    /// JSON experiment configuration, command line options take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Algorithm variants
    #[arg(long, value_enum, value_delimiter = ',')]
    algorithms: Option<Vec<Algorithm>>,

    /// Seed numbers
    #[arg(long, value_delimiter = ',')]
    n_seeds: Option<Vec<usize>>,

    /// Repetitions by (algorithm, seed number)
    #[arg(long)]
    n_reps: Option<usize>,

    /// Evaluation budget of each trial
    #[arg(long)]
    n_evals: Option<usize>,

    /// Seed selection strategy
    #[arg(long, value_enum)]
    seeding: Option<SeedSelection>,

    /// GP kernel
    #[arg(long, value_enum)]
    kernel: Option<Kernel>,

    /// Grid resolution by axis
    #[arg(long, default_value_t = DEFAULT_GRID_STEPS)]
    grid_steps: usize,

    /// Output directory
    #[arg(long)]
    outdir: Option<PathBuf>,
}

impl Args {
    fn experiment_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None => ExperimentConfig::default(),
        };
        if let Some(algorithms) = &self.algorithms {
            config = config.algorithms(algorithms);
        }
        if let Some(n_seeds) = &self.n_seeds {
            config = config.n_seeds(n_seeds);
        }
        if let Some(n_reps) = self.n_reps {
            config = config.n_reps(n_reps);
        }
        if let Some(n_evals) = self.n_evals {
            config = config.n_evals(n_evals);
        }
        if let Some(seeding) = self.seeding {
            config = config.seeding(seeding);
        }
        if let Some(kernel) = self.kernel {
            config = config.kernel(kernel);
        }
        if let Some(outdir) = &self.outdir {
            config = config.outdir(outdir);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let env = Env::new().filter_or("RUST_LOG", "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();

    let args = Args::parse();
    let runner = ExperimentRunner::new(args.experiment_config()?)?;
    let mut problem = args.problem.build(args.grid_steps)?;
    for summary in runner.run(&mut problem)? {
        println!("{summary}");
    }
    Ok(())
}
