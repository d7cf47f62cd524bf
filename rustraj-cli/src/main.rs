//! Command-line driver for the rustraj trajectory clustering pipeline.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{ArgAction, Parser, Subcommand};
use log::info;
use rustraj_algorithms::TrajectoryEm;
use rustraj_core::{Covariance, DegeneratePolicy, EmConfig};
use rustraj_io::{cluster_colors, read_dataset, DataFileWriter, SyntheticConfig};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    RustrajIo(#[from] rustraj_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] rustraj_core::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("unsupported output extension for {0}")]
    UnsupportedOutput(PathBuf),
}

/// EM clustering of 2-D motion trajectories.
#[derive(Parser)]
#[command(name = "rustraj")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster a trajectory dataset into mean trajectories
    Cluster {
        /// Input dataset (.csv, .json, .bin)
        input: PathBuf,

        /// JSON report path
        #[arg(short, long)]
        output: PathBuf,

        /// Write the means (.json literal or .csv rows)
        #[arg(long)]
        means: Option<PathBuf>,

        /// Write the responsibility matrix as CSV
        #[arg(long)]
        responsibilities: Option<PathBuf>,

        /// Write per-trajectory display colours as CSV
        #[arg(long)]
        colors: Option<PathBuf>,

        /// JSON file with an EmConfig; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of clusters
        #[arg(short = 'k', long)]
        clusters: Option<usize>,

        /// Isotropic observation variance
        #[arg(long)]
        variance: Option<f64>,

        /// Outer iterations
        #[arg(long)]
        outer_iterations: Option<usize>,

        /// Expectation/maximization cycles per outer iteration
        #[arg(long)]
        inner_iterations: Option<usize>,

        /// Cluster only the first N trajectories (0 = all)
        #[arg(long)]
        max_trajectories: Option<usize>,

        /// Random seed for initial mean sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Abort instead of keeping the previous mean of an empty cluster
        #[arg(long)]
        fail_on_degenerate: bool,
    },

    /// Show information about a trajectory dataset
    Info {
        /// Input dataset (.csv, .json, .bin)
        input: PathBuf,
    },

    /// Generate a synthetic trajectory dataset
    Synth {
        /// Output dataset (.csv, .json, .bin)
        output: PathBuf,

        /// Number of prototype paths
        #[arg(long, default_value = "4")]
        prototypes: usize,

        /// Samples per prototype
        #[arg(long, default_value = "25")]
        per_prototype: usize,

        /// Points per trajectory
        #[arg(long, default_value = "20")]
        steps: usize,

        /// Positional noise standard deviation
        #[arg(long, default_value = "2.0")]
        noise: f64,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn load_config(path: Option<&Path>) -> Result<EmConfig> {
    match path {
        Some(path) => Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?),
        None => Ok(EmConfig::default()),
    }
}

fn write_means(path: &Path, means: &rustraj_core::Means) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    let mut writer = DataFileWriter::create(path)?;
    match ext.as_deref() {
        Some("json") => writer.write_means_json(means)?,
        Some("csv") => writer.write_means_csv(means)?,
        _ => return Err(CliError::UnsupportedOutput(path.to_path_buf())),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Cluster {
            input,
            output,
            means,
            responsibilities,
            colors,
            config,
            clusters,
            variance,
            outer_iterations,
            inner_iterations,
            max_trajectories,
            seed,
            fail_on_degenerate,
        } => {
            let mut em_config = load_config(config.as_deref())?;
            if let Some(clusters) = clusters {
                em_config.num_clusters = clusters;
            }
            if let Some(variance) = variance {
                em_config.covariance = Covariance::isotropic(variance)?;
            }
            if let Some(outer) = outer_iterations {
                em_config.outer_iterations = outer;
            }
            if let Some(inner) = inner_iterations {
                em_config.inner_iterations = inner;
            }
            if let Some(max) = max_trajectories {
                em_config.max_trajectories = (max > 0).then_some(max);
            }
            if let Some(seed) = seed {
                em_config.seed = Some(seed);
            }
            if fail_on_degenerate {
                em_config.degenerate_policy = DegeneratePolicy::Fail;
            }

            info!("Reading: {}", input.display());
            let dataset = read_dataset(&input)?;
            info!(
                "{} trajectories of {} steps; {:?}",
                dataset.len(),
                dataset.steps(),
                em_config
            );

            let start = Instant::now();
            let result = TrajectoryEm::new(em_config).fit(&dataset)?;
            let elapsed = start.elapsed();

            DataFileWriter::create(&output)?.write_report_json(&result)?;
            if let Some(path) = means {
                write_means(&path, &result.means)?;
            }
            if let Some(path) = responsibilities {
                DataFileWriter::create(&path)?
                    .write_responsibilities_csv(&result.responsibilities)?;
            }
            if let Some(path) = colors {
                DataFileWriter::create(&path)?
                    .write_colors_csv(&cluster_colors(&result.responsibilities))?;
            }

            println!(
                "Clustered {} trajectories into {} means in {:.2}s",
                result.responsibilities.nrows(),
                result.num_clusters(),
                elapsed.as_secs_f64()
            );
            println!(
                "Outer iterations: {} ({})",
                result.iterations,
                if result.converged {
                    "converged"
                } else {
                    "budget exhausted"
                }
            );
            println!("Reseeds: {}", result.reseeds.len());
            println!("Total score: {:.6}", result.total_score());
            for (m, contribution) in result.cluster_contributions.iter().enumerate() {
                println!("  cluster {:>3}: contribution {:.6}", m, contribution);
            }
        }

        Commands::Info { input } => {
            let dataset = read_dataset(&input)?;
            let (min, max) = dataset.bounds();

            println!("File: {}", input.display());
            println!("Trajectories: {}", dataset.len());
            println!("Steps: {}", dataset.steps());
            println!("X range: {} - {}", min[0], max[0]);
            println!("Y range: {} - {}", min[1], max[1]);
        }

        Commands::Synth {
            output,
            prototypes,
            per_prototype,
            steps,
            noise,
            seed,
        } => {
            let config = SyntheticConfig::default()
                .with_prototypes(prototypes)
                .with_per_prototype(per_prototype)
                .with_steps(steps)
                .with_noise(noise)
                .with_seed(seed);
            let synth = rustraj_io::generate(&config)?;
            rustraj_io::write_dataset(&output, &synth.dataset)?;
            println!(
                "Wrote {} trajectories of {} steps to {}",
                synth.dataset.len(),
                synth.dataset.steps(),
                output.display()
            );
        }
    }

    Ok(())
}
