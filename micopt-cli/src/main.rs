//! Batch CLI for acoustic recorder array placement.
//!
//! Runs either solver against the default semicircular region and writes the
//! resulting layout, convergence history and probability map as JSON.

use std::fs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use micopt_core::{
    run_genetic, run_gradient, OptimizationParams, OptimizationResult, RegionMask, R2,
};

#[derive(Parser)]
#[command(name = "micopt")]
#[command(about = "Acoustic recorder array placement optimizer", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algorithm {
    Genetic,
    Gradient,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize recorder placement and print or save the result
    Run {
        /// Solver to use
        #[arg(short, long, value_enum, default_value = "genetic")]
        algorithm: Algorithm,

        /// Parameter bundle (JSON file); defaults apply for missing fields
        #[arg(short, long)]
        params: Option<String>,

        /// Number of recorders (overrides the bundle)
        #[arg(short = 'n', long)]
        recorders: Option<usize>,

        /// Region radius in km (overrides the bundle)
        #[arg(long)]
        radius: Option<f64>,

        /// Detection sigma in km (overrides the bundle)
        #[arg(long)]
        sd: Option<f64>,

        /// RNG seed for reproducible runs
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Initial coordinates as JSON `[[x, y], ...]`, e.g. to re-optimize
        /// an edited layout
        #[arg(long)]
        seed_coords: Option<String>,

        /// Output file for the result (JSON); stdout if omitted
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut logger = env_logger::Builder::from_default_env();
    if cli.log_level.is_some() {
        logger.filter_level(micopt_core::parse_log_level(cli.log_level.as_deref()));
    }
    logger.init();

    match cli.command {
        Commands::Run {
            algorithm,
            params,
            recorders,
            radius,
            sd,
            seed,
            seed_coords,
            output,
        } => {
            let mut params: OptimizationParams = match params {
                Some(path) => {
                    let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
                    serde_json::from_str(&text).with_context(|| format!("parsing {}", path))?
                }
                None => OptimizationParams::default(),
            };
            if let Some(n) = recorders {
                params.num_recorders = n;
            }
            if let Some(r) = radius {
                params.radius = r;
            }
            if let Some(s) = sd {
                params.sd = s;
            }

            let seed_points: Option<Vec<R2<f64>>> = match seed_coords {
                Some(json) => {
                    let pairs: Vec<[f64; 2]> =
                        serde_json::from_str(&json).context("parsing --seed-coords")?;
                    Some(pairs.into_iter().map(|[x, y]| R2 { x, y }).collect())
                }
                None => None,
            };

            let mask = RegionMask::semicircle(params.radius);
            let mut rng = StdRng::seed_from_u64(seed);

            let mut last_decile = 0u32;
            let on_progress = |pct: f64| {
                let decile = (pct / 10.) as u32;
                if decile > last_decile {
                    last_decile = decile;
                    info!("{:.0}% complete", pct);
                }
            };

            let result = match algorithm {
                Algorithm::Genetic => OptimizationResult::Genetic(run_genetic(
                    &params,
                    &mask,
                    seed_points.as_deref(),
                    &mut rng,
                    on_progress,
                    None,
                )?),
                Algorithm::Gradient => OptimizationResult::Gradient(run_gradient(
                    &params,
                    &mask,
                    seed_points.as_deref(),
                    &mut rng,
                    on_progress,
                    None,
                )?),
            };

            info!(
                "{} run complete: best score {:.4}",
                result.algorithm(),
                result.best().score
            );
            let json = serde_json::to_string_pretty(&result)?;
            match output {
                Some(path) => fs::write(&path, json).with_context(|| format!("writing {}", path))?,
                None => println!("{}", json),
            }
        }
    }
    Ok(())
}
