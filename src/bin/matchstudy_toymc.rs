//! Toy run generator
//!
//! Writes a complete run directory of K0S → π⁺π⁻ events with toy first,
//! second and merged track stores, ready for `matchstudy`.
//!
//! Usage:
//!   matchstudy_toymc <OUT_DIR> --events 100 --seed 42

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use matchstudy_rs::generator::{GunConfig, ParticleGun, ToyRun};

#[derive(Parser, Debug)]
#[command(name = "matchstudy_toymc")]
#[command(about = "Generate a toy run directory for the matching study")]
struct Args {
    /// Output run directory
    out_dir: PathBuf,

    /// Number of events
    #[arg(long, default_value_t = 100)]
    events: usize,

    /// Simulation index of the kinematics file
    #[arg(long, default_value_t = 1)]
    index: u32,

    /// Random seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Solenoid field in kG (overrides the config file)
    #[arg(long)]
    bz: Option<f64>,

    /// Gun configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::level_filters::LevelFilter::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config: GunConfig = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => GunConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(bz) = args.bz {
        config.bz_kgauss = bz;
    }
    info!(seed = config.seed, bz_kgauss = config.bz_kgauss, events = args.events, "generating toy run");

    let bz = config.bz_kgauss;
    let mut gun = ParticleGun::new(config)?;
    let run = ToyRun::generate(&mut gun, bz, args.events);
    run.write(&args.out_dir, args.index)
        .with_context(|| format!("writing {}", args.out_dir.display()))?;
    Ok(())
}
