//! # matchstudy
//!
//! Inner/outer tracker matching study over one simulation run.
//!
//! Usage:
//!   matchstudy [PATH] [OUTPUT] [INDEX] [--material lut] [--reference-x 70]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use matchstudy_rs::field::MagneticField;
use matchstudy_rs::io::{load_config, write_json, RunInputs};
use matchstudy_rs::study::MatchingStudy;
use matchstudy_rs::types::{MaterialCorrection, PdgThreshold, StudyConfig};

#[derive(Parser, Debug)]
#[command(name = "matchstudy")]
#[command(about = "Matching efficiency and residual study for K0S decay daughters")]
struct Args {
    /// Run directory with kinematics, track stores and run parameters
    #[arg(default_value = "..")]
    path: PathBuf,

    /// Output JSON file
    #[arg(default_value = "itstpcmatching_qa.json")]
    output: PathBuf,

    /// Simulation index of the kinematics file
    #[arg(default_value_t = 1)]
    index: u32,

    /// Study configuration JSON (defaults to the K0S preset)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Material correction during reference propagation: none, lut, geometry
    #[arg(long)]
    material: Option<MaterialCorrection>,

    /// Reference x all tracks are propagated to (cm)
    #[arg(long)]
    reference_x: Option<f64>,

    /// Daughter |pdg| threshold handling
    #[arg(long, value_parser = parse_threshold)]
    threshold: Option<PdgThreshold>,
}

fn parse_threshold(s: &str) -> Result<PdgThreshold, String> {
    match s.to_ascii_lowercase().as_str() {
        "inclusive" => Ok(PdgThreshold::Inclusive),
        "exclusive" => Ok(PdgThreshold::Exclusive),
        other => Err(format!("unknown threshold mode '{other}'")),
    }
}

fn study_config(args: &Args) -> Result<StudyConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path).with_context(|| format!("loading config {}", path.display()))?,
        None => StudyConfig::k0s_pions(),
    };
    if let Some(material) = args.material {
        config.material = material;
    }
    if let Some(x) = args.reference_x {
        config.reference_x = x;
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = study_config(args)?;

    let inputs = RunInputs::open(&args.path, args.index)
        .with_context(|| format!("opening run directory {}", args.path.display()))?;
    let field = MagneticField::from_config(&inputs.field).context("reading magnetic field")?;

    let study = MatchingStudy::new(config, field)?;
    let output = study.run(&inputs).context("processing events")?;

    write_json(&args.output, &output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(output = %args.output.display(), rows = output.rows.len(), "study written");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::level_filters::LevelFilter::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("{}", matchstudy_rs::info());

    if let Err(e) = run(&args) {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}
