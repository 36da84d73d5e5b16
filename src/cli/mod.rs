/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Command Line Interface (CLI) module
//!
//! Reads a JSON structure, computes structure factors (and optionally their
//! parameter derivatives) and writes the result as JSON.

use crate::crystal::structure::Structure;
use crate::engine::{EngineConfig, FCalcDerivatives, StructureFactorEngine};
use crate::reflections::MillerIndex;
use crate::scattering::calculator::FCalcMethod;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use num_complex::Complex64;
use serde::Serialize;
use std::path::PathBuf;

/// Scattering model selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Model {
    Iam,
    Taam,
}

impl From<Model> for FCalcMethod {
    fn from(model: Model) -> Self {
        match model {
            Model::Iam => FCalcMethod::Iam,
            Model::Taam => FCalcMethod::Taam,
        }
    }
}

/// sfcalc-rs - X-ray structure factors under IAM and TAAM
#[derive(Debug, Parser)]
#[command(name = "sfcalc-rs")]
#[command(author = "Ameyanagi")]
#[command(version)]
#[command(about = "X-ray structure factors and their parameter derivatives", long_about = None)]
pub struct Cli {
    /// Structure file (JSON)
    #[arg(short, long)]
    pub structure: PathBuf,

    /// Resolution cutoff in Å
    #[arg(short, long, default_value_t = 1.0)]
    pub d_min: f64,

    /// Scattering model
    #[arg(short, long, value_enum, default_value_t = Model::Iam)]
    pub model: Model,

    /// TAAM databank file (built-in databank when omitted)
    #[arg(long)]
    pub databank: Option<PathBuf>,

    /// Print the TAAM atom type assignment
    #[arg(long)]
    pub log_assignment: bool,

    /// Also compute derivatives with respect to atomic parameters
    #[arg(long)]
    pub derivatives: bool,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Reflection {
    hkl: MillerIndex,
    f_calc: Complex64,
    amplitude: f64,
    phase_degrees: f64,
}

#[derive(Debug, Serialize)]
struct Report {
    version: String,
    model: String,
    d_min: f64,
    reflections: Vec<Reflection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    derivatives: Option<Vec<FCalcDerivatives>>,
}

/// Run the command line front end
pub fn run(cli: Cli) -> Result<()> {
    let structure = Structure::from_json_file(&cli.structure)
        .with_context(|| format!("reading structure {}", cli.structure.display()))?;

    let mut config = EngineConfig::default()
        .with_method(cli.model.into())
        .with_log_assignment(cli.log_assignment);
    if let Some(databank) = &cli.databank {
        config = config.with_databank(databank);
    }

    let mut engine = StructureFactorEngine::new(structure, config)?;
    if let Some(log) = engine.assignment_log() {
        eprintln!("{}", log);
    }

    engine.set_d_min(cli.d_min)?;
    let f_calc = engine.f_calc()?;
    let reflections = engine
        .reflections()
        .iter()
        .zip(&f_calc)
        .map(|(hkl, f)| Reflection {
            hkl: *hkl,
            f_calc: *f,
            amplitude: f.norm(),
            phase_degrees: f.arg().to_degrees(),
        })
        .collect();

    let derivatives = if cli.derivatives {
        Some(engine.d_f_calc_d_params()?)
    } else {
        None
    };

    let report = Report {
        version: crate::scattering_model_version(),
        model: engine.method().to_string(),
        d_min: cli.d_min,
        reflections,
        derivatives,
    };
    let text = serde_json::to_string_pretty(&report)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {} reflections to {}", f_calc.len(), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
