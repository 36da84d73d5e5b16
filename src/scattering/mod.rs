/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Atomic scattering factors
//!
//! This module provides the Gaussian scattering-factor tables, the
//! spherical independent atom model (IAM), the transferable aspherical atom
//! model (TAAM) with its databank typing, and the calculator that combines
//! either model with per-atom anomalous corrections.

pub mod calculator;
pub mod convention;
pub mod errors;
pub mod iam;
pub mod table;
pub mod taam;

pub use calculator::{FCalcMethod, FormFactorModel, ScatteringCalculator, ScatteringModel};
pub use convention::{AdpConvention, ConventionGuard, ParameterConvention, SiteConvention};
pub use errors::{Result, ScatteringError};
pub use iam::IamModel;
pub use table::{GaussianScatteringParameters, ScatteringTable};
pub use taam::{Databank, TaamModel};

/// Databank record format understood by [`taam::Databank`]
pub const DATABANK_FORMAT_VERSION: u32 = 1;

/// Identifies the scattering-model implementation
pub fn scattering_model_version() -> String {
    format!(
        "sfcalc-rs {} (IAM: IT92 Gaussian tables; TAAM: Slater multipoles to l=2, databank format {})",
        crate::VERSION,
        DATABANK_FORMAT_VERSION
    )
}
