/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! # sfcalc-rs
//!
//! X-ray structure factors and their derivatives with respect to atomic
//! parameters, under the independent atom model (IAM) and the transferable
//! aspherical atom model (TAAM).
//!
//! ```no_run
//! use sfcalc_rs::{EngineConfig, Scatterer, SpaceGroup, Structure, StructureFactorEngine, UnitCell};
//!
//! let cell = UnitCell::new(5.64, 5.64, 5.64, 90.0, 90.0, 90.0)?;
//! let mut structure = Structure::new(cell, SpaceGroup::p1());
//! structure.add_scatterer(Scatterer::new("Na1", [0.0, 0.0, 0.0]));
//! structure.add_scatterer(Scatterer::new("Cl1", [0.5, 0.5, 0.5]));
//!
//! let mut engine = StructureFactorEngine::new(structure, EngineConfig::default())?;
//! let f_calc = engine.f_calc_d_min(1.0)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod crystal;
pub mod engine;
pub mod reflections;
pub mod scattering;
pub mod utils;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

pub use crystal::{Adp, Scatterer, SpaceGroup, Structure, StructureSource, UnitCell};
pub use engine::{
    pack_gradients, EngineConfig, EngineError, FCalcDerivatives, GradientFlags,
    StructureFactorEngine, TargetDerivatives,
};
pub use reflections::{MillerIndex, ReflectionSet};
pub use scattering::calculator::FCalcMethod;
pub use scattering::convention::{AdpConvention, ParameterConvention, SiteConvention};
pub use scattering::scattering_model_version;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_version_mentions_crate_version() {
        assert!(scattering_model_version().contains(VERSION));
    }
}
