/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Scattering-factor calculator shared by the IAM and TAAM variants

use super::convention::{ConventionGuard, ParameterConvention};
use super::errors::{Result, ScatteringError};
use super::iam::IamModel;
use super::table::ScatteringTable;
use super::taam::{Databank, TaamModel};
use crate::crystal::model::CrystalModel;
use log::{debug, info};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capability shared by all form-factor models
pub trait FormFactorModel {
    /// Form factors of atom `index` for each rotated index `hR` of one
    /// reflection with `|h*|² = d_star_sq`
    fn form_factors(&self, index: usize, rotated: &[[i32; 3]], d_star_sq: f64)
        -> Result<Vec<Complex64>>;

    /// Recompute geometry-dependent state after the crystal was refreshed
    fn update(&mut self, crystal: &CrystalModel) -> Result<()>;
}

/// Scattering model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FCalcMethod {
    #[default]
    Iam,
    Taam,
}

impl fmt::Display for FCalcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FCalcMethod::Iam => write!(f, "IAM"),
            FCalcMethod::Taam => write!(f, "TAAM"),
        }
    }
}

impl FromStr for FCalcMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iam" => Ok(FCalcMethod::Iam),
            "taam" => Ok(FCalcMethod::Taam),
            _ => Err(format!("unknown structure factor method '{}'", s)),
        }
    }
}

/// Active form-factor model
#[derive(Debug, Clone)]
pub enum ScatteringModel {
    Iam(IamModel),
    Taam(Box<TaamModel>),
}

impl FormFactorModel for ScatteringModel {
    fn form_factors(
        &self,
        index: usize,
        rotated: &[[i32; 3]],
        d_star_sq: f64,
    ) -> Result<Vec<Complex64>> {
        match self {
            ScatteringModel::Iam(model) => model.form_factors(index, rotated, d_star_sq),
            ScatteringModel::Taam(model) => model.form_factors(index, rotated, d_star_sq),
        }
    }

    fn update(&mut self, crystal: &CrystalModel) -> Result<()> {
        match self {
            ScatteringModel::Iam(model) => model.update(crystal),
            ScatteringModel::Taam(model) => model.update(crystal),
        }
    }
}

/// Form factors plus the anomalous corrections of the current revision
#[derive(Debug, Clone)]
pub struct ScatteringCalculator {
    model: ScatteringModel,
    iam: IamModel,
    atom_count: usize,
    anomalous: Vec<Complex64>,
    anomalous_revision: Option<u64>,
    convention: ParameterConvention,
    assignment_log: Option<String>,
}

impl ScatteringCalculator {
    /// Spherical calculator with coefficients from `table`
    pub fn iam(crystal: &CrystalModel, table: &ScatteringTable) -> Result<Self> {
        let iam = IamModel::new(crystal, table)?;
        info!("Using IAM form factors from table {}", iam.table_name());
        Ok(Self {
            model: ScatteringModel::Iam(iam.clone()),
            iam,
            atom_count: crystal.atom_count(),
            anomalous: Vec::new(),
            anomalous_revision: None,
            convention: ParameterConvention::default(),
            assignment_log: None,
        })
    }

    /// Type every atom against `databank` and switch to the aspherical model
    ///
    /// On failure the calculator keeps its previous model.
    pub fn assign_atom_types(
        &mut self,
        crystal: &CrystalModel,
        databank: Databank,
        log_assignment: bool,
    ) -> Result<Option<&str>> {
        let taam = TaamModel::new(crystal, self.iam.clone(), databank, log_assignment)?;
        self.assignment_log = taam.assignment().log.clone();
        self.model = ScatteringModel::Taam(Box::new(taam));
        Ok(self.assignment_log.as_deref())
    }

    pub fn method(&self) -> FCalcMethod {
        match self.model {
            ScatteringModel::Iam(_) => FCalcMethod::Iam,
            ScatteringModel::Taam(_) => FCalcMethod::Taam,
        }
    }

    pub fn model(&self) -> &ScatteringModel {
        &self.model
    }

    /// Report of the last atom-type assignment, if one was requested
    pub fn assignment_log(&self) -> Option<&str> {
        self.assignment_log.as_deref()
    }

    /// Replace the anomalous corrections with those of crystal `revision`
    pub fn set_anomalous(&mut self, corrections: &[Complex64], revision: u64) -> Result<()> {
        if corrections.len() != self.atom_count {
            return Err(ScatteringError::AnomalousLength {
                expected: self.atom_count,
                actual: corrections.len(),
            });
        }
        self.anomalous.clear();
        self.anomalous.extend_from_slice(corrections);
        self.anomalous_revision = Some(revision);
        debug!("Anomalous corrections set for revision {}", revision);
        Ok(())
    }

    pub fn anomalous(&self) -> &[Complex64] {
        &self.anomalous
    }

    /// Crystal revision the anomalous corrections belong to
    pub fn anomalous_revision(&self) -> Option<u64> {
        self.anomalous_revision
    }

    pub fn update(&mut self, crystal: &CrystalModel) -> Result<()> {
        self.model.update(crystal)
    }

    pub fn form_factors(
        &self,
        index: usize,
        rotated: &[[i32; 3]],
        d_star_sq: f64,
    ) -> Result<Vec<Complex64>> {
        self.model.form_factors(index, rotated, d_star_sq)
    }

    /// Convention derivatives are reported in
    pub fn convention(&self) -> ParameterConvention {
        self.convention
    }

    pub fn set_convention(&mut self, convention: ParameterConvention) {
        self.convention = convention;
    }

    /// Use `convention` until the returned guard is dropped
    pub fn scoped_convention(&mut self, convention: ParameterConvention) -> ConventionGuard<'_> {
        ConventionGuard::new(self, convention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crystal::{Scatterer, SpaceGroup, Structure, UnitCell};
    use crate::scattering::convention::{AdpConvention, SiteConvention};

    fn crystal() -> CrystalModel {
        let cell = UnitCell::new(8.0, 8.0, 8.0, 90.0, 90.0, 90.0).unwrap();
        let mut structure = Structure::new(cell, SpaceGroup::p1());
        structure.add_scatterer(Scatterer::new("O1", [0.5, 0.5, 0.5]));
        structure.add_scatterer(Scatterer::new("H1", [0.62, 0.5, 0.5]));
        CrystalModel::initialize(&structure, &ScatteringTable::it92()).unwrap()
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("TAAM".parse::<FCalcMethod>().unwrap(), FCalcMethod::Taam);
        assert_eq!("iam".parse::<FCalcMethod>().unwrap(), FCalcMethod::Iam);
        assert!("xray".parse::<FCalcMethod>().is_err());
        assert_eq!(FCalcMethod::Taam.to_string(), "TAAM");
    }

    #[test]
    fn test_set_anomalous_checks_length() {
        let crystal = crystal();
        let mut calculator = ScatteringCalculator::iam(&crystal, &ScatteringTable::it92()).unwrap();
        assert_eq!(calculator.anomalous_revision(), None);
        assert!(matches!(
            calculator.set_anomalous(&[Complex64::new(0.1, 0.2)], 0),
            Err(ScatteringError::AnomalousLength { expected: 2, actual: 1 })
        ));
        calculator.set_anomalous(crystal.anomalous(), 3).unwrap();
        assert_eq!(calculator.anomalous_revision(), Some(3));
        assert_eq!(calculator.anomalous().len(), 2);
    }

    #[test]
    fn test_scoped_convention_restores_on_drop() {
        let crystal = crystal();
        let mut calculator = ScatteringCalculator::iam(&crystal, &ScatteringTable::it92()).unwrap();
        let inner = ParameterConvention::new(SiteConvention::Cartesian, AdpConvention::UCif);
        {
            let guard = calculator.scoped_convention(inner);
            assert_eq!(guard.convention(), inner);
            assert!(guard.previous().is_internal());
        }
        assert!(calculator.convention().is_internal());

        // restored when the scope is left through an error
        let failing = |calculator: &mut ScatteringCalculator| -> Result<()> {
            let mut guard = calculator.scoped_convention(inner);
            guard.set_anomalous(&[], 0)?;
            Ok(())
        };
        assert!(failing(&mut calculator).is_err());
        assert!(calculator.convention().is_internal());
    }

    #[test]
    fn test_assign_atom_types_switches_model() {
        let crystal = crystal();
        let mut calculator = ScatteringCalculator::iam(&crystal, &ScatteringTable::it92()).unwrap();
        assert_eq!(calculator.method(), FCalcMethod::Iam);

        let log = calculator
            .assign_atom_types(&crystal, Databank::builtin().unwrap(), true)
            .unwrap()
            .map(str::to_string);
        assert_eq!(calculator.method(), FCalcMethod::Taam);
        assert!(log.unwrap().contains("H-O"));
    }

    #[test]
    fn test_failed_assignment_keeps_iam() {
        let crystal = crystal();
        let mut calculator = ScatteringCalculator::iam(&crystal, &ScatteringTable::it92()).unwrap();
        let databank = Databank::parse("ELEMENT C 4 5.93 2 2 2\nTYPE C-any C * 4 1 1").unwrap();
        assert!(matches!(
            calculator.assign_atom_types(&crystal, databank, false),
            Err(ScatteringError::AtomTypeAssignment(_))
        ));
        assert_eq!(calculator.method(), FCalcMethod::Iam);
    }
}
