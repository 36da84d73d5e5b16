/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Independent atom model
//!
//! Spherical form factors from Gaussian coefficients. The value depends only
//! on `s² = |h*|²/4`, so all symmetry images of an atom share it.

use super::calculator::FormFactorModel;
use super::errors::{Result, ScatteringError};
use super::table::{GaussianScatteringParameters, ScatteringTable};
use crate::crystal::model::CrystalModel;
use num_complex::Complex64;

/// Per-atom Gaussian coefficients resolved from a scattering table
#[derive(Debug, Clone)]
pub struct IamModel {
    table_name: String,
    coefficients: Vec<GaussianScatteringParameters>,
}

impl IamModel {
    pub fn new(crystal: &CrystalModel, table: &ScatteringTable) -> Result<Self> {
        let coefficients = crystal
            .atoms()
            .iter()
            .map(|atom| {
                table
                    .get(atom.scattering_type())
                    .cloned()
                    .ok_or_else(|| ScatteringError::UnknownScatteringType(atom.scattering_type().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            table_name: table.name().to_string(),
            coefficients,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Spherical form factor of atom `index` at `|h*|²`
    pub fn form_factor(&self, index: usize, d_star_sq: f64) -> Result<f64> {
        self.coefficients
            .get(index)
            .map(|c| c.evaluate(d_star_sq / 4.0))
            .ok_or_else(|| ScatteringError::Calculation(format!("no coefficients for atom {}", index)))
    }
}

impl FormFactorModel for IamModel {
    fn form_factors(
        &self,
        index: usize,
        rotated: &[[i32; 3]],
        d_star_sq: f64,
    ) -> Result<Vec<Complex64>> {
        let f = Complex64::new(self.form_factor(index, d_star_sq)?, 0.0);
        Ok(vec![f; rotated.len()])
    }

    fn update(&mut self, _crystal: &CrystalModel) -> Result<()> {
        Ok(())
    }
}
