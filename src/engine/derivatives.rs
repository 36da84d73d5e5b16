/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Derivative bundles returned by the engine

use super::accumulate::GradientSink;
use super::errors::{EngineError, Result};
use crate::crystal::atom::Adp;
use crate::crystal::model::CrystalModel;
use crate::reflections::MillerIndex;
use crate::scattering::convention::ParameterConvention;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

/// Parameter groups to differentiate with respect to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradientFlags {
    pub site: bool,
    pub adp: bool,
    pub occupancy: bool,
    /// `f'` and `f''`
    pub dispersion: bool,
}

impl GradientFlags {
    pub fn all() -> Self {
        Self {
            site: true,
            adp: true,
            occupancy: true,
            dispersion: true,
        }
    }

    pub fn none() -> Self {
        Self {
            site: false,
            adp: false,
            occupancy: false,
            dispersion: false,
        }
    }

    /// Number of refinement parameters these flags select for an atom with
    /// displacement parameters `adp`
    pub fn parameter_count(&self, adp: &Adp) -> usize {
        let mut count = 0;
        if self.site {
            count += 3;
        }
        if self.adp {
            count += adp.parameter_count();
        }
        if self.occupancy {
            count += 1;
        }
        if self.dispersion {
            count += 2;
        }
        count
    }
}

impl Default for GradientFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Convert an ADP gradient; isotropic gradients are convention independent
fn convert_adp<T>(convention: &ParameterConvention, crystal: &CrystalModel, g: &[T]) -> Vec<T>
where
    T: Copy + Default + Add<Output = T> + Mul<f64, Output = T>,
{
    match <[T; 6]>::try_from(g) {
        Ok(aniso) => convention.adp_gradient(crystal.unit_cell(), &aniso).to_vec(),
        Err(_) => g.to_vec(),
    }
}

/// Structure factor of one reflection and its derivatives for every atom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FCalcDerivatives {
    pub hkl: MillerIndex,
    pub structure_factor: Complex64,
    /// ∂F/∂(x, y, z) per atom
    pub site: Vec<[Complex64; 3]>,
    /// ∂F/∂U_iso, or ∂F/∂U_ij in (11,22,33,12,13,23) order
    pub adp: Vec<Vec<Complex64>>,
    pub occupancy: Vec<Complex64>,
    /// ∂F/∂f'
    pub fp: Vec<Complex64>,
    /// ∂F/∂f''
    pub fdp: Vec<Complex64>,
}

impl FCalcDerivatives {
    pub(crate) fn from_sink(
        hkl: MillerIndex,
        structure_factor: Complex64,
        sink: GradientSink,
        crystal: &CrystalModel,
        convention: &ParameterConvention,
    ) -> Self {
        let cell = crystal.unit_cell();
        Self {
            hkl,
            structure_factor,
            site: sink
                .site
                .iter()
                .map(|g| convention.site_gradient(cell, g))
                .collect(),
            adp: sink
                .adp
                .iter()
                .map(|g| convert_adp(convention, crystal, g))
                .collect(),
            occupancy: sink.occupancy,
            fp: sink.fp,
            fdp: sink.fdp,
        }
    }

    pub fn atom_count(&self) -> usize {
        self.site.len()
    }
}

/// Target-function derivatives for one atom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDerivatives {
    pub label: String,
    pub site: [f64; 3],
    pub adp: Vec<f64>,
    pub occupancy: f64,
    pub fp: f64,
    pub fdp: f64,
}

impl TargetDerivatives {
    fn zero(label: &str, adp_count: usize) -> Self {
        Self {
            label: label.to_string(),
            site: [0.0; 3],
            adp: vec![0.0; adp_count],
            occupancy: 0.0,
            fp: 0.0,
            fdp: 0.0,
        }
    }
}

/// Running sum of `Re(conj(D) · ∂F/∂p)` over reflections
pub(crate) struct TargetAccumulator {
    totals: Vec<TargetDerivatives>,
}

impl TargetAccumulator {
    pub(crate) fn new(crystal: &CrystalModel) -> Self {
        Self {
            totals: crystal
                .atoms()
                .iter()
                .map(|atom| TargetDerivatives::zero(atom.label(), atom.adp().parameter_count()))
                .collect(),
        }
    }

    /// Add the contribution of one reflection with target gradient
    /// `d = ∂T/∂Re(F) + i ∂T/∂Im(F)`
    pub(crate) fn add(&mut self, d: Complex64, sink: &GradientSink) {
        let d_conj = d.conj();
        let contract = |g: Complex64| (d_conj * g).re;
        for (j, total) in self.totals.iter_mut().enumerate() {
            for (t, g) in total.site.iter_mut().zip(&sink.site[j]) {
                *t += contract(*g);
            }
            for (t, g) in total.adp.iter_mut().zip(&sink.adp[j]) {
                *t += contract(*g);
            }
            total.occupancy += contract(sink.occupancy[j]);
            total.fp += contract(sink.fp[j]);
            total.fdp += contract(sink.fdp[j]);
        }
    }

    /// Per-atom totals in `convention`
    pub(crate) fn finish(
        self,
        crystal: &CrystalModel,
        convention: &ParameterConvention,
    ) -> Vec<TargetDerivatives> {
        let cell = crystal.unit_cell();
        self.totals
            .into_iter()
            .map(|mut total| {
                total.site = convention.site_gradient(cell, &total.site);
                total.adp = convert_adp(convention, crystal, &total.adp);
                total
            })
            .collect()
    }
}

/// Flatten per-atom target derivatives into one refinement vector
///
/// Per atom, in atom order: site (3), ADP (1 or 6), occupancy, f', f'',
/// each only when selected by that atom's flags.
pub fn pack_gradients(results: &[TargetDerivatives], flags: &[GradientFlags]) -> Result<Vec<f64>> {
    if results.len() != flags.len() {
        return Err(EngineError::DimensionMismatch {
            expected: results.len(),
            actual: flags.len(),
        });
    }

    let mut packed = Vec::new();
    for (result, flags) in results.iter().zip(flags) {
        if flags.site {
            packed.extend_from_slice(&result.site);
        }
        if flags.adp {
            packed.extend_from_slice(&result.adp);
        }
        if flags.occupancy {
            packed.push(result.occupancy);
        }
        if flags.dispersion {
            packed.push(result.fp);
            packed.push(result.fdp);
        }
    }
    Ok(packed)
}
