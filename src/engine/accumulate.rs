/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! The single structure-factor accumulation loop
//!
//! For one reflection `h`, every atom `j` and symmetry operation `(R, t)`
//! contributes the image term
//!
//! ```text
//! τ = w_j · occ_j · (f_j(hR) + f'_j + i f''_j) · T_j(hR) · exp(2πi (hR·x_j + h·t))
//! ```
//!
//! and the structure factor is the sum of all image terms. When a
//! [`GradientSink`] is supplied the parameter derivatives of every τ are
//! added in the same pass, all in fractional coordinates and `U*`.
//!
//! The calculator's anomalous corrections must belong to the crystal's
//! current revision; a calculator left behind by a refresh is rejected.

use super::derivatives::GradientFlags;
use super::errors::{EngineError, Result};
use crate::crystal::atom::Adp;
use crate::crystal::model::CrystalModel;
use crate::reflections::MillerIndex;
use crate::scattering::calculator::ScatteringCalculator;
use crate::utils::constants::{TWO_PI, TWO_PI_SQ};
use num_complex::Complex64;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Per-atom derivative accumulators for one reflection
#[derive(Debug, Clone, PartialEq)]
pub struct GradientSink {
    pub flags: GradientFlags,
    pub site: Vec<[Complex64; 3]>,
    /// 1 entry for isotropic atoms, 6 for anisotropic ones
    pub adp: Vec<Vec<Complex64>>,
    pub occupancy: Vec<Complex64>,
    pub fp: Vec<Complex64>,
    pub fdp: Vec<Complex64>,
}

impl GradientSink {
    pub fn new(crystal: &CrystalModel, flags: GradientFlags) -> Self {
        let n = crystal.atom_count();
        Self {
            flags,
            site: vec![[ZERO; 3]; n],
            adp: crystal
                .atoms()
                .iter()
                .map(|atom| vec![ZERO; atom.adp().parameter_count()])
                .collect(),
            occupancy: vec![ZERO; n],
            fp: vec![ZERO; n],
            fdp: vec![ZERO; n],
        }
    }

    /// Zero every accumulator, keeping the allocation
    pub fn reset(&mut self) {
        self.site.iter_mut().for_each(|s| *s = [ZERO; 3]);
        self.adp.iter_mut().for_each(|a| a.iter_mut().for_each(|v| *v = ZERO));
        self.occupancy.iter_mut().for_each(|v| *v = ZERO);
        self.fp.iter_mut().for_each(|v| *v = ZERO);
        self.fdp.iter_mut().for_each(|v| *v = ZERO);
    }
}

/// `hRᵀ U* hR` with U* stored as (11,22,33,12,13,23)
fn quadratic_form(u: &[f64; 6], h: &[f64; 3]) -> f64 {
    u[0] * h[0] * h[0]
        + u[1] * h[1] * h[1]
        + u[2] * h[2] * h[2]
        + 2.0 * (u[3] * h[0] * h[1] + u[4] * h[0] * h[2] + u[5] * h[1] * h[2])
}

/// Structure factor of reflection `hkl`, with derivatives when `sink` is
/// given
///
/// The sink must have been created for `crystal` and reset by the caller.
pub fn accumulate(
    crystal: &CrystalModel,
    calculator: &ScatteringCalculator,
    hkl: &MillerIndex,
    mut sink: Option<&mut GradientSink>,
) -> Result<Complex64> {
    let revision = calculator.anomalous_revision();
    if revision != Some(crystal.revision()) {
        return Err(EngineError::StaleCalculator {
            crystal: crystal.revision(),
            calculator: revision,
        });
    }

    let operations = crystal.space_group().operations();
    let d_star_sq = crystal
        .unit_cell()
        .d_star_sq(&[hkl[0] as f64, hkl[1] as f64, hkl[2] as f64]);
    let anomalous = calculator.anomalous();

    let mut total = ZERO;
    let mut rotated = Vec::with_capacity(operations.len());

    // masking is reserved; every atom contributes
    for (j, atom) in crystal.atoms().iter().enumerate() {
        rotated.clear();
        rotated.extend(operations.iter().map(|op| op.rotate_miller(hkl)));
        let form_factors = calculator.form_factors(j, &rotated, d_star_sq)?;
        let correction = anomalous.get(j).copied().unwrap_or(ZERO);
        let weight = atom.site_weight();
        let site = atom.site();

        for ((op, hr), f) in operations.iter().zip(&rotated).zip(form_factors) {
            let h = [hr[0] as f64, hr[1] as f64, hr[2] as f64];
            let phase = TWO_PI
                * (h[0] * site[0] + h[1] * site[1] + h[2] * site[2] + op.translation_phase(hkl));
            let debye_waller = match atom.adp() {
                Adp::Iso(u) => (-TWO_PI_SQ * u * d_star_sq).exp(),
                Adp::Aniso(u) => (-TWO_PI_SQ * quadratic_form(u, &h)).exp(),
            };

            let f_total = f + correction;
            // w·T·exp(iφ), shared by the value and the occupancy and
            // dispersion derivatives
            let geometric = Complex64::from_polar(weight * debye_waller, phase);
            let scattering = geometric * atom.occupancy();
            let term = f_total * scattering;
            total += term;

            let Some(sink) = sink.as_deref_mut() else {
                continue;
            };
            let flags = sink.flags;
            if flags.site {
                let i_term = Complex64::i() * term * TWO_PI;
                for (d, hc) in sink.site[j].iter_mut().zip(h) {
                    *d += i_term * hc;
                }
            }
            if flags.adp {
                let adp = &mut sink.adp[j];
                match atom.adp() {
                    Adp::Iso(_) => adp[0] += term * (-TWO_PI_SQ * d_star_sq),
                    Adp::Aniso(_) => {
                        let scale = -TWO_PI_SQ;
                        adp[0] += term * (scale * h[0] * h[0]);
                        adp[1] += term * (scale * h[1] * h[1]);
                        adp[2] += term * (scale * h[2] * h[2]);
                        adp[3] += term * (2.0 * scale * h[0] * h[1]);
                        adp[4] += term * (2.0 * scale * h[0] * h[2]);
                        adp[5] += term * (2.0 * scale * h[1] * h[2]);
                    }
                }
            }
            if flags.occupancy {
                sink.occupancy[j] += f_total * geometric;
            }
            if flags.dispersion {
                sink.fp[j] += scattering;
                sink.fdp[j] += Complex64::i() * scattering;
            }
        }
    }

    Ok(total)
}
