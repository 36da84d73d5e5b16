/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Transferable aspherical atom model
//!
//! Each atom is typed once against a databank. Its form factor is the
//! spherical IAM form factor with the valence shell replaced by a
//! kappa-scaled, repopulated Slater shell, plus dipole and quadrupole
//! deformation terms expressed in a local frame that follows the
//! current geometry.

pub mod assignment;
pub mod databank;
pub mod multipole;

pub use assignment::{assign_atom_types, find_neighbours, AtomTypeAssignment, Neighbour};
pub use databank::{AtomType, Databank, ElementDensity, NeighbourPattern};

use super::calculator::FormFactorModel;
use super::errors::{Result, ScatteringError};
use super::iam::IamModel;
use crate::crystal::cell::UnitCell;
use crate::crystal::model::CrystalModel;
use crate::crystal::vector::Vector3D;
use crate::utils::constants::TWO_PI;
use multipole::{fourier_bessel, real_harmonics};
use num_complex::Complex64;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, PoisonError, RwLock};

/// Orthonormal frame attached to an atom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    pub x: Vector3D,
    pub y: Vector3D,
    pub z: Vector3D,
}

impl LocalFrame {
    /// z along `first`, x towards `second` orthogonalised against z
    ///
    /// Missing or collinear directions fall back to an arbitrary
    /// perpendicular, and to the Cartesian axes when there is no neighbour.
    pub fn from_neighbours(first: Option<Vector3D>, second: Option<Vector3D>) -> Self {
        let z = match first {
            Some(v) if v.length() > 1e-8 => v.normalize(),
            _ => Vector3D::new(0.0, 0.0, 1.0),
        };
        let x = second
            .map(|v| v - z * v.dot(&z))
            .filter(|v| v.length() > 1e-6)
            .map(|v| v.normalize())
            .unwrap_or_else(|| z.perpendicular());
        let y = z.cross(&x);
        Self { x, y, z }
    }

    /// Components of a Cartesian vector in this frame
    pub fn to_local(&self, v: &Vector3D) -> Vector3D {
        Vector3D::new(v.dot(&self.x), v.dot(&self.y), v.dot(&self.z))
    }
}

/// Radial transforms of one atom type at one scattering vector length
#[derive(Debug, Clone, Copy, PartialEq)]
struct RadialTerms {
    /// Valence shell minus the spherical valence it replaces
    valence: f64,
    dipole: f64,
    quadrupole: f64,
}

/// Keyed by databank type index and the bits of `K`
type RadialCache = Arc<RwLock<HashMap<(usize, u64), RadialTerms>>>;

/// Aspherical form factors for a typed crystal
#[derive(Debug, Clone)]
pub struct TaamModel {
    iam: IamModel,
    databank: Databank,
    assignment: AtomTypeAssignment,
    unit_cell: UnitCell,
    frames: Vec<LocalFrame>,
    radial_cache: RadialCache,
}

impl TaamModel {
    /// Type `crystal` against `databank`; the spherical core uses `iam`
    pub fn new(
        crystal: &CrystalModel,
        iam: IamModel,
        databank: Databank,
        log_assignment: bool,
    ) -> Result<Self> {
        let assignment = assign_atom_types(crystal, &databank, log_assignment)?;
        let mut model = Self {
            iam,
            databank,
            assignment,
            unit_cell: crystal.unit_cell().clone(),
            frames: Vec::new(),
            radial_cache: RadialCache::default(),
        };
        model.update_frames(crystal)?;
        Ok(model)
    }

    pub fn assignment(&self) -> &AtomTypeAssignment {
        &self.assignment
    }

    pub fn databank(&self) -> &Databank {
        &self.databank
    }

    /// Databank type of atom `index`
    pub fn atom_type(&self, index: usize) -> Option<&AtomType> {
        self.assignment
            .types
            .get(index)
            .and_then(|t| self.databank.types().get(*t))
    }

    pub fn frames(&self) -> &[LocalFrame] {
        &self.frames
    }

    /// Number of (type, |h|) radial transforms computed so far
    pub fn cached_radial_terms(&self) -> usize {
        self.radial_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn radial_terms(
        &self,
        type_index: usize,
        atom_type: &AtomType,
        density: &ElementDensity,
        k: f64,
    ) -> Result<RadialTerms> {
        let key = (type_index, k.to_bits());
        if let Some(terms) = self
            .radial_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(*terms);
        }

        let [n0, n1, n2] = density.radial_powers;
        let valence = atom_type.pv * fourier_bessel(0, n0, atom_type.kappa * density.zeta, k)?
            - density.valence_electrons * fourier_bessel(0, n0, density.zeta, k)?;
        let (dipole, quadrupole) = if atom_type.has_multipoles() && k >= 1e-12 {
            let zeta_prime = atom_type.kappa_prime * density.zeta;
            (
                4.0 * PI * fourier_bessel(1, n1, zeta_prime, k)?,
                4.0 * PI * fourier_bessel(2, n2, zeta_prime, k)?,
            )
        } else {
            (0.0, 0.0)
        };

        let terms = RadialTerms {
            valence,
            dipole,
            quadrupole,
        };
        self.radial_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, terms);
        Ok(terms)
    }

    fn update_frames(&mut self, crystal: &CrystalModel) -> Result<()> {
        if self.assignment.types.len() != crystal.atom_count() {
            return Err(ScatteringError::Calculation(format!(
                "atom types assigned for {} atoms, crystal has {}",
                self.assignment.types.len(),
                crystal.atom_count()
            )));
        }
        self.frames = self
            .assignment
            .neighbours
            .iter()
            .enumerate()
            .map(|(index, bonded)| {
                let direction = |k: usize| bonded.get(k).and_then(|n| n.vector(crystal, index));
                LocalFrame::from_neighbours(direction(0), direction(1))
            })
            .collect();
        Ok(())
    }
}

impl FormFactorModel for TaamModel {
    fn form_factors(
        &self,
        index: usize,
        rotated: &[[i32; 3]],
        d_star_sq: f64,
    ) -> Result<Vec<Complex64>> {
        let spherical = self.iam.form_factors(index, rotated, d_star_sq)?;
        let no_type = || ScatteringError::Calculation(format!("atom {} has no databank type", index));
        let type_index = self.assignment.types.get(index).copied().ok_or_else(no_type)?;
        let (atom_type, density) = self
            .databank
            .types()
            .get(type_index)
            .and_then(|t| self.databank.element(t.central).map(|e| (t, e)))
            .ok_or_else(no_type)?;

        let k = TWO_PI * d_star_sq.sqrt();
        let RadialTerms {
            valence,
            dipole: dipole_radial,
            quadrupole: quadrupole_radial,
        } = self.radial_terms(type_index, atom_type, density, k)?;

        if !atom_type.has_multipoles() || k < 1e-12 {
            return Ok(spherical.into_iter().map(|f| f + valence).collect());
        }

        let frame = self.frames.get(index).ok_or_else(|| {
            ScatteringError::Calculation(format!("no local frame for atom {}", index))
        })?;
        let p = &atom_type.multipoles;

        Ok(rotated
            .iter()
            .zip(spherical)
            .map(|(hr, f)| {
                let h = [hr[0] as f64, hr[1] as f64, hr[2] as f64];
                let direction = frame.to_local(&self.unit_cell.reciprocal_cartesian(&h).normalize());
                let y1 = real_harmonics(1, &direction);
                let y2 = real_harmonics(2, &direction);
                let dipole: f64 = p[0..3].iter().zip(&y1).map(|(p, y)| p * y).sum();
                let quadrupole: f64 = p[3..8].iter().zip(&y2).map(|(p, y)| p * y).sum();
                // i^1 and i^2
                f + valence + Complex64::new(-quadrupole_radial * quadrupole, dipole_radial * dipole)
            })
            .collect())
    }

    fn update(&mut self, crystal: &CrystalModel) -> Result<()> {
        if crystal.unit_cell() != &self.unit_cell {
            self.unit_cell = crystal.unit_cell().clone();
        }
        self.update_frames(crystal)
    }
}
