/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Internal crystal model synchronized from an external structure
//!
//! The model owns an index-aligned atom array and the matching anomalous
//! corrections. Indices are fixed at [`CrystalModel::initialize`]; every
//! later [`CrystalModel::refresh`] reconciles by identity and refuses to
//! continue if the host structure gained, lost or reordered atoms. Cell and
//! symmetry edits are picked up by refresh as well.

use super::atom::{Adp, Atom};
use super::cell::UnitCell;
use super::database;
use super::errors::{CrystalError, Result};
use super::structure::{Scatterer, StructureSource};
use super::symmetry::SpaceGroup;
use crate::scattering::table::ScatteringTable;
use crate::utils::constants::SAME_SITE_TOLERANCE;
use log::{debug, info};
use num_complex::Complex64;

/// Snapshot of the host structure used for one calculation
#[derive(Debug, Clone)]
pub struct CrystalModel {
    unit_cell: UnitCell,
    space_group: SpaceGroup,
    atoms: Vec<Atom>,
    anomalous: Vec<Complex64>,
    revision: u64,
}

impl CrystalModel {
    /// Read cell, symmetry and the full atom list once
    ///
    /// Every scattering type must resolve in `table`.
    pub fn initialize<S: StructureSource + ?Sized>(
        source: &S,
        table: &ScatteringTable,
    ) -> Result<Self> {
        let scatterers = source.scatterers();
        if scatterers.is_empty() {
            return Err(CrystalError::StructureInvalid(
                "structure contains no atoms".to_string(),
            ));
        }

        let mut atoms = Vec::with_capacity(scatterers.len());
        for scatterer in scatterers {
            let scattering_type = scatterer.resolved_scattering_type().ok_or_else(|| {
                CrystalError::StructureInvalid(format!(
                    "cannot derive an element from label '{}'",
                    scatterer.label
                ))
            })?;
            if table.resolve(&scattering_type).is_none() {
                return Err(CrystalError::StructureInvalid(format!(
                    "scattering type '{}' of atom '{}' is not in table {}",
                    scattering_type,
                    scatterer.label,
                    table.name()
                )));
            }
            let element = database::element_from_type(&scattering_type).ok_or_else(|| {
                CrystalError::StructureInvalid(format!(
                    "unknown element in scattering type '{}'",
                    scattering_type
                ))
            })?;
            check_parameters(scatterer)?;

            atoms.push(Atom::new(
                &scatterer.label,
                &scattering_type,
                element,
                scatterer.site,
                scatterer.occupancy,
                scatterer.adp,
            ));
        }

        let mut model = Self {
            unit_cell: source.unit_cell().clone(),
            space_group: source.space_group().clone(),
            anomalous: vec![Complex64::new(0.0, 0.0); atoms.len()],
            atoms,
            revision: 0,
        };
        model.update_derived(source);

        info!(
            "Initialized crystal model: {} atoms, {} symmetry operations, cell volume {:.3} Å³",
            model.atoms.len(),
            model.space_group.order(),
            model.unit_cell.volume()
        );
        Ok(model)
    }

    /// Re-read cell, symmetry, sites, occupancies, ADPs and anomalous
    /// corrections
    pub fn refresh<S: StructureSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        let scatterers = source.scatterers();
        if scatterers.len() != self.atoms.len() {
            return Err(CrystalError::StructureInconsistent(format!(
                "atom count changed from {} to {}",
                self.atoms.len(),
                scatterers.len()
            )));
        }

        for (index, (atom, scatterer)) in self.atoms.iter().zip(scatterers).enumerate() {
            let scattering_type = scatterer.resolved_scattering_type();
            if atom.label() != scatterer.label
                || scattering_type.as_deref() != Some(atom.scattering_type())
            {
                return Err(CrystalError::StructureInconsistent(format!(
                    "atom {} was {} ({}), now {} ({})",
                    index,
                    atom.label(),
                    atom.scattering_type(),
                    scatterer.label,
                    scattering_type.as_deref().unwrap_or("?")
                )));
            }
            check_parameters(scatterer)?;
        }

        if source.unit_cell() != &self.unit_cell {
            debug!(
                "Unit cell changed from {:?} to {:?}",
                self.unit_cell.parameters(),
                source.unit_cell().parameters()
            );
            self.unit_cell = source.unit_cell().clone();
        }
        if source.space_group() != &self.space_group {
            debug!(
                "Space group changed from {} to {} operations",
                self.space_group.order(),
                source.space_group().order()
            );
            self.space_group = source.space_group().clone();
        }

        for (atom, scatterer) in self.atoms.iter_mut().zip(scatterers) {
            atom.set_parameters(scatterer.site, scatterer.occupancy, scatterer.adp);
        }
        self.update_derived(source);
        self.revision += 1;

        debug!(
            "Refreshed crystal model to revision {} ({} atoms)",
            self.revision,
            self.atoms.len()
        );
        Ok(())
    }

    fn update_derived<S: StructureSource + ?Sized>(&mut self, source: &S) {
        let scatterers = source.scatterers();
        for (index, atom) in self.atoms.iter_mut().enumerate() {
            let weight = site_weight(&self.unit_cell, &self.space_group, atom.site());
            atom.set_site_weight(weight);
            self.anomalous[index] = anomalous_correction(source, &scatterers[index], atom);
        }
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }

    pub fn space_group(&self) -> &SpaceGroup {
        &self.space_group
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// `f' + i f''` per atom, index-aligned with [`atoms`](Self::atoms)
    pub fn anomalous(&self) -> &[Complex64] {
        &self.anomalous
    }

    /// Number of refreshes since initialization
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Fail fast if atoms and anomalous corrections drifted apart
    pub fn check_alignment(&self) -> Result<()> {
        if self.atoms.len() != self.anomalous.len() {
            return Err(CrystalError::StructureInconsistent(format!(
                "{} atoms but {} anomalous corrections",
                self.atoms.len(),
                self.anomalous.len()
            )));
        }
        Ok(())
    }
}

fn check_parameters(scatterer: &Scatterer) -> Result<()> {
    let adp_finite = match scatterer.adp {
        Adp::Iso(u) => u.is_finite(),
        Adp::Aniso(u) => u.iter().all(|v| v.is_finite()),
    };
    if !scatterer.site.iter().all(|x| x.is_finite())
        || !scatterer.occupancy.is_finite()
        || !adp_finite
    {
        return Err(CrystalError::StructureInvalid(format!(
            "atom '{}' has non-finite parameters",
            scatterer.label
        )));
    }
    Ok(())
}

/// 1 / (number of operations mapping `site` onto itself modulo lattice
/// translations)
fn site_weight(cell: &UnitCell, group: &SpaceGroup, site: &[f64; 3]) -> f64 {
    let invariant = group
        .operations()
        .iter()
        .filter(|op| {
            let image = op.apply(site);
            let diff = [0, 1, 2].map(|i| {
                let d = image[i] - site[i];
                d - d.round()
            });
            cell.fractional_to_cartesian(&diff).length() < SAME_SITE_TOLERANCE
        })
        .count();
    1.0 / invariant.max(1) as f64
}

/// Explicit value first, then the structure's dispersion table by declared
/// type and element, otherwise zero
fn anomalous_correction<S: StructureSource + ?Sized>(
    source: &S,
    scatterer: &Scatterer,
    atom: &Atom,
) -> Complex64 {
    scatterer
        .anomalous
        .or_else(|| source.dispersion(atom.scattering_type()))
        .or_else(|| source.dispersion(atom.element()))
        .unwrap_or_else(|| Complex64::new(0.0, 0.0))
}
