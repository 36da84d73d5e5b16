/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Atom typing from bonding topology
//!
//! Bonds are found between every atom of the asymmetric unit and all
//! symmetry images of all atoms in the surrounding cells. Each atom is then
//! matched to the first databank type with the same central element and the
//! same multiset of neighbour elements.

use super::databank::Databank;
use crate::crystal::database;
use crate::crystal::model::CrystalModel;
use crate::crystal::vector::Vector3D;
use crate::scattering::errors::{Result, ScatteringError};
use crate::utils::constants::{BOND_TOLERANCE, SAME_SITE_TOLERANCE};
use log::{debug, info, warn};
use std::fmt::Write;

/// Separations below this (Å) are the atom itself or a coincident image
const MIN_BOND_LENGTH: f64 = 0.1;

/// A bonded symmetry image of an atom
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbour {
    /// Index of the asymmetric-unit atom
    pub atom: usize,
    /// Index of the symmetry operation
    pub operation: usize,
    /// Lattice translation added to the image
    pub shift: [i32; 3],
    /// Distance at assignment time in Å
    pub distance: f64,
}

impl Neighbour {
    /// Current vector from the central atom to this neighbour
    pub fn vector(&self, crystal: &CrystalModel, central: usize) -> Option<Vector3D> {
        let op = crystal.space_group().operations().get(self.operation)?;
        let origin = crystal.atoms().get(central)?.site();
        let image = op.apply(crystal.atoms().get(self.atom)?.site());
        let diff = [0, 1, 2].map(|i| image[i] + self.shift[i] as f64 - origin[i]);
        Some(crystal.unit_cell().fractional_to_cartesian(&diff))
    }
}

/// Result of typing every atom against a databank
#[derive(Debug, Clone)]
pub struct AtomTypeAssignment {
    /// Databank type index per atom
    pub types: Vec<usize>,
    /// Neighbours per atom, nearest first
    pub neighbours: Vec<Vec<Neighbour>>,
    /// Free-text report, when requested
    pub log: Option<String>,
}

/// Find covalently bonded neighbours of every atom
pub fn find_neighbours(crystal: &CrystalModel) -> Vec<Vec<Neighbour>> {
    let cell = crystal.unit_cell();
    let operations = crystal.space_group().operations();
    let atoms = crystal.atoms();
    let radius = |element: &str| {
        database::atomic_number_from_symbol(element)
            .and_then(database::covalent_radius)
            .unwrap_or(0.0)
    };

    atoms
        .iter()
        .map(|central| {
            let origin = central.site();
            let r_central = radius(central.element());
            let mut found: Vec<(Neighbour, [f64; 3])> = Vec::new();

            for (j, other) in atoms.iter().enumerate() {
                let cutoff = r_central + radius(other.element()) + BOND_TOLERANCE;
                for (k, op) in operations.iter().enumerate() {
                    let image = op.apply(other.site());
                    let base = [0, 1, 2].map(|i| (image[i] - origin[i]).round() as i32);
                    for dx in -1..=1 {
                        for dy in -1..=1 {
                            for dz in -1..=1 {
                                let shift = [dx - base[0], dy - base[1], dz - base[2]];
                                let diff = [0, 1, 2].map(|i| image[i] + shift[i] as f64 - origin[i]);
                                let cart = cell.fractional_to_cartesian(&diff);
                                let distance = cart.length();
                                if distance < MIN_BOND_LENGTH || distance >= cutoff {
                                    continue;
                                }
                                let duplicate = found.iter().any(|(_, d)| {
                                    cell.fractional_to_cartesian(&[d[0] - diff[0], d[1] - diff[1], d[2] - diff[2]])
                                        .length()
                                        < SAME_SITE_TOLERANCE
                                });
                                if !duplicate {
                                    found.push((
                                        Neighbour {
                                            atom: j,
                                            operation: k,
                                            shift,
                                            distance,
                                        },
                                        diff,
                                    ));
                                }
                            }
                        }
                    }
                }
            }

            let mut neighbours: Vec<Neighbour> = found.into_iter().map(|(n, _)| n).collect();
            neighbours.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            neighbours
        })
        .collect()
}

/// Type every atom of `crystal`
///
/// Fails with [`ScatteringError::AtomTypeAssignment`] listing every atom
/// that matched no type.
pub fn assign_atom_types(
    crystal: &CrystalModel,
    databank: &Databank,
    log_assignment: bool,
) -> Result<AtomTypeAssignment> {
    let neighbours = find_neighbours(crystal);
    let atoms = crystal.atoms();

    let mut types = Vec::with_capacity(atoms.len());
    let mut unmatched = Vec::new();
    for (atom, bonded) in atoms.iter().zip(&neighbours) {
        let elements: Vec<&str> = bonded.iter().map(|n| atoms[n.atom].element()).collect();
        let matched = databank
            .find_type(atom.element(), &elements)
            .filter(|_| databank.element(atom.element()).is_some());
        match matched {
            Some(index) => types.push(index),
            None => unmatched.push(format!("{} ({} bonded to [{}])", atom.label(), atom.element(), elements.join(","))),
        }
    }

    if !unmatched.is_empty() {
        warn!("{} atoms could not be assigned a databank type", unmatched.len());
        return Err(ScatteringError::AtomTypeAssignment(unmatched));
    }

    let log = if log_assignment {
        let mut report = String::new();
        for ((atom, bonded), type_index) in atoms.iter().zip(&neighbours).zip(&types) {
            let listed: Vec<String> = bonded
                .iter()
                .map(|n| format!("{}({:.3})", atoms[n.atom].label(), n.distance))
                .collect();
            let _ = writeln!(
                report,
                "{:<8} {:<14} {}",
                atom.label(),
                databank.types()[*type_index].name,
                if listed.is_empty() { "-".to_string() } else { listed.join(" ") }
            );
        }
        Some(report)
    } else {
        None
    };

    for (atom, type_index) in atoms.iter().zip(&types) {
        debug!("{} -> {}", atom.label(), databank.types()[*type_index].name);
    }
    info!("Assigned databank types to {} atoms", atoms.len());

    Ok(AtomTypeAssignment {
        types,
        neighbours,
        log,
    })
}
