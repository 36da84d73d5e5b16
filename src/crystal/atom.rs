/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Atom representation inside the synchronized crystal model

use super::cell::UnitCell;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Atomic displacement parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adp {
    /// Isotropic `U_iso` in Å²
    Iso(f64),
    /// Anisotropic `U*` (11,22,33,12,13,23) in the reciprocal basis
    Aniso([f64; 6]),
}

impl Adp {
    /// Number of refinable ADP parameters
    pub fn parameter_count(&self) -> usize {
        match self {
            Adp::Iso(_) => 1,
            Adp::Aniso(_) => 6,
        }
    }

    pub fn is_anisotropic(&self) -> bool {
        matches!(self, Adp::Aniso(_))
    }

    /// Isotropic equivalent in Å²
    pub fn u_iso(&self, cell: &UnitCell) -> f64 {
        match self {
            Adp::Iso(u) => *u,
            Adp::Aniso(u_star) => cell.u_star_to_u_iso(u_star),
        }
    }
}

impl Default for Adp {
    fn default() -> Self {
        Adp::Iso(0.0)
    }
}

/// An atom of the asymmetric unit
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Site label, part of the atom's identity
    label: String,
    /// Scattering type after alias resolution
    scattering_type: String,
    /// Element symbol
    element: &'static str,
    /// Fractional coordinates
    site: [f64; 3],
    occupancy: f64,
    adp: Adp,
    /// 1 / (number of symmetry operations leaving the site invariant)
    site_weight: f64,
}

impl Atom {
    pub fn new(
        label: &str,
        scattering_type: &str,
        element: &'static str,
        site: [f64; 3],
        occupancy: f64,
        adp: Adp,
    ) -> Self {
        Self {
            label: label.to_string(),
            scattering_type: scattering_type.to_string(),
            element,
            site,
            occupancy,
            adp,
            site_weight: 1.0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn scattering_type(&self) -> &str {
        &self.scattering_type
    }

    pub fn element(&self) -> &'static str {
        self.element
    }

    pub fn site(&self) -> &[f64; 3] {
        &self.site
    }

    pub fn occupancy(&self) -> f64 {
        self.occupancy
    }

    pub fn adp(&self) -> &Adp {
        &self.adp
    }

    pub fn site_weight(&self) -> f64 {
        self.site_weight
    }

    pub(crate) fn set_parameters(&mut self, site: [f64; 3], occupancy: f64, adp: Adp) {
        self.site = site;
        self.occupancy = occupancy;
        self.adp = adp;
    }

    pub(crate) fn set_site_weight(&mut self, weight: f64) {
        self.site_weight = weight;
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) at ({:.5}, {:.5}, {:.5}) occ {:.3}",
            self.label, self.scattering_type, self.site[0], self.site[1], self.site[2], self.occupancy
        )
    }
}
