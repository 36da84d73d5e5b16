/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Externally owned crystal structures
//!
//! [`StructureSource`] is the interface the engine reads a host structure
//! through. [`Structure`] is an in-memory implementation that can be
//! mutated between calculations and loaded from JSON.

use super::atom::Adp;
use super::cell::UnitCell;
use super::database;
use super::errors::{CrystalError, Result};
use super::symmetry::SpaceGroup;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Read access to a host structure
pub trait StructureSource {
    fn unit_cell(&self) -> &UnitCell;

    fn space_group(&self) -> &SpaceGroup;

    /// Ordered scatterers of the asymmetric unit
    fn scatterers(&self) -> &[Scatterer];

    /// Anomalous correction `f' + i f''` for a scattering type, used when a
    /// scatterer carries no explicit value
    fn dispersion(&self, _scattering_type: &str) -> Option<Complex64> {
        None
    }

    /// Name of the scattering-factor table the host wants, if any
    fn scattering_table(&self) -> Option<&str> {
        None
    }
}

fn default_occupancy() -> f64 {
    1.0
}

/// A scatterer as supplied by the host structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatterer {
    pub label: String,
    /// Element or ion label; derived from `label` when absent
    #[serde(default)]
    pub scattering_type: Option<String>,
    /// Fractional coordinates
    pub site: [f64; 3],
    #[serde(default = "default_occupancy")]
    pub occupancy: f64,
    #[serde(default)]
    pub adp: Adp,
    /// Explicit `f' + i f''`
    #[serde(default)]
    pub anomalous: Option<Complex64>,
}

impl Scatterer {
    /// Fully occupied scatterer with zero isotropic displacement
    pub fn new(label: &str, site: [f64; 3]) -> Self {
        Self {
            label: label.to_string(),
            scattering_type: None,
            site,
            occupancy: 1.0,
            adp: Adp::Iso(0.0),
            anomalous: None,
        }
    }

    pub fn with_scattering_type(mut self, scattering_type: &str) -> Self {
        self.scattering_type = Some(scattering_type.to_string());
        self
    }

    pub fn with_occupancy(mut self, occupancy: f64) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn with_adp(mut self, adp: Adp) -> Self {
        self.adp = adp;
        self
    }

    pub fn with_anomalous(mut self, fp: f64, fdp: f64) -> Self {
        self.anomalous = Some(Complex64::new(fp, fdp));
        self
    }

    /// Scattering type, falling back to the element parsed from the label
    pub fn resolved_scattering_type(&self) -> Option<String> {
        match &self.scattering_type {
            Some(t) => Some(t.clone()),
            None => database::element_from_label(&self.label).map(str::to_string),
        }
    }
}

/// In-memory crystal structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub unit_cell: UnitCell,
    #[serde(default)]
    pub space_group: SpaceGroup,
    pub scatterers: Vec<Scatterer>,
    /// Anomalous corrections by scattering type
    #[serde(default)]
    pub dispersion: HashMap<String, Complex64>,
    #[serde(default)]
    pub scattering_table: Option<String>,
}

impl Structure {
    pub fn new(unit_cell: UnitCell, space_group: SpaceGroup) -> Self {
        Self {
            unit_cell,
            space_group,
            scatterers: Vec::new(),
            dispersion: HashMap::new(),
            scattering_table: None,
        }
    }

    /// Add a scatterer and return its index
    pub fn add_scatterer(&mut self, scatterer: Scatterer) -> usize {
        self.scatterers.push(scatterer);
        self.scatterers.len() - 1
    }

    pub fn scatterer_mut(&mut self, index: usize) -> Option<&mut Scatterer> {
        self.scatterers.get_mut(index)
    }

    pub fn set_dispersion(&mut self, scattering_type: &str, fp: f64, fdp: f64) {
        self.dispersion
            .insert(scattering_type.to_string(), Complex64::new(fp, fdp));
    }

    /// Parse a structure from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| CrystalError::StructureInvalid(format!("cannot parse structure: {}", e)))
    }

    /// Load a structure from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CrystalError::StructureInvalid(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&text)
    }
}

impl StructureSource for Structure {
    fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }

    fn space_group(&self) -> &SpaceGroup {
        &self.space_group
    }

    fn scatterers(&self) -> &[Scatterer] {
        &self.scatterers
    }

    fn dispersion(&self, scattering_type: &str) -> Option<Complex64> {
        self.dispersion.get(scattering_type).copied()
    }

    fn scattering_table(&self) -> Option<&str> {
        self.scattering_table.as_deref()
    }
}
