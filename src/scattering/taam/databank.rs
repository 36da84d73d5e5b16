/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Pseudo-atom databank
//!
//! A databank is a line-oriented text file. `#` starts a comment.
//!
//! ```text
//! ELEMENT <symbol> <valence electrons> <zeta (1/Å)> <n0> <n1> <n2>
//! TYPE <name> <central> <neighbours> <Pv> <kappa> <kappa'> [P10 P11 P1-1 P20 P21 P2-1 P22 P2-2]
//! ```
//!
//! `<neighbours>` is a comma-separated list of element symbols, `-` for an
//! isolated atom or `*` to match any environment. Types are tried in file
//! order, so wildcard types should come last.

use super::multipole::Multipoles;
use crate::crystal::database;
use crate::scattering::errors::{Result, ScatteringError};
use log::debug;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_DATABANK: &str = include_str!("../../../data/default_databank.txt");

/// Spherical valence density of an element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDensity {
    pub symbol: &'static str,
    pub valence_electrons: f64,
    /// Slater exponent in Å⁻¹
    pub zeta: f64,
    /// Slater powers for the monopole, dipole and quadrupole radial functions
    pub radial_powers: [i32; 3],
}

/// Environment an atom type applies to
#[derive(Debug, Clone, PartialEq)]
pub enum NeighbourPattern {
    Any,
    /// Sorted element symbols of bonded neighbours
    Exactly(Vec<&'static str>),
}

impl NeighbourPattern {
    pub fn matches(&self, neighbours: &[&str]) -> bool {
        match self {
            NeighbourPattern::Any => true,
            NeighbourPattern::Exactly(expected) => {
                let mut sorted = neighbours.to_vec();
                sorted.sort_unstable();
                sorted.len() == expected.len() && sorted.iter().zip(expected).all(|(a, b)| a == b)
            }
        }
    }
}

/// Pseudo-atom type with its deformation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AtomType {
    pub name: String,
    pub central: &'static str,
    pub neighbours: NeighbourPattern,
    /// Valence population
    pub pv: f64,
    pub kappa: f64,
    pub kappa_prime: f64,
    pub multipoles: Multipoles,
}

impl AtomType {
    pub fn has_multipoles(&self) -> bool {
        self.multipoles.iter().any(|p| *p != 0.0)
    }
}

/// Element densities and atom types of one databank
#[derive(Debug, Clone, Default)]
pub struct Databank {
    elements: HashMap<&'static str, ElementDensity>,
    types: Vec<AtomType>,
}

fn parse_error(line: usize, reason: impl Into<String>) -> ScatteringError {
    ScatteringError::DatabankParse {
        line,
        reason: reason.into(),
    }
}

fn parse_number<T: std::str::FromStr>(token: &str, what: &str, line: usize) -> Result<T> {
    token
        .parse()
        .map_err(|_| parse_error(line, format!("invalid {} '{}'", what, token)))
}

fn parse_element(token: &str, line: usize) -> Result<&'static str> {
    database::atomic_number_from_symbol(token)
        .and_then(database::element_symbol)
        .ok_or_else(|| parse_error(line, format!("unknown element '{}'", token)))
}

impl Databank {
    /// Databank shipped with the crate, covering common H, C, N and O
    /// environments
    pub fn builtin() -> Result<Self> {
        Self::parse(DEFAULT_DATABANK)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let databank = Self::parse(&text)?;
        debug!(
            "Read databank {}: {} elements, {} types",
            path.as_ref().display(),
            databank.elements.len(),
            databank.types.len()
        );
        Ok(databank)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut databank = Self::default();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let tokens: Vec<&str> = content.split_whitespace().collect();
            match tokens[0].to_ascii_uppercase().as_str() {
                "ELEMENT" => databank.parse_element_line(&tokens, line)?,
                "TYPE" => databank.parse_type_line(&tokens, line)?,
                other => return Err(parse_error(line, format!("unknown record '{}'", other))),
            }
        }

        Ok(databank)
    }

    fn parse_element_line(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        if tokens.len() != 7 {
            return Err(parse_error(line, "ELEMENT needs symbol, valence, zeta and three radial powers"));
        }
        let symbol = parse_element(tokens[1], line)?;
        let valence_electrons: f64 = parse_number(tokens[2], "valence", line)?;
        let zeta: f64 = parse_number(tokens[3], "zeta", line)?;
        if !zeta.is_finite() || zeta <= 0.0 || !valence_electrons.is_finite() || valence_electrons < 0.0 {
            return Err(parse_error(line, "zeta must be positive and valence non-negative"));
        }
        let mut radial_powers = [0; 3];
        for (power, token) in radial_powers.iter_mut().zip(&tokens[4..7]) {
            *power = parse_number(token, "radial power", line)?;
            if *power < 0 {
                return Err(parse_error(line, "radial powers must be non-negative"));
            }
        }

        self.elements.insert(
            symbol,
            ElementDensity {
                symbol,
                valence_electrons,
                zeta,
                radial_powers,
            },
        );
        Ok(())
    }

    fn parse_type_line(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        if tokens.len() != 7 && tokens.len() != 15 {
            return Err(parse_error(
                line,
                "TYPE needs name, central, neighbours, Pv, kappa, kappa' and optionally 8 multipoles",
            ));
        }
        let central = parse_element(tokens[2], line)?;
        if !self.elements.contains_key(central) {
            return Err(parse_error(line, format!("no ELEMENT record for '{}' yet", central)));
        }

        let neighbours = match tokens[3] {
            "*" => NeighbourPattern::Any,
            "-" => NeighbourPattern::Exactly(Vec::new()),
            list => {
                let mut symbols = list
                    .split(',')
                    .map(|s| parse_element(s.trim(), line))
                    .collect::<Result<Vec<_>>>()?;
                symbols.sort_unstable();
                NeighbourPattern::Exactly(symbols)
            }
        };

        let pv: f64 = parse_number(tokens[4], "Pv", line)?;
        let kappa: f64 = parse_number(tokens[5], "kappa", line)?;
        let kappa_prime: f64 = parse_number(tokens[6], "kappa'", line)?;
        if !kappa.is_finite() || kappa <= 0.0 || !kappa_prime.is_finite() || kappa_prime <= 0.0 {
            return Err(parse_error(line, "kappa and kappa' must be positive"));
        }

        let mut multipoles = [0.0; 8];
        if tokens.len() == 15 {
            for (p, token) in multipoles.iter_mut().zip(&tokens[7..]) {
                *p = parse_number(token, "multipole population", line)?;
            }
        }

        self.types.push(AtomType {
            name: tokens[1].to_string(),
            central,
            neighbours,
            pv,
            kappa,
            kappa_prime,
            multipoles,
        });
        Ok(())
    }

    pub fn element(&self, symbol: &str) -> Option<&ElementDensity> {
        self.elements.get(symbol)
    }

    pub fn types(&self) -> &[AtomType] {
        &self.types
    }

    /// Index of the first type matching a central element and its
    /// neighbour elements
    pub fn find_type(&self, central: &str, neighbours: &[&str]) -> Option<usize> {
        self.types
            .iter()
            .position(|t| t.central == central && t.neighbours.matches(neighbours))
    }
}
