/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Space-group symmetry operations
//!
//! Operations are supplied by the structure as a complete list (including
//! centring translations); this module only stores and applies them.

use super::errors::{CrystalError, Result};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symmetry operation `x' = R x + t` in the fractional basis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymmetryOperation {
    rotation: Matrix3<i32>,
    translation: Vector3<f64>,
}

impl SymmetryOperation {
    pub fn new(rotation: Matrix3<i32>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    /// Parse a Jones-faithful triplet such as `"-x,y+1/2,-z"`
    pub fn from_xyz(triplet: &str) -> Result<Self> {
        let parts: Vec<&str> = triplet.split(',').collect();
        if parts.len() != 3 {
            return Err(CrystalError::InvalidSymmetry(format!(
                "expected three comma-separated components in '{}'",
                triplet
            )));
        }

        let mut rotation = Matrix3::zeros();
        let mut translation = Vector3::zeros();
        for (row, part) in parts.iter().enumerate() {
            let (coefficients, shift) = parse_component(part)
                .map_err(|reason| CrystalError::InvalidSymmetry(format!("'{}': {}", triplet, reason)))?;
            rotation.set_row(row, &Vector3::from(coefficients).transpose());
            translation[row] = shift;
        }

        Ok(Self::new(rotation, translation))
    }

    pub fn rotation(&self) -> &Matrix3<i32> {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// Apply the operation to a fractional position
    pub fn apply(&self, x: &[f64; 3]) -> [f64; 3] {
        (self.rotation.cast::<f64>() * Vector3::from(*x) + self.translation).into()
    }

    /// Miller index transformed as a row vector, `hR`
    ///
    /// `h · (R x + t) = (hR) · x + h · t`, so the image of an atom scatters
    /// at `hR` in the atom's own frame.
    pub fn rotate_miller(&self, h: &[i32; 3]) -> [i32; 3] {
        self.rotation.tr_mul(&Vector3::from(*h)).into()
    }

    /// `h · t`
    pub fn translation_phase(&self, h: &[i32; 3]) -> f64 {
        Vector3::from(*h).cast::<f64>().dot(&self.translation)
    }

    /// Jones-faithful representation
    pub fn to_xyz(&self) -> String {
        (0..3)
            .map(|row| {
                let r = &self.rotation;
                format_component(&[r[(row, 0)], r[(row, 1)], r[(row, 2)]], self.translation[row])
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for SymmetryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_xyz())
    }
}

impl TryFrom<String> for SymmetryOperation {
    type Error = CrystalError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_xyz(&s)
    }
}

impl From<SymmetryOperation> for String {
    fn from(op: SymmetryOperation) -> Self {
        op.to_xyz()
    }
}

fn parse_component(part: &str) -> std::result::Result<([i32; 3], f64), String> {
    let chars: Vec<char> = part.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return Err("empty component".to_string());
    }

    let mut coefficients = [0; 3];
    let mut shift = 0.0;
    let mut i = 0;
    while i < chars.len() {
        let mut sign = 1.0;
        if chars[i] == '+' || chars[i] == '-' {
            if chars[i] == '-' {
                sign = -1.0;
            }
            i += 1;
        }
        if i >= chars.len() {
            return Err("dangling sign".to_string());
        }

        match chars[i].to_ascii_lowercase() {
            axis @ ('x' | 'y' | 'z') => {
                let column = (axis as u8 - b'x') as usize;
                coefficients[column] += sign as i32;
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '/') {
                    i += 1;
                }
                let token: String = chars[start..i].iter().collect();
                shift += sign * parse_fraction(&token)?;
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok((coefficients, shift))
}

fn parse_fraction(token: &str) -> std::result::Result<f64, String> {
    match token.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().map_err(|_| format!("bad number '{}'", token))?;
            let den: f64 = den.parse().map_err(|_| format!("bad number '{}'", token))?;
            if den == 0.0 {
                return Err(format!("zero denominator in '{}'", token));
            }
            Ok(num / den)
        }
        None => token.parse().map_err(|_| format!("bad number '{}'", token)),
    }
}

fn format_component(row: &[i32; 3], shift: f64) -> String {
    let mut out = String::new();
    for (coefficient, axis) in row.iter().zip(['x', 'y', 'z']) {
        match *coefficient {
            0 => {}
            1 => {
                if !out.is_empty() {
                    out.push('+');
                }
                out.push(axis);
            }
            -1 => {
                out.push('-');
                out.push(axis);
            }
            c => {
                if c > 0 && !out.is_empty() {
                    out.push('+');
                }
                out.push_str(&format!("{}{}", c, axis));
            }
        }
    }
    if shift.abs() > 1e-12 {
        let text = format_fraction(shift.abs());
        out.push(if shift < 0.0 { '-' } else { '+' });
        out.push_str(&text);
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

fn format_fraction(value: f64) -> String {
    for den in [2, 3, 4, 6, 8, 12] {
        let num = value * den as f64;
        if (num - num.round()).abs() < 1e-9 {
            return format!("{}/{}", num.round() as i64, den);
        }
    }
    format!("{}", value)
}

/// Complete list of symmetry operations of a space group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceGroup {
    operations: Vec<SymmetryOperation>,
}

impl SpaceGroup {
    /// Create a space group from its full operation list
    pub fn new(operations: Vec<SymmetryOperation>) -> Result<Self> {
        if operations.is_empty() {
            return Err(CrystalError::InvalidSymmetry(
                "space group needs at least the identity operation".to_string(),
            ));
        }
        Ok(Self { operations })
    }

    /// Create a space group from Jones-faithful triplets
    pub fn from_xyz<S: AsRef<str>>(triplets: &[S]) -> Result<Self> {
        let operations = triplets
            .iter()
            .map(|t| SymmetryOperation::from_xyz(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(operations)
    }

    /// Space group P1
    pub fn p1() -> Self {
        Self {
            operations: vec![SymmetryOperation::identity()],
        }
    }

    pub fn operations(&self) -> &[SymmetryOperation] {
        &self.operations
    }

    pub fn order(&self) -> usize {
        self.operations.len()
    }

    /// A reflection is systematically absent when some operation maps `h`
    /// onto itself with a non-integral phase shift `h · t`
    pub fn is_systematically_absent(&self, h: &[i32; 3]) -> bool {
        self.operations.iter().any(|op| {
            if op.rotate_miller(h) != *h {
                return false;
            }
            let phase = op.translation_phase(h);
            (phase - phase.round()).abs() > 1e-6
        })
    }
}

impl Default for SpaceGroup {
    fn default() -> Self {
        Self::p1()
    }
}
