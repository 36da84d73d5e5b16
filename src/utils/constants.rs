/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Numerical constants used in structure-factor calculations

use std::f64::consts::PI;

/// 2π
pub const TWO_PI: f64 = 2.0 * PI;

/// 2π², the Debye-Waller prefactor for `exp(-2π² hᵀU*h)`
pub const TWO_PI_SQ: f64 = 2.0 * PI * PI;

/// Distances below this (Å) are treated as the same site
pub const SAME_SITE_TOLERANCE: f64 = 1e-3;

/// Added to the sum of covalent radii when detecting bonds (Å)
pub const BOND_TOLERANCE: f64 = 0.4;
