/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Parameter conventions for derivative output
//!
//! All internal arithmetic uses fractional coordinates and `U*` ADPs.
//! Gradients are converted at the boundary when the caller works in
//! Cartesian coordinates, `U_cif` or `U_cart`. Isotropic `U` is the same in
//! every convention.

use super::calculator::ScatteringCalculator;
use crate::crystal::cell::UnitCell;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Deref, DerefMut, Mul};

/// Coordinate system of positional parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteConvention {
    #[default]
    Fractional,
    /// Cartesian Å in the orthogonalisation frame of the cell
    Cartesian,
}

/// Normalisation of anisotropic displacement parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdpConvention {
    /// Reciprocal-basis `U*`, `T = exp(-2π² hᵀU*h)`
    #[default]
    UStar,
    /// CIF `U_ij` scaled by reciprocal lengths
    UCif,
    /// Cartesian `U`
    UCart,
}

/// Convention in which parameter derivatives are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterConvention {
    #[serde(default)]
    pub xyz: SiteConvention,
    #[serde(default)]
    pub adp: AdpConvention,
}

impl ParameterConvention {
    /// The convention used by the accumulation itself
    pub const INTERNAL: Self = Self {
        xyz: SiteConvention::Fractional,
        adp: AdpConvention::UStar,
    };

    pub fn new(xyz: SiteConvention, adp: AdpConvention) -> Self {
        Self { xyz, adp }
    }

    /// Cartesian sites with `U_cart`
    pub fn cartesian() -> Self {
        Self::new(SiteConvention::Cartesian, AdpConvention::UCart)
    }

    pub fn is_internal(&self) -> bool {
        *self == Self::INTERNAL
    }

    /// Convert a gradient with respect to fractional coordinates
    ///
    /// `x_frac = F x_cart`, hence `∂/∂x_cart = Fᵀ ∂/∂x_frac`.
    pub fn site_gradient<T>(&self, cell: &UnitCell, g: &[T; 3]) -> [T; 3]
    where
        T: Copy + Default + Add<Output = T> + Mul<f64, Output = T>,
    {
        match self.xyz {
            SiteConvention::Fractional => *g,
            SiteConvention::Cartesian => {
                let f = cell.fractionalization_matrix();
                [0, 1, 2].map(|j| {
                    (0..3).fold(T::default(), |acc, i| acc + g[i] * f[(i, j)])
                })
            }
        }
    }

    /// Convert a gradient with respect to `U*` (11,22,33,12,13,23)
    pub fn adp_gradient<T>(&self, cell: &UnitCell, g: &[T; 6]) -> [T; 6]
    where
        T: Copy + Default + Add<Output = T> + Mul<f64, Output = T>,
    {
        match self.adp {
            AdpConvention::UStar => *g,
            AdpConvention::UCif => {
                let r = cell.reciprocal_lengths();
                [
                    g[0] * (r[0] * r[0]),
                    g[1] * (r[1] * r[1]),
                    g[2] * (r[2] * r[2]),
                    g[3] * (r[0] * r[1]),
                    g[4] * (r[0] * r[2]),
                    g[5] * (r[1] * r[2]),
                ]
            }
            AdpConvention::UCart => {
                // U* = F U_cart Fᵀ; work on the full symmetric gradient so
                // each off-diagonal parameter counts both matrix elements
                let f = cell.fractionalization_matrix();
                let full = [
                    [g[0], g[3] * 0.5, g[4] * 0.5],
                    [g[3] * 0.5, g[1], g[5] * 0.5],
                    [g[4] * 0.5, g[5] * 0.5, g[2]],
                ];
                let element = |a: usize, b: usize| {
                    let mut acc = T::default();
                    for i in 0..3 {
                        for j in 0..3 {
                            acc = acc + full[i][j] * (f[(i, a)] * f[(j, b)]);
                        }
                    }
                    acc
                };
                [
                    element(0, 0),
                    element(1, 1),
                    element(2, 2),
                    element(0, 1) * 2.0,
                    element(0, 2) * 2.0,
                    element(1, 2) * 2.0,
                ]
            }
        }
    }
}

/// Switches the convention of a calculator for one operation
///
/// The previous convention is restored when the guard is dropped, on every
/// exit path.
pub struct ConventionGuard<'a> {
    calculator: &'a mut ScatteringCalculator,
    previous: ParameterConvention,
}

impl<'a> ConventionGuard<'a> {
    pub(crate) fn new(calculator: &'a mut ScatteringCalculator, convention: ParameterConvention) -> Self {
        let previous = calculator.convention();
        calculator.set_convention(convention);
        Self {
            calculator,
            previous,
        }
    }

    /// Convention that will be restored
    pub fn previous(&self) -> ParameterConvention {
        self.previous
    }
}

impl Deref for ConventionGuard<'_> {
    type Target = ScatteringCalculator;

    fn deref(&self) -> &Self::Target {
        self.calculator
    }
}

impl DerefMut for ConventionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.calculator
    }
}

impl Drop for ConventionGuard<'_> {
    fn drop(&mut self) {
        self.calculator.set_convention(self.previous);
    }
}
