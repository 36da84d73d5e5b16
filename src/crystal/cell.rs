/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Unit cell metric
//!
//! The orthogonalisation convention places `a` along Cartesian x and `b` in
//! the xy plane. Reciprocal vectors are expressed without the 2π factor, so
//! `|h*| = 1/d` and `sinθ/λ = |h*|/2`.

use super::errors::{CrystalError, Result};
use super::vector::Vector3D;
use crate::utils::math::{matrix_to_sym6, sym6_to_matrix};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Unit cell given by lengths (Å) and angles (degrees)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 6]", into = "[f64; 6]")]
pub struct UnitCell {
    parameters: [f64; 6],
    orthogonalization: Matrix3<f64>,
    fractionalization: Matrix3<f64>,
    volume: f64,
}

impl UnitCell {
    /// Create a unit cell from `a, b, c` (Å) and `alpha, beta, gamma` (degrees)
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<Self> {
        let parameters = [a, b, c, alpha, beta, gamma];
        if parameters.iter().any(|p| !p.is_finite()) || a <= 0.0 || b <= 0.0 || c <= 0.0 {
            return Err(CrystalError::StructureInvalid(format!(
                "unit cell lengths must be positive and finite: {:?}",
                parameters
            )));
        }

        let (ca, cb, cg) = (
            alpha.to_radians().cos(),
            beta.to_radians().cos(),
            gamma.to_radians().cos(),
        );
        let sg = gamma.to_radians().sin();
        let volume_factor = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        if volume_factor <= 1e-12 || sg.abs() < 1e-12 {
            return Err(CrystalError::StructureInvalid(format!(
                "unit cell angles do not describe a cell with positive volume: {:?}",
                parameters
            )));
        }
        let volume = a * b * c * volume_factor.sqrt();

        #[rustfmt::skip]
        let orthogonalization = Matrix3::new(
            a,   b * cg, c * cb,
            0.0, b * sg, c * (ca - cb * cg) / sg,
            0.0, 0.0,    volume / (a * b * sg),
        );
        let fractionalization = orthogonalization.try_inverse().ok_or_else(|| {
            CrystalError::StructureInvalid("singular orthogonalization matrix".to_string())
        })?;

        Ok(Self {
            parameters,
            orthogonalization,
            fractionalization,
            volume,
        })
    }

    /// `[a, b, c, alpha, beta, gamma]`
    pub fn parameters(&self) -> [f64; 6] {
        self.parameters
    }

    /// Cell volume in Å³
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Matrix whose columns are the Cartesian direct basis vectors
    pub fn orthogonalization_matrix(&self) -> &Matrix3<f64> {
        &self.orthogonalization
    }

    /// Inverse of the orthogonalization matrix; its rows are the reciprocal
    /// basis vectors
    pub fn fractionalization_matrix(&self) -> &Matrix3<f64> {
        &self.fractionalization
    }

    pub fn fractional_to_cartesian(&self, frac: &[f64; 3]) -> Vector3D {
        (self.orthogonalization * Vector3::from(*frac)).into()
    }

    pub fn cartesian_to_fractional(&self, cart: &Vector3D) -> [f64; 3] {
        (self.fractionalization * Vector3::from(*cart)).into()
    }

    /// Cartesian reciprocal-space vector of fractional indices `h`
    pub fn reciprocal_cartesian(&self, h: &[f64; 3]) -> Vector3D {
        (self.fractionalization.tr_mul(&Vector3::from(*h))).into()
    }

    /// `|h*|²` = 1/d²
    pub fn d_star_sq(&self, h: &[f64; 3]) -> f64 {
        self.fractionalization.tr_mul(&Vector3::from(*h)).norm_squared()
    }

    /// Interplanar spacing of reflection `h`, infinite for (0,0,0)
    pub fn d_spacing(&self, h: &[i32; 3]) -> f64 {
        let d_star_sq = self.d_star_sq(&[h[0] as f64, h[1] as f64, h[2] as f64]);
        if d_star_sq <= 0.0 {
            f64::INFINITY
        } else {
            1.0 / d_star_sq.sqrt()
        }
    }

    /// Reciprocal cell lengths `a*, b*, c*`
    pub fn reciprocal_lengths(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| self.fractionalization.row(i).norm())
    }

    /// Convert `U_cif` (11,22,33,12,13,23) to `U*`
    pub fn u_cif_to_u_star(&self, u_cif: &[f64; 6]) -> [f64; 6] {
        let n = Matrix3::from_diagonal(&Vector3::from(self.reciprocal_lengths()));
        matrix_to_sym6(&(n * sym6_to_matrix(u_cif) * n))
    }

    /// Convert `U*` to `U_cif`
    pub fn u_star_to_u_cif(&self, u_star: &[f64; 6]) -> [f64; 6] {
        let n_inv = Matrix3::from_diagonal(&Vector3::from(self.reciprocal_lengths().map(|r| 1.0 / r)));
        matrix_to_sym6(&(n_inv * sym6_to_matrix(u_star) * n_inv))
    }

    /// Convert `U_cart` to `U*` (U* = F U_cart Fᵀ with F the fractionalization matrix)
    pub fn u_cart_to_u_star(&self, u_cart: &[f64; 6]) -> [f64; 6] {
        let f = &self.fractionalization;
        matrix_to_sym6(&(f * sym6_to_matrix(u_cart) * f.transpose()))
    }

    /// Convert `U*` to `U_cart`
    pub fn u_star_to_u_cart(&self, u_star: &[f64; 6]) -> [f64; 6] {
        let o = &self.orthogonalization;
        matrix_to_sym6(&(o * sym6_to_matrix(u_star) * o.transpose()))
    }

    /// Equivalent isotropic displacement parameter of `U*`
    pub fn u_star_to_u_iso(&self, u_star: &[f64; 6]) -> f64 {
        let u_cart = sym6_to_matrix(u_star);
        let o = &self.orthogonalization;
        (o * u_cart * o.transpose()).trace() / 3.0
    }
}

impl TryFrom<[f64; 6]> for UnitCell {
    type Error = CrystalError;

    fn try_from(p: [f64; 6]) -> Result<Self> {
        Self::new(p[0], p[1], p[2], p[3], p[4], p[5])
    }
}

impl From<UnitCell> for [f64; 6] {
    fn from(cell: UnitCell) -> Self {
        cell.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cubic_cell() {
        let cell = UnitCell::new(5.0, 5.0, 5.0, 90.0, 90.0, 90.0).unwrap();
        assert_relative_eq!(cell.volume(), 125.0, epsilon = 1e-9);
        assert_relative_eq!(cell.d_spacing(&[1, 0, 0]), 5.0, epsilon = 1e-12);
        assert_relative_eq!(cell.d_spacing(&[1, 1, 0]), 5.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert!(cell.d_spacing(&[0, 0, 0]).is_infinite());
    }

    #[test]
    fn test_monoclinic_metric() {
        let cell = UnitCell::new(6.0, 7.0, 8.0, 90.0, 105.0, 90.0).unwrap();
        let beta = 105f64.to_radians();
        assert_relative_eq!(cell.volume(), 6.0 * 7.0 * 8.0 * beta.sin(), epsilon = 1e-9);

        // reciprocal basis is dual to the direct basis
        let frac = [0.1, 0.2, 0.3];
        let back = cell.cartesian_to_fractional(&cell.fractional_to_cartesian(&frac));
        for i in 0..3 {
            assert_relative_eq!(back[i], frac[i], epsilon = 1e-12);
        }
        let a_star = 1.0 / (6.0 * beta.sin());
        assert_relative_eq!(cell.reciprocal_lengths()[0], a_star, epsilon = 1e-12);
    }

    #[test]
    fn test_fractionalization_inverts_orthogonalization() {
        let cell = UnitCell::new(6.0, 7.5, 9.0, 80.0, 95.0, 110.0).unwrap();
        let product = cell.fractionalization_matrix() * cell.orthogonalization_matrix();
        assert_relative_eq!(product, Matrix3::identity(), epsilon = 1e-12);
        // columns of O are the direct basis vectors
        assert_relative_eq!(cell.orthogonalization_matrix().column(1).norm(), 7.5, epsilon = 1e-12);
        assert_relative_eq!(cell.orthogonalization_matrix().determinant(), cell.volume(), epsilon = 1e-9);
    }

    #[test]
    fn test_adp_conversions_round_trip() {
        let cell = UnitCell::new(6.0, 7.5, 9.0, 80.0, 95.0, 110.0).unwrap();
        let u_cart = [0.02, 0.03, 0.025, 0.004, -0.002, 0.001];

        let u_star = cell.u_cart_to_u_star(&u_cart);
        let back = cell.u_star_to_u_cart(&u_star);
        for i in 0..6 {
            assert_relative_eq!(back[i], u_cart[i], epsilon = 1e-12);
        }

        let u_cif = cell.u_star_to_u_cif(&u_star);
        let again = cell.u_cif_to_u_star(&u_cif);
        for i in 0..6 {
            assert_relative_eq!(again[i], u_star[i], epsilon = 1e-14);
        }
    }

    #[test]
    fn test_isotropic_u_star_is_isotropic_in_cartesian() {
        let cell = UnitCell::new(6.0, 7.5, 9.0, 80.0, 95.0, 110.0).unwrap();
        let u_star = cell.u_cart_to_u_star(&[0.05, 0.05, 0.05, 0.0, 0.0, 0.0]);
        assert_relative_eq!(cell.u_star_to_u_iso(&u_star), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_cells() {
        assert!(UnitCell::new(0.0, 5.0, 5.0, 90.0, 90.0, 90.0).is_err());
        assert!(UnitCell::new(5.0, 5.0, 5.0, 120.0, 120.0, 120.0).is_err());
        assert!(UnitCell::new(5.0, f64::NAN, 5.0, 90.0, 90.0, 90.0).is_err());
    }

    #[test]
    fn test_serde_as_parameter_array() {
        let cell: UnitCell = serde_json::from_str("[5.0, 6.0, 7.0, 90.0, 90.0, 90.0]").unwrap();
        assert_relative_eq!(cell.volume(), 210.0, epsilon = 1e-9);
        assert_eq!(
            serde_json::to_string(&cell).unwrap(),
            "[5.0,6.0,7.0,90.0,90.0,90.0]"
        );
        assert!(serde_json::from_str::<UnitCell>("[-5.0, 6.0, 7.0, 90.0, 90.0, 90.0]").is_err());
    }
}
