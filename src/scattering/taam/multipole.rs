/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Radial Fourier-Bessel transforms and real spherical harmonics
//!
//! Radial density functions are normalised Slater functions
//! `R(r) = ζ^(n+3)/(n+2)! r^n exp(-ζr)`, so that `∫ R r² dr = 1`.

use crate::crystal::vector::Vector3D;
use crate::utils::math::{integrate_simpson, spherical_bessel_j};
use crate::utils::{Result, UtilsError};
use std::f64::consts::PI;

/// Number of Simpson intervals for the radial integral
const RADIAL_INTERVALS: usize = 2000;

/// The integrand is negligible beyond `(n + RADIAL_DECAY) / ζ`
const RADIAL_DECAY: f64 = 40.0;

/// Multipole populations in the order P10 P11 P1-1 P20 P21 P2-1 P22 P2-2
pub type Multipoles = [f64; 8];

fn factorial(n: i32) -> f64 {
    (2..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// `⟨j_l⟩(K) = ∫ R(r) j_l(Kr) r² dr` for a normalised Slater function
///
/// `K` is in Å⁻¹ including the 2π factor.
pub fn fourier_bessel(l: i32, n: i32, zeta: f64, k: f64) -> Result<f64> {
    if l < 0 || n < 0 || zeta <= 0.0 {
        return Err(UtilsError::Math(format!(
            "invalid Slater transform: l={}, n={}, zeta={}",
            l, n, zeta
        )));
    }
    if k.abs() < 1e-12 {
        return Ok(if l == 0 { 1.0 } else { 0.0 });
    }

    let norm = zeta.powi(n + 3) / factorial(n + 2);
    let r_max = (n as f64 + RADIAL_DECAY) / zeta;
    let integral = integrate_simpson(
        |r| Ok(r.powi(n + 2) * (-zeta * r).exp() * spherical_bessel_j(l, k * r)?),
        0.0,
        r_max,
        RADIAL_INTERVALS,
    )?;
    Ok(norm * integral)
}

/// Real spherical harmonics of degree `l` (orthonormal on the unit sphere)
/// for a unit vector, in the order m = 0, 1, -1, 2, -2
pub fn real_harmonics(l: i32, u: &Vector3D) -> Vec<f64> {
    let (x, y, z) = (u.x, u.y, u.z);
    match l {
        0 => vec![(1.0 / (4.0 * PI)).sqrt()],
        1 => {
            let c = (3.0 / (4.0 * PI)).sqrt();
            vec![c * z, c * x, c * y]
        }
        2 => {
            let c = (15.0 / (4.0 * PI)).sqrt();
            vec![
                (5.0 / (16.0 * PI)).sqrt() * (3.0 * z * z - 1.0),
                c * x * z,
                c * y * z,
                (15.0 / (16.0 * PI)).sqrt() * (x * x - y * y),
                c * x * y,
            ]
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_monopole_normalisation() {
        assert_eq!(fourier_bessel(0, 2, 5.9, 0.0).unwrap(), 1.0);
        assert_eq!(fourier_bessel(2, 2, 5.9, 0.0).unwrap(), 0.0);
        assert!(fourier_bessel(-1, 2, 5.9, 1.0).is_err());
        // the quadrature itself integrates the normalised density to one
        let nearly_zero = fourier_bessel(0, 2, 5.9, 1e-6).unwrap();
        assert_relative_eq!(nearly_zero, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_slater_monopole_closed_form() {
        // n = 0: ⟨j0⟩ = ζ⁴ / (ζ² + K²)²
        for &k in &[0.5, 2.0, 6.0, 12.0] {
            let zeta: f64 = 3.78;
            let expected = zeta.powi(4) / (zeta * zeta + k * k).powi(2);
            assert_relative_eq!(fourier_bessel(0, 0, zeta, k).unwrap(), expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_kappa_scaling() {
        // ⟨j0⟩(K/κ; ζ) == ⟨j0⟩(K; κζ)
        let (k, zeta, kappa) = (4.0, 5.9, 1.1);
        assert_relative_eq!(
            fourier_bessel(0, 2, zeta, k / kappa).unwrap(),
            fourier_bessel(0, 2, kappa * zeta, k).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_harmonics_are_normalised() {
        // sum over m of y_lm² is (2l+1)/4π for any direction
        let u = Vector3D::new(0.3, -0.5, 0.8).normalize();
        for l in 0..=2 {
            let sum: f64 = real_harmonics(l, &u).iter().map(|y| y * y).sum();
            assert_relative_eq!(sum, (2 * l + 1) as f64 / (4.0 * PI), epsilon = 1e-12);
        }
        assert!(real_harmonics(3, &u).is_empty());
    }
}
