/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Mathematical utility functions
//!
//! Symmetric-tensor packing for displacement parameters, spherical Bessel
//! functions and Simpson quadrature for radial Fourier-Bessel transforms.

use super::errors::{Result, UtilsError};
use nalgebra::Matrix3;

/// Expand a symmetric tensor stored as (11,22,33,12,13,23)
pub fn sym6_to_matrix(u: &[f64; 6]) -> Matrix3<f64> {
    Matrix3::new(u[0], u[3], u[4], u[3], u[1], u[5], u[4], u[5], u[2])
}

/// Pack a symmetric matrix as (11,22,33,12,13,23)
pub fn matrix_to_sym6(m: &Matrix3<f64>) -> [f64; 6] {
    [m[(0, 0)], m[(1, 1)], m[(2, 2)], m[(0, 1)], m[(0, 2)], m[(1, 2)]]
}

/// Spherical Bessel function of the first kind j_n(x)
///
/// Uses the power series below x = 1, where upward recurrence loses
/// precision, and upward recurrence from j_0 and j_1 otherwise.
pub fn spherical_bessel_j(n: i32, x: f64) -> Result<f64> {
    if n < 0 {
        return Err(UtilsError::Math(format!(
            "Invalid order for spherical Bessel function: n={}",
            n
        )));
    }

    if x.abs() < 1e-10 {
        return Ok(if n == 0 { 1.0 } else { 0.0 });
    }

    if x.abs() < 1.0 {
        return Ok(spherical_bessel_j_series(n, x));
    }

    Ok(spherical_bessel_j_recurrence(n, x))
}

fn spherical_bessel_j_recurrence(n: i32, x: f64) -> f64 {
    let j0 = x.sin() / x;
    if n == 0 {
        return j0;
    }

    let j1 = (x.sin() - x * x.cos()) / (x * x);
    if n == 1 {
        return j1;
    }

    // j_{n+1}(x) = (2n+1)/x * j_n(x) - j_{n-1}(x)
    let mut j_prev = j0;
    let mut j_curr = j1;
    for i in 1..n {
        let j_next = (2 * i + 1) as f64 / x * j_curr - j_prev;
        j_prev = j_curr;
        j_curr = j_next;
    }
    j_curr
}

fn spherical_bessel_j_series(n: i32, x: f64) -> f64 {
    let x2 = x * x;
    let mut sum = 0.0;
    let mut term = 1.0;

    for k in 0..30 {
        if k > 0 {
            term *= -x2 / (2.0 * k as f64 * (2.0 * (n + k) as f64 + 1.0));
        }
        sum += term;
        if term.abs() < 1e-17 * sum.abs() {
            break;
        }
    }

    // x^n / (2n+1)!!
    let mut factor = 1.0;
    for k in 1..=n {
        factor *= x / (2 * k + 1) as f64;
    }
    factor * sum
}

/// Integrate `f` over [a, b] with composite Simpson's rule on `n` intervals
///
/// The first error returned by the integrand aborts the integration.
pub fn integrate_simpson<F>(f: F, a: f64, b: f64, n: usize) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    if n == 0 || n % 2 != 0 {
        return Err(UtilsError::Math(
            "Number of intervals for Simpson's rule must be even and positive".to_string(),
        ));
    }

    if a == b {
        return Ok(0.0);
    }

    let h = (b - a) / n as f64;
    let mut sum = f(a)? + f(b)?;

    for i in (1..n).step_by(2) {
        sum += 4.0 * f(a + i as f64 * h)?;
    }
    for i in (2..n).step_by(2) {
        sum += 2.0 * f(a + i as f64 * h)?;
    }

    Ok(sum * h / 3.0)
}
