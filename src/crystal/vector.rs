/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Vector3D type for Cartesian positions and reciprocal-space directions

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Represents a 3D vector in an orthonormal (Cartesian) frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3D {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vector3D {
    /// Create a new 3D vector
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create a new vector at the origin
    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Calculate the length (magnitude) of the vector
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Calculate the dot product with another vector
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Calculate the cross product with another vector
    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Normalize the vector to unit length
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 1e-10 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            Self::origin()
        }
    }

    /// Any unit vector perpendicular to this one
    pub fn perpendicular(&self) -> Self {
        let n = self.normalize();
        // cross with the coordinate axis least aligned with n
        let axis = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
            Self::new(1.0, 0.0, 0.0)
        } else if n.y.abs() <= n.z.abs() {
            Self::new(0.0, 1.0, 0.0)
        } else {
            Self::new(0.0, 0.0, 1.0)
        };
        n.cross(&axis).normalize()
    }
}

impl fmt::Display for Vector3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for Vector3D {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector3D> for Vector3<f64> {
    fn from(v: Vector3D) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl Add for Vector3D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vector3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f64> for Vector3D {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_operations() {
        let v1 = Vector3D::new(1.0, 2.0, 3.0);
        let v2 = Vector3D::new(4.0, 5.0, 6.0);

        assert_relative_eq!(v1.length(), 3.741657, epsilon = 1e-6);
        assert_relative_eq!(v1.dot(&v2), 32.0, epsilon = 1e-12);

        let cross = v1.cross(&v2);
        assert_relative_eq!(cross.x, -3.0, epsilon = 1e-12);
        assert_relative_eq!(cross.y, 6.0, epsilon = 1e-12);
        assert_relative_eq!(cross.z, -3.0, epsilon = 1e-12);

        assert_relative_eq!(v1.normalize().length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nalgebra_conversion() {
        let v = Vector3D::new(1.0, -2.0, 0.5);
        let n: Vector3<f64> = v.into();
        assert_relative_eq!(n.norm(), v.length(), epsilon = 1e-12);
        assert_eq!(Vector3D::from(n.cross(&Vector3::z())), v.cross(&Vector3D::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_perpendicular() {
        for v in [
            Vector3D::new(0.0, 0.0, 2.0),
            Vector3D::new(1.0, 1.0, 0.0),
            Vector3D::new(-0.3, 4.0, 1.2),
        ] {
            let p = v.perpendicular();
            assert_relative_eq!(p.length(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(p.dot(&v), 0.0, epsilon = 1e-12);
        }
    }
}
