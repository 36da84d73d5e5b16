/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Reflection lists
//!
//! A [`ReflectionSet`] is either supplied verbatim by the caller or
//! generated from a resolution cutoff. Its order is the index space of every
//! per-reflection output.

pub mod errors;

pub use errors::{ReflectionError, Result};

use crate::crystal::cell::UnitCell;
use crate::crystal::symmetry::SpaceGroup;
use log::debug;
use serde::{Deserialize, Serialize};

/// Miller index `(h, k, l)`
pub type MillerIndex = [i32; 3];

/// Relative slack on the resolution sphere so that reflections exactly at
/// `d_min` survive rounding
const RESOLUTION_TOLERANCE: f64 = 1e-10;

/// Ordered list of Miller indices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectionSet {
    indices: Vec<MillerIndex>,
    #[serde(default)]
    d_min: Option<f64>,
}

impl ReflectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_indices(indices: Vec<MillerIndex>) -> Self {
        Self {
            indices,
            d_min: None,
        }
    }

    /// Store `indices` verbatim; duplicates and order are kept
    pub fn set_explicit(&mut self, indices: Vec<MillerIndex>) {
        self.indices = indices;
        self.d_min = None;
    }

    /// Generate every reflection with `d >= d_min` that is not
    /// systematically absent
    ///
    /// The full sphere is generated (no Friedel or Laue reduction), ordered
    /// by h, then k, then l, ascending. (0,0,0) is excluded.
    pub fn set_resolution(&mut self, d_min: f64, cell: &UnitCell, space_group: &SpaceGroup) -> Result<()> {
        if !d_min.is_finite() || d_min <= 0.0 {
            return Err(ReflectionError::InvalidResolution(d_min));
        }

        let [a, b, c, ..] = cell.parameters();
        // |h| = |h* · a| <= a / d_min
        let limit = [a, b, c].map(|length| (length / d_min).ceil() as i32);
        let max_d_star_sq = (1.0 + RESOLUTION_TOLERANCE) / (d_min * d_min);

        let mut indices = Vec::new();
        for h in -limit[0]..=limit[0] {
            for k in -limit[1]..=limit[1] {
                for l in -limit[2]..=limit[2] {
                    if h == 0 && k == 0 && l == 0 {
                        continue;
                    }
                    let hkl = [h, k, l];
                    if cell.d_star_sq(&[h as f64, k as f64, l as f64]) > max_d_star_sq {
                        continue;
                    }
                    if space_group.is_systematically_absent(&hkl) {
                        continue;
                    }
                    indices.push(hkl);
                }
            }
        }

        debug!(
            "Generated {} reflections to d_min = {} Å (|h|,|k|,|l| <= {:?})",
            indices.len(),
            d_min,
            limit
        );
        self.indices = indices;
        self.d_min = Some(d_min);
        Ok(())
    }

    pub fn indices(&self) -> &[MillerIndex] {
        &self.indices
    }

    /// Resolution the set was generated for, `None` for explicit lists
    pub fn d_min(&self) -> Option<f64> {
        self.d_min
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MillerIndex> {
        self.indices.iter()
    }
}

impl<'a> IntoIterator for &'a ReflectionSet {
    type Item = &'a MillerIndex;
    type IntoIter = std::slice::Iter<'a, MillerIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter()
    }
}
