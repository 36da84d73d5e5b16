/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Utility functions shared across the crate

pub mod constants;
pub mod errors;
pub mod math;

pub use errors::{Result, UtilsError};
pub use math::{integrate_simpson, spherical_bessel_j};
