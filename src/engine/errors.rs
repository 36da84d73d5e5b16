/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the engine module

use crate::crystal::errors::CrystalError;
use crate::reflections::errors::ReflectionError;
use crate::scattering::errors::ScatteringError;

/// Error types for the engine module
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Crystal(#[from] CrystalError),

    #[error(transparent)]
    Scattering(#[from] ScatteringError),

    #[error(transparent)]
    Reflection(#[from] ReflectionError),

    /// Caller-supplied per-reflection data does not match the reflection set
    #[error("Dimension mismatch: expected {expected} entries, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Anomalous corrections in the calculator belong to another crystal
    /// revision
    #[error("Calculator is stale: crystal revision {crystal}, calculator revision {calculator:?}")]
    StaleCalculator { crystal: u64, calculator: Option<u64> },
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
