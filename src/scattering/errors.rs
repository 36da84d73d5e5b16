/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the scattering module

/// Error types for the scattering module
#[derive(Debug, thiserror::Error)]
pub enum ScatteringError {
    /// One or more atoms matched no databank type
    #[error("Atom type assignment failed for: {}", .0.join(", "))]
    AtomTypeAssignment(Vec<String>),

    #[error("Unknown scattering type: {0}")]
    UnknownScatteringType(String),

    #[error("Unknown scattering table: {0}")]
    UnknownTable(String),

    #[error("Databank parse error at line {line}: {reason}")]
    DatabankParse { line: usize, reason: String },

    #[error("Anomalous corrections for {actual} atoms, expected {expected}")]
    AnomalousLength { expected: usize, actual: usize },

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Calculation error: {0}")]
    Calculation(String),
}

impl From<crate::utils::UtilsError> for ScatteringError {
    fn from(err: crate::utils::UtilsError) -> Self {
        ScatteringError::Calculation(err.to_string())
    }
}

/// Result type for scattering operations
pub type Result<T> = std::result::Result<T, ScatteringError>;
