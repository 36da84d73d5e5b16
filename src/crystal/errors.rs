/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the crystal module

/// Error types for the crystal module
#[derive(Debug, thiserror::Error)]
pub enum CrystalError {
    /// Malformed or empty structure, or an element label the active
    /// scattering table cannot resolve
    #[error("Invalid structure: {0}")]
    StructureInvalid(String),

    /// Atom count or atom identity changed between refreshes
    #[error("Structure changed since initialization: {0}")]
    StructureInconsistent(String),

    #[error("Invalid symmetry operation: {0}")]
    InvalidSymmetry(String),
}

/// Result type for crystal operations
pub type Result<T> = std::result::Result<T, CrystalError>;
