/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the reflections module

/// Error types for the reflections module
#[derive(Debug, thiserror::Error)]
pub enum ReflectionError {
    #[error("Invalid resolution cutoff: d_min = {0} (must be positive and finite)")]
    InvalidResolution(f64),
}

/// Result type for reflection operations
pub type Result<T> = std::result::Result<T, ReflectionError>;
