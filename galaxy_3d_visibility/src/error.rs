//! Error types for the Galaxy3D visibility core
//!
//! Geometric degeneracy (off-screen polygons, coincident objects) is never an
//! error: those operations return a "no effect" result instead. The variants
//! below cover rejected configuration, malformed input and the optional
//! spatial-index self check.

use std::fmt;

/// Result type for Galaxy3D visibility operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D visibility errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Screen dimensions rejected by a coverage buffer (zero or too large)
    InvalidDimensions(String),

    /// Configuration value out of range
    InvalidConfig(String),

    /// Occluder geometry that cannot be used (bad index, polygon too small)
    InvalidGeometry(String),

    /// Unknown or stale visibility object handle
    InvalidObject(String),

    /// Spatial index invariant broken (reported by the self check only)
    TreeInconsistency(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDimensions(msg) => write!(f, "Invalid dimensions: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
            Error::InvalidObject(msg) => write!(f, "Invalid object: {}", msg),
            Error::TreeInconsistency(msg) => write!(f, "Tree inconsistency: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
