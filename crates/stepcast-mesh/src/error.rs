//! Mesh loading errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a mesh from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input file does not exist.
    #[error("mesh file not found: {path}")]
    FileNotFound {
        /// The path that was tried.
        path: PathBuf,
    },

    /// Underlying I/O failure.
    #[error("i/o error reading mesh: {0}")]
    Io(#[from] std::io::Error),

    /// The file content is not a recognizable STL stream.
    #[error("invalid STL content: {reason}")]
    InvalidContent {
        /// What was wrong with the content.
        reason: String,
    },

    /// The binary header promised more facets than the file holds.
    #[error("truncated binary STL: expected {expected} facets, got {got}")]
    TruncatedFacets {
        /// Facet count declared in the header.
        expected: u32,
        /// Facets actually present.
        got: u32,
    },

    /// An ASCII STL coordinate failed to parse.
    #[error("malformed STL coordinate: {0}")]
    MalformedCoordinate(#[from] std::num::ParseFloatError),
}

impl LoadError {
    pub(crate) fn invalid_content(reason: impl Into<String>) -> Self {
        LoadError::InvalidContent {
            reason: reason.into(),
        }
    }
}
