//! STEP export errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while writing a STEP file.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing or renaming the output file failed.
    #[error("failed to write STEP file {path}: {source}")]
    Io {
        /// The path involved in the failure.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing the entity stream failed.
    #[error("failed to encode STEP data: {0}")]
    Encode(#[source] std::io::Error),
}
