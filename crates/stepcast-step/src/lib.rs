#![warn(missing_docs)]

//! STEP AP203 export for the stepcast pipeline.
//!
//! Maps the B-rep topology directly to STEP entities, no tessellation:
//!
//! - `Vertex` → `VERTEX_POINT` + `CARTESIAN_POINT`
//! - `Edge` → `EDGE_CURVE` + `LINE`
//! - `Face` → `ADVANCED_FACE` + `FACE_OUTER_BOUND` / `FACE_BOUND` + `PLANE`
//! - solid → `CLOSED_SHELL` + `MANIFOLD_SOLID_BREP`
//! - shell → `OPEN_SHELL` / `CLOSED_SHELL` + `SHELL_BASED_SURFACE_MODEL`
//!
//! [`export_step`] writes atomically: the entity stream goes to a
//! sibling temp file first and is renamed over the target, so a failed
//! export never leaves a partial file at the output path.

mod error;
mod writer;

pub use error::ExportError;
pub use writer::write_step;

use std::fs;
use std::path::Path;

use stepcast_brep::ClassifiedShape;
use tracing::info;

/// What ended up in the STEP file, re-derived from the exported shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDiagnostics {
    /// "Solid" or "Shell".
    pub shape_type: &'static str,
    /// Number of faces written.
    pub faces: usize,
    /// Number of edges written.
    pub edges: usize,
    /// Whether the exported shell is watertight.
    pub is_closed: bool,
}

/// Serialize the shape to an in-memory STEP document.
///
/// # Errors
///
/// Fails only when formatting into the buffer fails.
pub fn write_step_to_buffer(
    classified: &ClassifiedShape,
) -> Result<(String, StepDiagnostics), ExportError> {
    let mut buf = Vec::new();
    let diagnostics = write_step(classified, &mut buf).map_err(ExportError::Encode)?;
    // The writer only emits ASCII
    let text = String::from_utf8(buf).map_err(|e| {
        ExportError::Encode(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    Ok((text, diagnostics))
}

/// Export the shape as a STEP file at `path`, atomically.
///
/// # Errors
///
/// Returns [`ExportError`] when the temp file cannot be written or
/// renamed over the target. The target path is left untouched on
/// failure.
pub fn export_step(
    classified: &ClassifiedShape,
    path: &Path,
) -> Result<StepDiagnostics, ExportError> {
    let (text, diagnostics) = write_step_to_buffer(classified)?;

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp_name);

    fs::write(&tmp, text.as_bytes()).map_err(|source| ExportError::Io {
        path: tmp.clone(),
        source,
    })?;

    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(ExportError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    info!(
        path = %path.display(),
        shape_type = diagnostics.shape_type,
        faces = diagnostics.faces,
        edges = diagnostics.edges,
        closed = diagnostics.is_closed,
        "wrote STEP file"
    );

    Ok(diagnostics)
}
