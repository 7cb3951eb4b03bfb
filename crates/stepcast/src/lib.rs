#![warn(missing_docs)]

//! STL to STEP conversion pipeline.
//!
//! [`convert`] runs five stages over an STL file:
//!
//! 1. load the triangle mesh,
//! 2. best-effort repair (holes, duplicates, degenerates, winding),
//! 3. sew the mesh into a B-rep shape,
//! 4. clean up and classify it as a solid or a shell,
//! 5. write the result as STEP AP203.
//!
//! Load, reconstruction, and export failures abort the conversion; a
//! failed repair never does, it only shows up in the report.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use stepcast_brep::{classify, remove_splitter, shape_from_mesh, ReconstructionError};
use stepcast_mesh::{load_stl, LoadError};
use stepcast_repair::{repair_mesh, RepairOutcome};
use stepcast_step::{export_step, ExportError};

pub use stepcast_brep::Classification;
pub use stepcast_math::DEFAULT_SEW_TOLERANCE;
pub use stepcast_repair::{RepairParams, RepairSummary};

/// A conversion stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input mesh could not be loaded.
    #[error("load stage failed: {0}")]
    Load(#[from] LoadError),

    /// The mesh could not be sewn into a shape.
    #[error("reconstruction stage failed: {0}")]
    Reconstruction(#[from] ReconstructionError),

    /// The STEP file could not be written.
    #[error("export stage failed: {0}")]
    Export(#[from] ExportError),
}

/// Tunables for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Sew tolerance for the B-rep reconstruction.
    pub tolerance: f64,
    /// Parameters for the repair pass.
    pub repair: RepairParams,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_SEW_TOLERANCE,
            repair: RepairParams::default(),
        }
    }
}

/// Everything a caller needs to know about a finished conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    /// The input STL path.
    pub input: PathBuf,
    /// The output STEP path.
    pub output: PathBuf,
    /// Facets in the loaded mesh, before repair.
    pub facet_count: usize,
    /// Why repair was skipped, when it was.
    pub repair_skipped: Option<String>,
    /// Boundary loops closed by repair.
    pub holes_filled: usize,
    /// Duplicate facets removed by repair.
    pub duplicates_removed: usize,
    /// Degenerate facets removed by repair.
    pub degenerates_removed: usize,
    /// Facets flipped by repair for winding consistency.
    pub facets_reoriented: usize,
    /// Whether splitter edges were removed from the sewn shape.
    pub splitter_removed: bool,
    /// Structural validity of the shape that was exported.
    pub shape_valid: bool,
    /// "Solid" or "Shell".
    pub shape_type: String,
    /// Why a closed shape was demoted to a shell, when it was.
    pub solid_rejection: Option<String>,
    /// Faces in the exported shape.
    pub faces: usize,
    /// Edges in the exported shape.
    pub edges: usize,
    /// Whether the exported shell is watertight.
    pub is_closed: bool,
}

/// Convert the STL at `input` into a STEP file at `output` with
/// default options.
///
/// # Errors
///
/// Returns [`PipelineError`] when loading, reconstruction, or export
/// fails. Repair failures are reported, not raised.
pub fn convert(input: &Path, output: &Path) -> Result<ConversionReport, PipelineError> {
    convert_with(input, output, &ConvertOptions::default())
}

/// [`convert`] with explicit options.
pub fn convert_with(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport, PipelineError> {
    let loaded = load_stl(input)?;
    let facet_count = loaded.facet_count();
    info!(facets = facet_count, input = %input.display(), "loaded mesh");

    let mut repaired = loaded;
    let outcome = repair_mesh(&mut repaired, &options.repair);
    let (repair_skipped, summary) = match outcome {
        RepairOutcome::Completed(summary) => (None, summary),
        RepairOutcome::Skipped { reason } => (Some(reason), RepairSummary::default()),
    };

    let welded = repaired.topology(options.repair.weld_epsilon);
    let sewn = shape_from_mesh(&welded, options.tolerance)?;
    info!(
        faces = sewn.face_count(),
        edges = sewn.edge_count(),
        "reconstructed shape"
    );

    // An invalid shape gets one splitter-removal pass and is accepted
    // as-is afterwards; validity is re-derived for the report only.
    let splitter_removed = !sewn.is_valid();
    let cleaned = if splitter_removed {
        remove_splitter(&sewn)
    } else {
        sewn
    };
    let shape_valid = cleaned.is_valid();

    let classified = classify(cleaned);
    let solid_rejection = classified.solid_error.as_ref().map(ToString::to_string);

    let diagnostics = export_step(&classified, output)?;

    let report = ConversionReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        facet_count,
        repair_skipped,
        holes_filled: summary.holes_filled,
        duplicates_removed: summary.duplicates_removed,
        degenerates_removed: summary.degenerates_removed,
        facets_reoriented: summary.facets_reoriented,
        splitter_removed,
        shape_valid,
        shape_type: diagnostics.shape_type.to_string(),
        solid_rejection,
        faces: diagnostics.faces,
        edges: diagnostics.edges,
        is_closed: diagnostics.is_closed,
    };

    info!(
        shape_type = %report.shape_type,
        faces = report.faces,
        edges = report.edges,
        closed = report.is_closed,
        "conversion finished"
    );

    Ok(report)
}
