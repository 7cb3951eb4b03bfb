//! End-to-end conversion scenarios.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use stepcast::{convert, convert_with, ConvertOptions, PipelineError, RepairParams};

type Triangle = [[f32; 3]; 3];

fn write_binary_stl(path: &Path, facets: &[Triangle]) {
    let mut file = File::create(path).unwrap();
    file.write_all(&[0u8; 80]).unwrap();
    file.write_all(&(facets.len() as u32).to_le_bytes()).unwrap();
    for facet in facets {
        file.write_all(&[0u8; 12]).unwrap();
        for v in facet {
            for c in v {
                file.write_all(&c.to_le_bytes()).unwrap();
            }
        }
        file.write_all(&0u16.to_le_bytes()).unwrap();
    }
}

fn cube_facets() -> Vec<Triangle> {
    let v: [[f32; 3]; 8] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
    ];
    let tris: [[usize; 3]; 12] = [
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];
    tris.iter().map(|&[a, b, c]| [v[a], v[b], v[c]]).collect()
}

#[test]
fn converts_cube_to_solid() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cube.stl");
    let output = dir.path().join("cube.step");
    write_binary_stl(&input, &cube_facets());

    let report = convert(&input, &output).unwrap();

    assert_eq!(report.facet_count, 12);
    assert_eq!(report.shape_type, "Solid");
    assert_eq!(report.faces, 6);
    assert_eq!(report.edges, 12);
    assert!(report.is_closed);
    assert!(report.shape_valid);
    assert!(report.solid_rejection.is_none());
    assert!(report.repair_skipped.is_none());

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("MANIFOLD_SOLID_BREP"));
}

#[test]
fn repair_closes_missing_facet() {
    // Eleven facets of the cube: repair fills the triangular hole and
    // the result still classifies as a solid.
    let mut facets = cube_facets();
    facets.pop();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("open.stl");
    let output = dir.path().join("open.step");
    write_binary_stl(&input, &facets);

    let report = convert(&input, &output).unwrap();

    assert_eq!(report.facet_count, 11);
    assert_eq!(report.holes_filled, 1);
    assert_eq!(report.shape_type, "Solid");
    assert!(report.is_closed);
}

#[test]
fn unfillable_hole_falls_back_to_shell() {
    let mut facets = cube_facets();
    facets.pop();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("open.stl");
    let output = dir.path().join("open.step");
    write_binary_stl(&input, &facets);

    // Forbid hole filling so the mesh stays open
    let options = ConvertOptions {
        repair: RepairParams {
            max_hole_edges: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    let report = convert_with(&input, &output, &options).unwrap();

    assert_eq!(report.holes_filled, 0);
    assert_eq!(report.shape_type, "Shell");
    assert_eq!(report.faces, 11);
    assert!(!report.is_closed);
    assert!(report.solid_rejection.is_some());

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("SHELL_BASED_SURFACE_MODEL"));
}

#[test]
fn empty_mesh_fails_reconstruction() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.stl");
    let output = dir.path().join("empty.step");
    write_binary_stl(&input, &[]);

    let err = convert(&input, &output).unwrap_err();
    assert!(matches!(err, PipelineError::Reconstruction(_)));
    assert!(!output.exists());
}

#[test]
fn missing_input_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.step");

    let err = convert(Path::new("no_such_mesh.stl"), &output).unwrap_err();
    assert!(matches!(err, PipelineError::Load(_)));
}

#[test]
fn unwritable_output_fails_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cube.stl");
    write_binary_stl(&input, &cube_facets());

    let output = dir.path().join("nope").join("cube.step");
    let err = convert(&input, &output).unwrap_err();
    assert!(matches!(err, PipelineError::Export(_)));
}

#[test]
fn loose_tolerance_closes_perturbed_seam() {
    // One corner nudged by less than the default tolerance: the seam
    // welds shut at 0.01 but stays open at a micrometer tolerance.
    let mut facets = cube_facets();
    facets[0][0][0] += 0.004;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("perturbed.stl");
    write_binary_stl(&input, &facets);

    // Hole filling disabled so only the sew tolerance decides closure
    let no_fill = RepairParams {
        max_hole_edges: 0,
        ..Default::default()
    };

    let options = ConvertOptions {
        repair: no_fill.clone(),
        ..Default::default()
    };
    let loose = convert_with(&input, &dir.path().join("loose.step"), &options).unwrap();
    assert!(loose.is_closed);

    let options = ConvertOptions {
        tolerance: 1e-6,
        repair: no_fill,
    };
    let tight = convert_with(&input, &dir.path().join("tight.step"), &options).unwrap();
    assert!(!tight.is_closed);
    assert_eq!(tight.shape_type, "Shell");
}

#[test]
fn report_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cube.stl");
    let output = dir.path().join("cube.step");
    write_binary_stl(&input, &cube_facets());

    let report = convert(&input, &output).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["shape_type"], "Solid");
    assert_eq!(json["faces"], 6);
    assert_eq!(json["edges"], 12);
    assert_eq!(json["is_closed"], true);
}
