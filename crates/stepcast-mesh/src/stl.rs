//! STL (Stereolithography) loading.
//!
//! Supports both ASCII and binary STL. The format is detected
//! automatically: ASCII files start with "solid" (after optional
//! whitespace), binary files have an 80-byte header followed by a
//! little-endian facet count. Some binary exporters put "solid" in the
//! header too, so a header containing null bytes is treated as binary
//! regardless of the prefix.
//!
//! Binary layout:
//!
//! ```text
//! UINT8[80]    - Header (ignored)
//! UINT32       - Number of triangles
//! foreach triangle
//!     REAL32[3] - Normal vector (ignored, recomputed downstream)
//!     REAL32[3] - Vertex 1
//!     REAL32[3] - Vertex 2
//!     REAL32[3] - Vertex 3
//!     UINT16    - Attribute byte count
//! end
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use stepcast_math::Point3;
use tracing::debug;

use crate::error::LoadError;
use crate::{Facet, TriangleMesh};

/// STL binary header size in bytes.
const HEADER_SIZE: usize = 80;

/// Size of one triangle record in binary STL (normal + 3 vertices + attribute).
const TRIANGLE_SIZE: usize = 50;

/// Load a triangle mesh from an STL file, autodetecting the format.
///
/// # Errors
///
/// Returns [`LoadError`] when the file is missing, unreadable, or not
/// a valid STL stream.
pub fn load_stl<P: AsRef<Path>>(path: P) -> Result<TriangleMesh, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io(e)
        }
    })?;

    let mut reader = BufReader::new(file);

    // Read enough to determine the format
    let mut header = [0u8; HEADER_SIZE + 4];
    let bytes_read = reader.read(&mut header)?;

    if bytes_read < 6 {
        return Err(LoadError::invalid_content("file too small to be valid STL"));
    }

    let header_str = String::from_utf8_lossy(&header[..bytes_read.min(HEADER_SIZE)]);
    let trimmed = header_str.trim_start();

    let mesh = if trimmed.starts_with("solid") && !is_binary_stl_header(&header[..bytes_read]) {
        // ASCII, re-read from the start
        drop(reader);
        let file = File::open(path)?;
        load_stl_ascii(BufReader::new(file))?
    } else {
        load_stl_binary_from_header(&header[..bytes_read], reader)?
    };

    debug!(facets = mesh.facet_count(), path = %path.display(), "loaded STL mesh");
    Ok(mesh)
}

/// Check if the header suggests binary STL despite starting with "solid".
fn is_binary_stl_header(header: &[u8]) -> bool {
    if header.len() < HEADER_SIZE + 4 {
        return false;
    }
    header[..HEADER_SIZE].contains(&0)
}

/// Load a binary STL given the already-read header.
fn load_stl_binary_from_header<R: Read>(
    header: &[u8],
    mut reader: R,
) -> Result<TriangleMesh, LoadError> {
    if header.len() < HEADER_SIZE + 4 {
        return Err(LoadError::invalid_content(
            "binary STL shorter than its 84-byte preamble",
        ));
    }

    // Facet count sits right after the 80-byte header
    let facet_count = u32::from_le_bytes([
        header[HEADER_SIZE],
        header[HEADER_SIZE + 1],
        header[HEADER_SIZE + 2],
        header[HEADER_SIZE + 3],
    ]);

    let mut mesh = TriangleMesh {
        facets: Vec::with_capacity(facet_count as usize),
    };

    let mut triangle_buf = [0u8; TRIANGLE_SIZE];
    for i in 0..facet_count {
        let bytes_read = read_fully(&mut reader, &mut triangle_buf)?;
        if bytes_read < TRIANGLE_SIZE {
            return Err(LoadError::TruncatedFacets {
                expected: facet_count,
                got: i,
            });
        }

        // Skip the stored normal (12 bytes), read the 3 vertices
        let v0 = read_vertex(&triangle_buf[12..24]);
        let v1 = read_vertex(&triangle_buf[24..36]);
        let v2 = read_vertex(&triangle_buf[36..48]);
        mesh.facets.push(Facet::new(v0, v1, v2));
    }

    Ok(mesh)
}

/// Read until `buf` is full or EOF, returning the bytes read.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, LoadError> {
    let mut total = 0;
    while total < buf.len() {
        let n = reader.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// Read a vertex from 12 bytes (3 little-endian f32s).
fn read_vertex(buf: &[u8]) -> Point3 {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Point3::new(f64::from(x), f64::from(y), f64::from(z))
}

/// Load an ASCII STL stream.
fn load_stl_ascii<R: BufRead>(reader: R) -> Result<TriangleMesh, LoadError> {
    let mut mesh = TriangleMesh::new();
    let mut in_facet = false;
    let mut in_loop = false;
    let mut corners: Vec<Point3> = Vec::with_capacity(3);

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        match parts[0].to_lowercase().as_str() {
            "facet" => {
                in_facet = true;
                // Stored normal is ignored, recomputed downstream
            }
            "outer" => {
                if parts.len() >= 2 && parts[1].eq_ignore_ascii_case("loop") {
                    in_loop = true;
                    corners.clear();
                }
            }
            "vertex" => {
                if in_loop && parts.len() >= 4 {
                    let x: f64 = parts[1].parse()?;
                    let y: f64 = parts[2].parse()?;
                    let z: f64 = parts[3].parse()?;
                    corners.push(Point3::new(x, y, z));
                }
            }
            "endloop" => {
                in_loop = false;
            }
            "endfacet" => {
                if in_facet && corners.len() == 3 {
                    mesh.facets.push(Facet::new(corners[0], corners[1], corners[2]));
                }
                in_facet = false;
            }
            "endsolid" => {
                break;
            }
            _ => {
                // Ignore unknown lines
            }
        }
    }

    Ok(mesh)
}
