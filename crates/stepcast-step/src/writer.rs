//! STEP entity stream serialization.

use std::collections::HashMap;
use std::io::{self, Write};

use stepcast_brep::{Classification, ClassifiedShape};
use stepcast_geom::Plane;
use stepcast_topo::{EdgeId, HalfEdgeId, Orientation, Topology, VertexId};

/// Write the classified shape as STEP AP203 to `writer`, returning
/// diagnostics describing the exported geometry.
pub fn write_step<W: Write>(
    classified: &ClassifiedShape,
    writer: &mut W,
) -> io::Result<crate::StepDiagnostics> {
    let shape = &classified.shape;
    let topo = &shape.topology;
    let mut eid = EntityCounter::new();

    writeln!(writer, "ISO-10303-21;")?;
    writeln!(writer, "HEADER;")?;
    writeln!(writer, "FILE_DESCRIPTION(('stepcast B-rep export'),'2;1');")?;
    writeln!(writer, "FILE_NAME('shape.step','',(''),(''),'',")?;
    writeln!(writer, "  'stepcast','');")?;
    writeln!(writer, "FILE_SCHEMA(('AUTOMOTIVE_DESIGN'));")?;
    writeln!(writer, "ENDSEC;")?;
    writeln!(writer, "DATA;")?;

    // Vertex entities
    let mut vertex_eids: HashMap<VertexId, u64> = HashMap::new();
    for (vid, vertex) in &topo.vertices {
        let p = vertex.point;
        let pt_eid = eid.next();
        writeln!(
            writer,
            "#{pt_eid}=CARTESIAN_POINT('',({:.6},{:.6},{:.6}));",
            p.x, p.y, p.z
        )?;
        let vx_eid = eid.next();
        writeln!(writer, "#{vx_eid}=VERTEX_POINT('',#{pt_eid});")?;
        vertex_eids.insert(vid, vx_eid);
    }

    // Edge entities: one EDGE_CURVE per twinned pair, oriented along
    // the first half-edge of the pair; unpaired boundary half-edges
    // get their own EDGE_CURVE.
    let mut edge_eids: HashMap<EdgeId, (u64, VertexId)> = HashMap::new();
    let mut boundary_eids: HashMap<HalfEdgeId, u64> = HashMap::new();

    for (edge_id, edge) in &topo.edges {
        let he = edge.half_edges.0;
        let origin = topo.half_edges[he].origin;
        let dest = topo.half_edge_dest(he);
        let ec_eid = write_edge_curve(writer, topo, origin, dest, &vertex_eids, &mut eid)?;
        edge_eids.insert(edge_id, (ec_eid, origin));
    }
    for he_id in topo.half_edges.keys() {
        if topo.half_edges[he_id].twin.is_some() {
            continue;
        }
        let origin = topo.half_edges[he_id].origin;
        let dest = topo.half_edge_dest(he_id);
        let ec_eid = write_edge_curve(writer, topo, origin, dest, &vertex_eids, &mut eid)?;
        boundary_eids.insert(he_id, ec_eid);
    }

    // Face entities
    let mut face_eids: Vec<u64> = Vec::new();
    for (face_id, face) in &topo.faces {
        let plane = shape.geometry.surface(face.surface_index);
        let surf_eid = write_plane(writer, plane, &mut eid)?;

        let mut bound_eids: Vec<u64> = Vec::new();
        for (loop_index, loop_id) in topo.face_loops(face_id).into_iter().enumerate() {
            let mut oriented: Vec<u64> = Vec::new();
            for he in topo.loop_half_edges(loop_id) {
                let (ec_eid, forward) = match topo.half_edges[he].edge {
                    Some(edge_id) => {
                        let (ec_eid, canonical_origin) = edge_eids[&edge_id];
                        (ec_eid, topo.half_edges[he].origin == canonical_origin)
                    }
                    None => (boundary_eids[&he], true),
                };
                let oe_eid = eid.next();
                let orient = if forward { ".T." } else { ".F." };
                writeln!(writer, "#{oe_eid}=ORIENTED_EDGE('',*,*,#{ec_eid},{orient});")?;
                oriented.push(oe_eid);
            }

            let loop_eid = eid.next();
            let refs: Vec<String> = oriented.iter().map(|e| format!("#{e}")).collect();
            writeln!(writer, "#{loop_eid}=EDGE_LOOP('',({}));", refs.join(","))?;

            let bound_eid = eid.next();
            let kind = if loop_index == 0 {
                "FACE_OUTER_BOUND"
            } else {
                "FACE_BOUND"
            };
            writeln!(writer, "#{bound_eid}={kind}('',#{loop_eid},.T.);")?;
            bound_eids.push(bound_eid);
        }

        let same_sense = match face.orientation {
            Orientation::Forward => ".T.",
            Orientation::Reversed => ".F.",
        };
        let face_eid = eid.next();
        let refs: Vec<String> = bound_eids.iter().map(|e| format!("#{e}")).collect();
        writeln!(
            writer,
            "#{face_eid}=ADVANCED_FACE('',({}),#{surf_eid},{same_sense});",
            refs.join(",")
        )?;
        face_eids.push(face_eid);
    }

    // Shell and model entity: solids get a manifold B-rep, everything
    // else a shell-based surface model
    let is_closed = shape.is_closed();
    let face_refs: Vec<String> = face_eids.iter().map(|e| format!("#{e}")).collect();
    let face_list = face_refs.join(",");

    let shell_eid = eid.next();
    let shell_kind = if is_closed { "CLOSED_SHELL" } else { "OPEN_SHELL" };
    writeln!(writer, "#{shell_eid}={shell_kind}('',({face_list}));")?;

    let (model_eid, rep_kind) = match classified.classification {
        Classification::Solid => {
            let brep_eid = eid.next();
            writeln!(writer, "#{brep_eid}=MANIFOLD_SOLID_BREP('Shape',#{shell_eid});")?;
            (brep_eid, "ADVANCED_BREP_SHAPE_REPRESENTATION")
        }
        Classification::Shell => {
            let model = eid.next();
            writeln!(
                writer,
                "#{model}=SHELL_BASED_SURFACE_MODEL('Shape',(#{shell_eid}));"
            )?;
            (model, "MANIFOLD_SURFACE_SHAPE_REPRESENTATION")
        }
    };

    // Units context
    let len_unit = eid.next();
    writeln!(
        writer,
        "#{len_unit}=(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT(.MILLI.,.METRE.));"
    )?;
    let angle_unit = eid.next();
    writeln!(
        writer,
        "#{angle_unit}=(NAMED_UNIT(*)PLANE_ANGLE_UNIT()SI_UNIT($,.RADIAN.));"
    )?;
    let solid_angle_unit = eid.next();
    writeln!(
        writer,
        "#{solid_angle_unit}=(NAMED_UNIT(*)SI_UNIT($,.STERADIAN.)SOLID_ANGLE_UNIT());"
    )?;
    let uncertainty = eid.next();
    writeln!(writer, "#{uncertainty}=UNCERTAINTY_MEASURE_WITH_UNIT(LENGTH_MEASURE(1.E-07),#{len_unit},'distance_accuracy_value','confusion accuracy');")?;
    let rep_context = eid.next();
    writeln!(writer, "#{rep_context}=(GEOMETRIC_REPRESENTATION_CONTEXT(3)GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#{uncertainty}))GLOBAL_UNIT_ASSIGNED_CONTEXT((#{len_unit},#{angle_unit},#{solid_angle_unit}))REPRESENTATION_CONTEXT('Context3D','3D Context with 1e-7 uncertainty'));")?;

    let shape_rep = eid.next();
    writeln!(
        writer,
        "#{shape_rep}={rep_kind}('Shape',(#{model_eid}),#{rep_context});"
    )?;

    // Product structure linking the representation to a product
    let app_ctx = eid.next();
    writeln!(
        writer,
        "#{app_ctx}=APPLICATION_CONTEXT('core data for automotive mechanical design processes');"
    )?;
    let app_proto = eid.next();
    writeln!(writer, "#{app_proto}=APPLICATION_PROTOCOL_DEFINITION('international standard','automotive_design',2000,#{app_ctx});")?;
    let prod_ctx = eid.next();
    writeln!(writer, "#{prod_ctx}=PRODUCT_CONTEXT('',#{app_ctx},'mechanical');")?;
    let product = eid.next();
    writeln!(
        writer,
        "#{product}=PRODUCT('Shape','Shape','',(#{prod_ctx}));"
    )?;
    let pdf = eid.next();
    writeln!(
        writer,
        "#{pdf}=PRODUCT_DEFINITION_FORMATION('','',#{product});"
    )?;
    let pdc = eid.next();
    writeln!(
        writer,
        "#{pdc}=PRODUCT_DEFINITION_CONTEXT('part definition',#{app_ctx},'design');"
    )?;
    let prod_def = eid.next();
    writeln!(
        writer,
        "#{prod_def}=PRODUCT_DEFINITION('design','',#{pdf},#{pdc});"
    )?;
    let pds = eid.next();
    writeln!(writer, "#{pds}=PRODUCT_DEFINITION_SHAPE('','',#{prod_def});")?;
    let sdr = eid.next();
    writeln!(
        writer,
        "#{sdr}=SHAPE_DEFINITION_REPRESENTATION(#{pds},#{shape_rep});"
    )?;

    writeln!(writer, "ENDSEC;")?;
    writeln!(writer, "END-ISO-10303-21;")?;

    Ok(crate::StepDiagnostics {
        shape_type: classified.classification.shape_type(),
        faces: shape.face_count(),
        edges: shape.edge_count(),
        is_closed,
    })
}

struct EntityCounter(u64);

impl EntityCounter {
    fn new() -> Self {
        EntityCounter(0)
    }
    fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// EDGE_CURVE between two vertices along the straight line joining them.
fn write_edge_curve<W: Write>(
    writer: &mut W,
    topo: &Topology,
    origin: VertexId,
    dest: VertexId,
    vertex_eids: &HashMap<VertexId, u64>,
    eid: &mut EntityCounter,
) -> io::Result<u64> {
    let p0 = topo.vertices[origin].point;
    let p1 = topo.vertices[dest].point;
    let dir = p1 - p0;
    let length = dir.norm();
    let d = if length > f64::EPSILON {
        dir / length
    } else {
        stepcast_math::Vec3::z()
    };

    let pt_eid = eid.next();
    writeln!(
        writer,
        "#{pt_eid}=CARTESIAN_POINT('',({:.6},{:.6},{:.6}));",
        p0.x, p0.y, p0.z
    )?;
    let dir_eid = eid.next();
    writeln!(
        writer,
        "#{dir_eid}=DIRECTION('',({:.6},{:.6},{:.6}));",
        d.x, d.y, d.z
    )?;
    let vec_eid = eid.next();
    writeln!(writer, "#{vec_eid}=VECTOR('',#{dir_eid},{length:.6});")?;
    let line_eid = eid.next();
    writeln!(writer, "#{line_eid}=LINE('',#{pt_eid},#{vec_eid});")?;

    let ec_eid = eid.next();
    writeln!(
        writer,
        "#{ec_eid}=EDGE_CURVE('',#{v0},#{v1},#{line_eid},.T.);",
        v0 = vertex_eids[&origin],
        v1 = vertex_eids[&dest]
    )?;
    Ok(ec_eid)
}

/// PLANE with an AXIS2_PLACEMENT_3D from the plane frame.
fn write_plane<W: Write>(writer: &mut W, plane: &Plane, eid: &mut EntityCounter) -> io::Result<u64> {
    let o = plane.origin;
    let n = plane.normal_dir.as_ref();
    let x = plane.x_dir.as_ref();

    let pt_eid = eid.next();
    writeln!(
        writer,
        "#{pt_eid}=CARTESIAN_POINT('',({:.6},{:.6},{:.6}));",
        o.x, o.y, o.z
    )?;
    let axis_eid = eid.next();
    writeln!(
        writer,
        "#{axis_eid}=DIRECTION('',({:.6},{:.6},{:.6}));",
        n.x, n.y, n.z
    )?;
    let ref_eid = eid.next();
    writeln!(
        writer,
        "#{ref_eid}=DIRECTION('',({:.6},{:.6},{:.6}));",
        x.x, x.y, x.z
    )?;
    let placement_eid = eid.next();
    writeln!(
        writer,
        "#{placement_eid}=AXIS2_PLACEMENT_3D('',#{pt_eid},#{axis_eid},#{ref_eid});"
    )?;
    let plane_eid = eid.next();
    writeln!(writer, "#{plane_eid}=PLANE('',#{placement_eid});")?;
    Ok(plane_eid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepcast_brep::{classify, shape_from_mesh, Classification};
    use stepcast_math::{Point3, DEFAULT_SEW_TOLERANCE};
    use stepcast_mesh::{Facet, TriangleMesh};

    fn cube_mesh() -> TriangleMesh {
        let v = [
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
        TriangleMesh {
            facets: tris
                .iter()
                .map(|&[a, b, c]| {
                    Facet::new(
                        Point3::new(v[a][0], v[a][1], v[a][2]),
                        Point3::new(v[b][0], v[b][1], v[b][2]),
                        Point3::new(v[c][0], v[c][1], v[c][2]),
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_solid_cube_entities() {
        let classified = classify(
            shape_from_mesh(&cube_mesh().default_topology(), DEFAULT_SEW_TOLERANCE).unwrap(),
        );
        assert_eq!(classified.classification, Classification::Solid);

        let mut buf = Vec::new();
        let diagnostics = write_step(&classified, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("ISO-10303-21;"));
        assert!(text.contains("MANIFOLD_SOLID_BREP"));
        assert!(text.contains("CLOSED_SHELL"));
        assert!(text.contains("ADVANCED_BREP_SHAPE_REPRESENTATION"));
        assert!(text.contains("END-ISO-10303-21;"));

        let face_lines = text.lines().filter(|l| l.contains("ADVANCED_FACE")).count();
        assert_eq!(face_lines, 6);
        assert_eq!(diagnostics.shape_type, "Solid");
        assert_eq!(diagnostics.faces, 6);
        assert_eq!(diagnostics.edges, 12);
        assert!(diagnostics.is_closed);
    }

    #[test]
    fn test_open_shell_entities() {
        let mut mesh = cube_mesh();
        mesh.facets.pop();
        let classified = classify(
            shape_from_mesh(&mesh.default_topology(), DEFAULT_SEW_TOLERANCE).unwrap(),
        );
        assert_eq!(classified.classification, Classification::Shell);

        let mut buf = Vec::new();
        let diagnostics = write_step(&classified, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("OPEN_SHELL"));
        assert!(text.contains("SHELL_BASED_SURFACE_MODEL"));
        assert!(text.contains("MANIFOLD_SURFACE_SHAPE_REPRESENTATION"));
        assert!(!text.contains("MANIFOLD_SOLID_BREP"));
        assert!(!diagnostics.is_closed);
        assert_eq!(diagnostics.faces, 11);
    }
}
