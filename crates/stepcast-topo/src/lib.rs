#![warn(missing_docs)]

//! Half-edge B-rep topology for the stepcast pipeline.
//!
//! Stores the combinatorial structure of a boundary representation:
//! vertices, half-edges, edges (paired half-edges), loops, faces, and
//! shells. Geometry (surface definitions) lives in `stepcast-geom`;
//! faces reference surfaces by index.

use slotmap::{new_key_type, SlotMap};
use stepcast_math::Point3;

new_key_type! {
    /// Key for a vertex in a [`Topology`].
    pub struct VertexId;
    /// Key for a half-edge in a [`Topology`].
    pub struct HalfEdgeId;
    /// Key for an edge (a paired couple of half-edges).
    pub struct EdgeId;
    /// Key for a loop (closed cycle of half-edges bounding a face).
    pub struct LoopId;
    /// Key for a face.
    pub struct FaceId;
    /// Key for a shell (a connected set of faces).
    pub struct ShellId;
}

/// A topological vertex with its 3D position.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// Position in 3D space.
    pub point: Point3,
    /// One half-edge originating at this vertex, if any.
    pub half_edge: Option<HalfEdgeId>,
}

/// A half-edge: one directed side of an edge, belonging to one loop.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    /// The vertex this half-edge starts from.
    pub origin: VertexId,
    /// The opposite half-edge on the adjacent face, once paired.
    pub twin: Option<HalfEdgeId>,
    /// The edge this half-edge belongs to, once paired.
    pub edge: Option<EdgeId>,
    /// The loop this half-edge belongs to.
    pub loop_id: Option<LoopId>,
    /// Next half-edge in the loop cycle.
    pub next: Option<HalfEdgeId>,
    /// Previous half-edge in the loop cycle.
    pub prev: Option<HalfEdgeId>,
}

/// An edge: two twinned half-edges shared by two faces.
#[derive(Debug, Clone)]
pub struct Edge {
    /// The two half-edges forming this edge.
    pub half_edges: (HalfEdgeId, HalfEdgeId),
}

/// A loop: closed cycle of half-edges bounding (part of) a face.
#[derive(Debug, Clone)]
pub struct Loop {
    /// An arbitrary half-edge on the cycle.
    pub half_edge: HalfEdgeId,
    /// The face this loop bounds, set when the face is created.
    pub face: Option<FaceId>,
}

/// Orientation of a face relative to its underlying surface normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Face normal agrees with the surface normal.
    Forward,
    /// Face normal is the reverse of the surface normal.
    Reversed,
}

/// A face: an outer boundary loop plus optional inner loops (holes),
/// referencing a surface in the geometry store by index.
#[derive(Debug, Clone)]
pub struct Face {
    /// The outer boundary loop.
    pub outer_loop: LoopId,
    /// Inner boundary loops (holes in the face).
    pub inner_loops: Vec<LoopId>,
    /// Index of the underlying surface in the geometry store.
    pub surface_index: usize,
    /// Face orientation relative to the surface normal.
    pub orientation: Orientation,
}

/// Whether a shell bounds material from outside or inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    /// Outer boundary shell.
    Outer,
    /// Inner cavity shell.
    Inner,
}

/// A shell: a connected collection of faces.
#[derive(Debug, Clone)]
pub struct Shell {
    /// The faces making up this shell.
    pub faces: Vec<FaceId>,
    /// Outer or inner shell.
    pub shell_type: ShellType,
}

/// The half-edge topology store.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// All vertices.
    pub vertices: SlotMap<VertexId, Vertex>,
    /// All half-edges.
    pub half_edges: SlotMap<HalfEdgeId, HalfEdge>,
    /// All edges (paired half-edges).
    pub edges: SlotMap<EdgeId, Edge>,
    /// All loops.
    pub loops: SlotMap<LoopId, Loop>,
    /// All faces.
    pub faces: SlotMap<FaceId, Face>,
    /// All shells.
    pub shells: SlotMap<ShellId, Shell>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex at `point`.
    pub fn add_vertex(&mut self, point: Point3) -> VertexId {
        self.vertices.insert(Vertex {
            point,
            half_edge: None,
        })
    }

    /// Add an unlinked half-edge originating at `origin`.
    pub fn add_half_edge(&mut self, origin: VertexId) -> HalfEdgeId {
        let he = self.half_edges.insert(HalfEdge {
            origin,
            twin: None,
            edge: None,
            loop_id: None,
            next: None,
            prev: None,
        });
        if self.vertices[origin].half_edge.is_none() {
            self.vertices[origin].half_edge = Some(he);
        }
        he
    }

    /// Link the given half-edges into a closed loop, in order.
    pub fn add_loop(&mut self, hes: &[HalfEdgeId]) -> LoopId {
        let loop_id = self.loops.insert(Loop {
            half_edge: hes[0],
            face: None,
        });
        let n = hes.len();
        for i in 0..n {
            let he = hes[i];
            self.half_edges[he].loop_id = Some(loop_id);
            self.half_edges[he].next = Some(hes[(i + 1) % n]);
            self.half_edges[he].prev = Some(hes[(i + n - 1) % n]);
        }
        loop_id
    }

    /// Add a face bounded by `outer_loop` over the surface at `surface_index`.
    pub fn add_face(
        &mut self,
        outer_loop: LoopId,
        surface_index: usize,
        orientation: Orientation,
    ) -> FaceId {
        let face = self.faces.insert(Face {
            outer_loop,
            inner_loops: Vec::new(),
            surface_index,
            orientation,
        });
        self.loops[outer_loop].face = Some(face);
        face
    }

    /// Attach an inner (hole) loop to an existing face.
    pub fn add_inner_loop(&mut self, face: FaceId, inner: LoopId) {
        self.loops[inner].face = Some(face);
        self.faces[face].inner_loops.push(inner);
    }

    /// Pair two half-edges as twins, creating the shared edge.
    pub fn add_edge(&mut self, he1: HalfEdgeId, he2: HalfEdgeId) -> EdgeId {
        let edge = self.edges.insert(Edge {
            half_edges: (he1, he2),
        });
        self.half_edges[he1].twin = Some(he2);
        self.half_edges[he1].edge = Some(edge);
        self.half_edges[he2].twin = Some(he1);
        self.half_edges[he2].edge = Some(edge);
        edge
    }

    /// Add a shell over the given faces.
    pub fn add_shell(&mut self, faces: Vec<FaceId>, shell_type: ShellType) -> ShellId {
        self.shells.insert(Shell { faces, shell_type })
    }

    /// Destination vertex of a half-edge (origin of its `next`).
    pub fn half_edge_dest(&self, he: HalfEdgeId) -> VertexId {
        match self.half_edges[he].next {
            Some(next) => self.half_edges[next].origin,
            None => self.half_edges[he].origin,
        }
    }

    /// Iterate the half-edges of a loop in cycle order.
    pub fn loop_half_edges(&self, loop_id: LoopId) -> LoopHalfEdges<'_> {
        let start = self.loops[loop_id].half_edge;
        LoopHalfEdges {
            topo: self,
            start,
            current: Some(start),
        }
    }

    /// All loops of a face: the outer loop followed by any inner loops.
    pub fn face_loops(&self, face: FaceId) -> Vec<LoopId> {
        let f = &self.faces[face];
        let mut loops = vec![f.outer_loop];
        loops.extend(f.inner_loops.iter().copied());
        loops
    }

}

/// Iterator over the half-edges of a loop.
pub struct LoopHalfEdges<'a> {
    topo: &'a Topology,
    start: HalfEdgeId,
    current: Option<HalfEdgeId>,
}

impl Iterator for LoopHalfEdges<'_> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<HalfEdgeId> {
        let he = self.current?;
        let next = self.topo.half_edges[he].next;
        self.current = match next {
            Some(n) if n != self.start => Some(n),
            _ => None,
        };
        Some(he)
    }
}
