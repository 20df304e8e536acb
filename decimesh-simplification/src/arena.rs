//! Index-addressed mesh arena used while decimating
//!
//! Vertices and triangles live in flat vectors for the whole run and are
//! addressed by stable indices. Removal only sets a `deleted` flag; the final
//! [`MeshArena::compact`] pass drops dead records and remaps indices.

use crate::quadric::{Plane, Quadric};
use decimesh_core::{to_point3d, to_point3f, Point3d, Result, TriangleMesh, Vector3d};
use std::collections::HashMap;

/// Cached collapse proposal for one triangle edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Where the surviving vertex moves to
    pub target: Point3d,
    /// Clamped quadric error at `target`
    pub cost: f64,
    /// Edge index within the triangle: edge `e` joins corners `e` and `(e + 1) % 3`
    pub edge: usize,
}

impl Candidate {
    fn unset(edge: usize) -> Self {
        Self {
            target: Point3d::origin(),
            cost: f64::INFINITY,
            edge,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Point3d,
    /// Sum of the face quadrics of every plane that touched this vertex
    pub quadric: Quadric,
    /// Weighted boundary-constraint planes, merged like `quadric`
    pub border_quadric: Quadric,
    pub border: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [usize; 3],
    /// Unit face normal, zero for degenerate faces
    pub normal: Vector3d,
    pub deleted: bool,
    /// Set when a neighbouring collapse invalidated the cached candidates
    pub dirty: bool,
    pub edges: [Candidate; 3],
    /// Index into `edges` of the cheapest candidate
    pub active: usize,
}

impl Triangle {
    pub fn candidate(&self) -> &Candidate {
        &self.edges[self.active]
    }

    pub fn contains(&self, v: usize) -> bool {
        self.vertices.contains(&v)
    }

    /// Corner slot holding vertex `v`.
    pub fn corner_of(&self, v: usize) -> Option<usize> {
        self.vertices.iter().position(|&x| x == v)
    }

    /// Endpoints of edge `e` as `(v0, v1)`.
    pub fn edge_vertices(&self, e: usize) -> (usize, usize) {
        (self.vertices[e], self.vertices[(e + 1) % 3])
    }
}

/// The decimation working set: vertices, triangles and per-vertex references.
#[derive(Debug, Clone)]
pub struct MeshArena {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) triangles: Vec<Triangle>,
    /// Live triangles referencing each vertex
    pub(crate) refs: Vec<Vec<usize>>,
    pub(crate) live_triangles: usize,
}

impl MeshArena {
    /// Load a mesh, accumulate face quadrics and detect the boundary.
    ///
    /// Faces that repeat a vertex index are dropped at load. Boundary edges
    /// contribute a constraint plane weighted by `border_penalty` to the border
    /// quadric of both endpoints.
    pub fn from_mesh(mesh: &TriangleMesh, border_penalty: f64) -> Result<Self> {
        mesh.validate_indices()?;

        let mut vertices: Vec<Vertex> = mesh
            .vertices
            .iter()
            .map(|p| Vertex {
                position: to_point3d(p),
                quadric: Quadric::zero(),
                border_quadric: Quadric::zero(),
                border: false,
                deleted: false,
            })
            .collect();

        let mut triangles = Vec::with_capacity(mesh.faces.len());
        let mut refs = vec![Vec::new(); vertices.len()];
        let mut live_triangles = 0;

        for (ti, face) in mesh.faces.iter().enumerate() {
            let [a, b, c] = *face;
            let degenerate = a == b || b == c || c == a;
            let plane = Plane::from_triangle(
                &vertices[a].position,
                &vertices[b].position,
                &vertices[c].position,
            );
            if !degenerate {
                let q = plane.quadric();
                for &v in face {
                    vertices[v].quadric += q;
                    refs[v].push(ti);
                }
                live_triangles += 1;
            }
            triangles.push(Triangle {
                vertices: *face,
                normal: plane.normal,
                deleted: degenerate,
                dirty: !degenerate,
                edges: [Candidate::unset(0), Candidate::unset(1), Candidate::unset(2)],
                active: 0,
            });
        }

        // Undirected edge -> (use count, first owning triangle)
        let mut edge_use: HashMap<(usize, usize), (usize, usize)> =
            HashMap::with_capacity(live_triangles * 3);
        for (ti, tri) in triangles.iter().enumerate().filter(|(_, t)| !t.deleted) {
            for e in 0..3 {
                let (a, b) = tri.edge_vertices(e);
                edge_use
                    .entry((a.min(b), a.max(b)))
                    .and_modify(|(count, _)| *count += 1)
                    .or_insert((1, ti));
            }
        }

        for (ti, tri) in triangles.iter().enumerate().filter(|(_, t)| !t.deleted) {
            for e in 0..3 {
                let (a, b) = tri.edge_vertices(e);
                if edge_use[&(a.min(b), a.max(b))] != (1, ti) {
                    continue;
                }
                let constraint =
                    Plane::through_edge(&vertices[a].position, &vertices[b].position, &tri.normal)
                        .quadric()
                        * border_penalty;
                for v in [a, b] {
                    vertices[v].border = true;
                    vertices[v].border_quadric += constraint;
                }
            }
        }

        let border_count = vertices.iter().filter(|v| v.border).count();
        log::debug!(
            "loaded arena: {} vertices ({} on the boundary), {} live triangles, {} dropped at load",
            vertices.len(),
            border_count,
            live_triangles,
            mesh.faces.len() - live_triangles
        );

        Ok(Self {
            vertices,
            triangles,
            refs,
            live_triangles,
        })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Live triangles referencing vertex `v`.
    pub fn references(&self, v: usize) -> &[usize] {
        &self.refs[v]
    }

    pub fn live_triangle_count(&self) -> usize {
        self.live_triangles
    }

    /// Vertices that survive compaction: not deleted and still referenced.
    pub fn live_vertex_count(&self) -> usize {
        (0..self.vertices.len()).filter(|&v| self.is_kept(v)).count()
    }

    fn is_kept(&self, v: usize) -> bool {
        !self.vertices[v].deleted && !self.refs[v].is_empty()
    }

    /// Old vertex index -> compact index, preserving load order.
    fn vertex_remap(&self) -> Vec<Option<usize>> {
        let mut next = 0;
        (0..self.vertices.len())
            .map(|v| {
                self.is_kept(v).then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect()
    }

    /// Drop deleted and unreferenced records and renumber the rest densely.
    ///
    /// Relative order of surviving vertices and triangles is preserved, so a
    /// second call is a no-op.
    pub fn compact(&mut self) {
        let remap = self.vertex_remap();

        let vertices = std::mem::take(&mut self.vertices);
        self.vertices = vertices
            .into_iter()
            .zip(&remap)
            .filter_map(|(v, new)| new.map(|_| v))
            .collect();

        let triangles = std::mem::take(&mut self.triangles);
        self.triangles = triangles
            .into_iter()
            .filter(|t| !t.deleted)
            .map(|mut t| {
                for v in t.vertices.iter_mut() {
                    // Live triangles only reference kept vertices
                    *v = remap[*v].unwrap_or(usize::MAX);
                }
                t
            })
            .collect();

        self.refs = vec![Vec::new(); self.vertices.len()];
        for (ti, tri) in self.triangles.iter().enumerate() {
            for &v in &tri.vertices {
                self.refs[v].push(ti);
            }
        }
        self.live_triangles = self.triangles.len();
    }

    /// Dense output mesh of the surviving geometry.
    pub fn to_mesh(&self) -> TriangleMesh {
        let remap = self.vertex_remap();
        let vertices = self
            .vertices
            .iter()
            .zip(&remap)
            .filter(|(_, new)| new.is_some())
            .map(|(v, _)| to_point3f(&v.position))
            .collect();
        let faces = self
            .triangles
            .iter()
            .filter(|t| !t.deleted)
            .filter_map(|t| {
                Some([
                    remap[t.vertices[0]]?,
                    remap[t.vertices[1]]?,
                    remap[t.vertices[2]]?,
                ])
            })
            .collect();
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    /// Panics if the reference sets disagree with the triangle records.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut live = 0;
        for (ti, tri) in self.triangles.iter().enumerate() {
            if tri.deleted {
                continue;
            }
            live += 1;
            let [a, b, c] = tri.vertices;
            assert!(a != b && b != c && c != a, "triangle {} repeats a vertex", ti);
            for &v in &tri.vertices {
                assert!(!self.vertices[v].deleted, "triangle {} uses deleted vertex {}", ti, v);
                assert!(self.refs[v].contains(&ti), "vertex {} misses triangle {}", v, ti);
            }
        }
        for (v, list) in self.refs.iter().enumerate() {
            for &ti in list {
                let tri = &self.triangles[ti];
                assert!(!tri.deleted, "vertex {} references deleted triangle {}", v, ti);
                assert!(tri.contains(v), "vertex {} references foreign triangle {}", v, ti);
            }
        }
        assert_eq!(live, self.live_triangles);
    }
}
