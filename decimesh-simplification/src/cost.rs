//! Per-triangle collapse candidates

use crate::arena::{Candidate, MeshArena, Triangle, Vertex};
use crate::quadric::{triangle_normal, Quadric};
use rayon::prelude::*;

/// Combined quadric for merging vertices `a` and `b`.
///
/// Boundary constraints only join in when one of the endpoints lies on the
/// boundary, so interior edges are costed on face planes alone.
pub(crate) fn edge_quadric(a: &Vertex, b: &Vertex) -> Quadric {
    let mut q = a.quadric + b.quadric;
    if a.border || b.border {
        q += a.border_quadric + b.border_quadric;
    }
    q
}

pub(crate) fn edge_candidate(vertices: &[Vertex], a: usize, b: usize, edge: usize) -> Candidate {
    let (va, vb) = (&vertices[a], &vertices[b]);
    let (target, cost) = edge_quadric(va, vb).optimal_point(&va.position, &vb.position);
    Candidate { target, cost, edge }
}

/// Recompute the normal and all three edge candidates of `tri`, then clear
/// its dirty flag. The first edge wins cost ties.
pub(crate) fn evaluate_triangle(vertices: &[Vertex], tri: &mut Triangle) {
    let [a, b, c] = tri.vertices;
    tri.normal = triangle_normal(
        &vertices[a].position,
        &vertices[b].position,
        &vertices[c].position,
    );

    let mut active = 0;
    for e in 0..3 {
        let (v0, v1) = tri.edge_vertices(e);
        tri.edges[e] = edge_candidate(vertices, v0, v1, e);
        if tri.edges[e].cost < tri.edges[active].cost {
            active = e;
        }
    }
    tri.active = active;
    tri.dirty = false;
}

impl MeshArena {
    pub(crate) fn refresh_triangle(&mut self, t: usize) {
        evaluate_triangle(&self.vertices, &mut self.triangles[t]);
    }

    /// Recompute every dirty live triangle. Returns how many were refreshed.
    ///
    /// Each triangle only reads vertex state and writes its own record, so
    /// the parallel path yields the same results as the sequential one.
    pub(crate) fn refresh_dirty(&mut self, parallel: bool) -> usize {
        let vertices = &self.vertices;
        let stale = |t: &&mut Triangle| t.dirty && !t.deleted;
        if parallel {
            self.triangles
                .par_iter_mut()
                .filter(stale)
                .map(|t| evaluate_triangle(vertices, t))
                .count()
        } else {
            self.triangles
                .iter_mut()
                .filter(stale)
                .map(|t| evaluate_triangle(vertices, t))
                .count()
        }
    }
}
