//! Collapse legality and execution
//!
//! A collapse merges vertex `v1` into `v0` at a target point. Triangles that
//! hold both endpoints degenerate and are deleted; the rest of `v1`'s fan is
//! repointed to `v0`.

use crate::arena::MeshArena;
use crate::quadric::triangle_normal;
use decimesh_core::{Point3d, Vector3d};
use rayon::prelude::*;

/// Edge directions from the target point closer than this (as |cos|) would
/// leave a sliver triangle.
const DEGENERATE_COS: f64 = 0.999;

/// Per-pass snapshot of how far each triangle bends away from its neighbours.
///
/// Deviation is `1 - mean(n · nᵢ)` over the triangles sharing a vertex with
/// it: zero in flat regions, growing toward creases. The ceiling is the value
/// found at `ratio` percent of the sorted live deviations; a ratio of 100 or
/// more lifts it entirely.
#[derive(Debug, Clone)]
pub struct DeviationSnapshot {
    deviations: Vec<f64>,
    ceiling: f64,
}

impl DeviationSnapshot {
    pub fn capture(arena: &MeshArena, ratio: f64, parallel: bool) -> Self {
        let deviation = |t: usize| {
            if arena.triangles[t].deleted {
                f64::INFINITY
            } else {
                arena.neighbourhood_deviation(t)
            }
        };
        let deviations: Vec<f64> = if parallel {
            (0..arena.triangles.len()).into_par_iter().map(deviation).collect()
        } else {
            (0..arena.triangles.len()).map(deviation).collect()
        };

        let ceiling = if ratio >= 100.0 {
            f64::INFINITY
        } else {
            let mut sorted: Vec<f64> =
                deviations.iter().copied().filter(|d| d.is_finite()).collect();
            sorted.sort_by(f64::total_cmp);
            percentile(&sorted, ratio)
        };

        Self { deviations, ceiling }
    }

    /// Clamp the ceiling to `bound`, so it never rises above an earlier pass.
    pub fn bounded_by(mut self, bound: f64) -> Self {
        self.ceiling = self.ceiling.min(bound);
        self
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn deviation(&self, t: usize) -> f64 {
        self.deviations[t]
    }

    /// Whether triangle `t` is flat enough to give up an edge this pass.
    pub fn allows(&self, t: usize) -> bool {
        self.deviations[t] <= self.ceiling
    }
}

/// Value at `ratio` percent (0, 100] of an ascending slice.
fn percentile(sorted: &[f64], ratio: f64) -> f64 {
    if sorted.is_empty() {
        return f64::INFINITY;
    }
    let rank = (sorted.len() as f64 * ratio / 100.0).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

impl MeshArena {
    fn neighbourhood_deviation(&self, t: usize) -> f64 {
        let normal = self.triangles[t].normal;
        let (sum, count) = self.triangles[t]
            .vertices
            .iter()
            .flat_map(|&v| self.refs[v].iter())
            .filter(|&&other| other != t)
            .fold((0.0, 0usize), |(sum, count), &other| {
                (sum + normal.dot(&self.triangles[other].normal), count + 1)
            });
        if count == 0 {
            return 0.0;
        }
        (1.0 - sum / count as f64).max(0.0)
    }

    /// Whether moving `keep` to `target` folds or squashes any of its
    /// triangles that survive the collapse of edge `keep – gone`.
    ///
    /// Triangles that were already degenerate have no orientation to lose and
    /// are not checked.
    pub(crate) fn would_flip(
        &self,
        keep: usize,
        gone: usize,
        target: &Point3d,
        flip_threshold: f64,
    ) -> bool {
        for &t in &self.refs[keep] {
            let tri = &self.triangles[t];
            if tri.contains(gone) || tri.normal == Vector3d::zeros() {
                continue;
            }
            let Some(s) = tri.corner_of(keep) else {
                continue;
            };
            let p1 = self.vertices[tri.vertices[(s + 1) % 3]].position;
            let p2 = self.vertices[tri.vertices[(s + 2) % 3]].position;

            let (Some(d1), Some(d2)) = (
                (p1 - *target).try_normalize(0.0),
                (p2 - *target).try_normalize(0.0),
            ) else {
                return true;
            };
            if d1.dot(&d2).abs() > DEGENERATE_COS {
                return true;
            }
            let n = d1.cross(&d2).normalize();
            if n.dot(&tri.normal) < flip_threshold {
                return true;
            }
        }
        false
    }

    /// Surviving triangles around `v0` and `v1` with the normals they would
    /// have once both endpoints sit at `target`.
    fn fan_after_collapse(&self, v0: usize, v1: usize, target: &Point3d) -> Vec<(usize, Vector3d)> {
        self.refs[v0]
            .iter()
            .chain(self.refs[v1].iter())
            .copied()
            .filter(|&t| !self.triangles[t].contains(v0) || !self.triangles[t].contains(v1))
            .map(|t| {
                let [a, b, c] = self.triangles[t].vertices.map(|v| {
                    if v == v0 || v == v1 {
                        *target
                    } else {
                        self.vertices[v].position
                    }
                });
                (t, triangle_normal(&a, &b, &c))
            })
            .collect()
    }

    /// Whether merging `v1` into `v0` at `target` would bend a surviving fan
    /// triangle past the snapshot ceiling.
    ///
    /// A triangle already above the ceiling only blocks the collapse if its
    /// deviation would grow.
    pub(crate) fn raises_deviation(
        &self,
        v0: usize,
        v1: usize,
        target: &Point3d,
        snapshot: &DeviationSnapshot,
    ) -> bool {
        if snapshot.ceiling() == f64::INFINITY {
            return false;
        }
        let fan = self.fan_after_collapse(v0, v1, target);
        let normal_of = |t: usize| {
            fan.iter()
                .find(|(f, _)| *f == t)
                .map_or(self.triangles[t].normal, |(_, n)| *n)
        };
        let removed = |t: usize| self.triangles[t].contains(v0) && self.triangles[t].contains(v1);

        for &(t, normal) in &fan {
            let mut sum = 0.0;
            let mut count = 0usize;
            for &v in &self.triangles[t].vertices {
                let merged: &[usize] = if v == v0 {
                    &self.refs[v1]
                } else if v == v1 {
                    &self.refs[v0]
                } else {
                    &[]
                };
                for &other in self.refs[v].iter().chain(merged.iter()) {
                    if other == t || removed(other) {
                        continue;
                    }
                    sum += normal.dot(&normal_of(other));
                    count += 1;
                }
            }
            let after = if count == 0 {
                0.0
            } else {
                (1.0 - sum / count as f64).max(0.0)
            };
            if after > snapshot.ceiling() && after > snapshot.deviation(t) {
                return true;
            }
        }
        false
    }

    /// Legality of collapsing `v1` into `v0` at `target`.
    pub(crate) fn can_collapse(
        &self,
        v0: usize,
        v1: usize,
        target: &Point3d,
        flip_threshold: f64,
        snapshot: &DeviationSnapshot,
    ) -> bool {
        !self.would_flip(v0, v1, target, flip_threshold)
            && !self.would_flip(v1, v0, target, flip_threshold)
            && !self.raises_deviation(v0, v1, target, snapshot)
    }

    /// Merge `v1` into `v0` at `target`. Returns how many triangles were
    /// deleted.
    ///
    /// Every triangle formerly referencing either endpoint is marked dirty.
    pub(crate) fn collapse_edge(&mut self, v0: usize, v1: usize, target: Point3d) -> usize {
        let gone = self.vertices[v1].clone();
        let keep = &mut self.vertices[v0];
        keep.position = target;
        keep.quadric += gone.quadric;
        keep.border_quadric += gone.border_quadric;
        keep.border |= gone.border;
        self.vertices[v1].deleted = true;

        let kept_refs = std::mem::take(&mut self.refs[v0]);
        let moved_refs = std::mem::take(&mut self.refs[v1]);

        let mut removed = 0;
        for &t in &moved_refs {
            let tri = &mut self.triangles[t];
            tri.dirty = true;
            if tri.contains(v0) {
                tri.deleted = true;
                removed += 1;
                let third = tri.vertices.iter().copied().find(|&v| v != v0 && v != v1);
                if let Some(c) = third {
                    self.refs[c].retain(|&x| x != t);
                }
            } else if let Some(s) = tri.corner_of(v1) {
                tri.vertices[s] = v0;
            }
        }
        self.live_triangles -= removed;

        let mut merged = kept_refs;
        merged.retain(|&t| !self.triangles[t].deleted);
        merged.extend(moved_refs.into_iter().filter(|&t| !self.triangles[t].deleted));
        for &t in &merged {
            self.triangles[t].dirty = true;
        }
        self.refs[v0] = merged;

        removed
    }

    /// Offer triangle `t`'s active candidate for collapse.
    ///
    /// Returns the number of deleted triangles, zero if the collapse was
    /// rejected.
    pub(crate) fn try_collapse(
        &mut self,
        t: usize,
        flip_threshold: f64,
        snapshot: &DeviationSnapshot,
    ) -> usize {
        let tri = &self.triangles[t];
        let candidate = *tri.candidate();
        let (v0, v1) = tri.edge_vertices(candidate.edge);
        if !self.can_collapse(v0, v1, &candidate.target, flip_threshold, snapshot) {
            return 0;
        }
        self.collapse_edge(v0, v1, candidate.target)
    }
}
