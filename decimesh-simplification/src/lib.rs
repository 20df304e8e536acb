//! Quadric-error mesh decimation
//!
//! This crate reduces the triangle count of a mesh by repeatedly collapsing
//! the cheapest edge, where cost is the quadric error metric:
//! - Plane and quadric primitives
//! - An index-addressed arena with per-vertex reference sets
//! - Threshold-scheduled, deterministic edge collapse with flip and
//!   normal-deviation guards

pub mod quadric;
pub mod arena;
mod cost;
pub mod collapse;
pub mod options;
pub mod decimator;
pub mod quadric_error;

#[cfg(test)]
mod fixtures;

pub use quadric::{Plane, Quadric};
pub use arena::{Candidate, MeshArena};
pub use collapse::DeviationSnapshot;
pub use options::{DecimationOptions, Target};
pub use decimator::{acceptance_threshold, DecimationReport, DecimationState, Decimator};
pub use quadric_error::QuadricErrorSimplifier;

use decimesh_core::{Error, Result, TriangleMesh};

/// Smallest target triangle count the public entry points accept.
pub const MIN_TARGET_TRIANGLES: usize = 4;

/// Smallest vertex and triangle counts worth decimating.
pub const MIN_INPUT_ELEMENTS: usize = 3;

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh with target reduction ratio (0.0 = no reduction, 1.0 = maximum reduction)
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh>;
}

/// Decimate `mesh` toward `target_triangle_count` triangles.
///
/// Returns the compacted mesh together with the run report; an `Exhausted`
/// report means the target could not be reached and the mesh is as small as
/// legal collapses allowed.
pub fn simplify(
    mesh: &TriangleMesh,
    target_triangle_count: usize,
    aggressiveness: f64,
    normal_threshold_ratio: f64,
) -> Result<(TriangleMesh, DecimationReport)> {
    let options = DecimationOptions::new()
        .with_target_count(target_triangle_count)
        .with_aggressiveness(aggressiveness)
        .with_normal_threshold_ratio(normal_threshold_ratio);
    simplify_with_options(mesh, &options)
}

/// [`simplify`] with every knob exposed.
pub fn simplify_with_options(
    mesh: &TriangleMesh,
    options: &DecimationOptions,
) -> Result<(TriangleMesh, DecimationReport)> {
    if mesh.vertex_count() < MIN_INPUT_ELEMENTS || mesh.face_count() < MIN_INPUT_ELEMENTS {
        return Err(Error::InvalidData(format!(
            "Mesh needs at least {} vertices and {} triangles, got {} and {}",
            MIN_INPUT_ELEMENTS,
            MIN_INPUT_ELEMENTS,
            mesh.vertex_count(),
            mesh.face_count()
        )));
    }
    let target = options.target.resolve(mesh.face_count());
    if target < MIN_TARGET_TRIANGLES {
        return Err(Error::InvalidData(format!(
            "Target of {} triangles is below the minimum of {}",
            target, MIN_TARGET_TRIANGLES
        )));
    }

    let mut decimator = Decimator::new(mesh, options)?;
    let report = decimator.run();
    Ok((decimator.into_mesh(), report))
}
