//! Threshold-scheduled decimation driver
//!
//! Each pass raises an acceptance threshold, refreshes stale candidates and
//! offers every cheap enough triangle for collapse in index order. The run
//! ends when the target is met, when a pass proves nothing more can be
//! collapsed, or when the pass budget runs out.

use crate::arena::MeshArena;
use crate::collapse::DeviationSnapshot;
use crate::options::DecimationOptions;
use decimesh_core::{Result, TriangleMesh};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Scale of the first acceptance threshold.
const THRESHOLD_BASE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecimationState {
    Running,
    /// The live triangle count reached the target
    Converged,
    /// Triangles remain above the target but none can be collapsed
    Exhausted,
    /// Stopped between passes by the caller
    Cancelled,
}

impl DecimationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DecimationState::Running)
    }
}

/// Summary of a decimation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimationReport {
    pub state: DecimationState,
    pub target_triangles: usize,
    pub initial_triangles: usize,
    pub final_triangles: usize,
    pub final_vertices: usize,
    pub passes: usize,
    pub collapses: usize,
}

impl DecimationReport {
    pub fn reached_target(&self) -> bool {
        self.state == DecimationState::Converged
    }

    /// Output triangles as a fraction of the input.
    pub fn reduction(&self) -> f64 {
        if self.initial_triangles == 0 {
            return 1.0;
        }
        self.final_triangles as f64 / self.initial_triangles as f64
    }
}

/// Acceptance threshold for pass `pass` (0-based).
///
/// Grows polynomially with the pass index; the exponent is the
/// aggressiveness, so larger values admit costlier collapses sooner.
pub fn acceptance_threshold(aggressiveness: f64, pass: usize) -> f64 {
    THRESHOLD_BASE * ((pass + 3) as f64).powf(aggressiveness)
}

/// Edge-collapse decimator owning its working arena for the whole run.
pub struct Decimator {
    arena: MeshArena,
    options: DecimationOptions,
    target: usize,
    state: DecimationState,
    passes: usize,
    collapses: usize,
    initial_triangles: usize,
    /// Lowest deviation ceiling seen so far; later passes never exceed it
    deviation_ceiling: f64,
}

impl Decimator {
    /// Load `mesh` and compute the initial candidates of every triangle.
    ///
    /// The target is resolved against the input face count; it is not bounded
    /// here, so callers wanting the public contract should go through
    /// [`crate::simplify_with_options`].
    pub fn new(mesh: &TriangleMesh, options: &DecimationOptions) -> Result<Self> {
        options.validate()?;
        let mut arena = MeshArena::from_mesh(mesh, options.border_penalty)?;
        arena.refresh_dirty(options.parallel);

        let target = options.target.resolve(mesh.face_count());
        let state = if arena.live_triangle_count() <= target {
            DecimationState::Converged
        } else {
            DecimationState::Running
        };

        Ok(Self {
            arena,
            options: options.clone(),
            target,
            state,
            passes: 0,
            collapses: 0,
            initial_triangles: mesh.face_count(),
            deviation_ceiling: f64::INFINITY,
        })
    }

    pub fn state(&self) -> DecimationState {
        self.state
    }

    pub fn arena(&self) -> &MeshArena {
        &self.arena
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn live_triangle_count(&self) -> usize {
        self.arena.live_triangle_count()
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Run one threshold pass and return the resulting state.
    pub fn step(&mut self) -> DecimationState {
        if self.state.is_terminal() {
            return self.state;
        }

        let threshold = acceptance_threshold(self.options.aggressiveness, self.passes);
        let parallel = self.options.parallel;
        let flip_threshold = self.options.flip_threshold;

        self.arena.refresh_dirty(parallel);
        let snapshot =
            DeviationSnapshot::capture(&self.arena, self.options.normal_threshold_ratio, parallel)
                .bounded_by(self.deviation_ceiling);
        self.deviation_ceiling = snapshot.ceiling();

        let mut collapses = 0;
        let mut over_threshold = 0;
        for t in 0..self.arena.triangles.len() {
            if self.arena.triangles[t].deleted {
                continue;
            }
            if self.arena.triangles[t].dirty {
                self.arena.refresh_triangle(t);
            }
            if self.arena.triangles[t].candidate().cost > threshold {
                over_threshold += 1;
                continue;
            }
            if !snapshot.allows(t) {
                continue;
            }
            if self.arena.try_collapse(t, flip_threshold, &snapshot) > 0 {
                collapses += 1;
                if self.arena.live_triangle_count() <= self.target {
                    break;
                }
            }
        }

        self.passes += 1;
        self.collapses += collapses;
        log::debug!(
            "pass {}: threshold {:.3e}, deviation ceiling {:.4}, {} collapses, {} triangles left",
            self.passes,
            threshold,
            snapshot.ceiling(),
            collapses,
            self.arena.live_triangle_count()
        );

        self.state = if self.arena.live_triangle_count() <= self.target {
            DecimationState::Converged
        } else if collapses == 0 && over_threshold == 0 {
            // Every candidate was eligible and none could be taken; a
            // larger threshold changes nothing.
            DecimationState::Exhausted
        } else if self.passes >= self.options.max_passes {
            DecimationState::Exhausted
        } else {
            DecimationState::Running
        };
        self.state
    }

    /// Drive passes until a terminal state.
    pub fn run(&mut self) -> DecimationReport {
        self.run_with_cancel(&AtomicBool::new(false))
    }

    /// Like [`Decimator::run`], checking `cancel` before every pass.
    pub fn run_with_cancel(&mut self, cancel: &AtomicBool) -> DecimationReport {
        while !self.state.is_terminal() {
            if cancel.load(Ordering::Relaxed) {
                self.state = DecimationState::Cancelled;
                break;
            }
            self.step();
        }

        let report = self.report();
        match report.state {
            DecimationState::Exhausted => log::warn!(
                "unable to reduce further: {} triangles left after {} passes (target {})",
                report.final_triangles,
                report.passes,
                report.target_triangles
            ),
            _ => log::info!(
                "decimation {:?}: {} -> {} triangles in {} passes, {} collapses",
                report.state,
                report.initial_triangles,
                report.final_triangles,
                report.passes,
                report.collapses
            ),
        }
        report
    }

    pub fn report(&self) -> DecimationReport {
        DecimationReport {
            state: self.state,
            target_triangles: self.target,
            initial_triangles: self.initial_triangles,
            final_triangles: self.arena.live_triangle_count(),
            final_vertices: self.arena.live_vertex_count(),
            passes: self.passes,
            collapses: self.collapses,
        }
    }

    /// Compact the arena in place; safe to call repeatedly.
    pub fn compact(&mut self) {
        self.arena.compact();
    }

    /// Dense output mesh of the surviving geometry.
    pub fn to_mesh(&self) -> TriangleMesh {
        self.arena.to_mesh()
    }

    pub fn into_mesh(mut self) -> TriangleMesh {
        self.arena.compact();
        self.arena.to_mesh()
    }
}
