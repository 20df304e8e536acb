//! Quadric error decimation behind the [`MeshSimplifier`] trait

use crate::{DecimationOptions, Decimator, MeshSimplifier, MIN_TARGET_TRIANGLES};
use decimesh_core::{Error, Result, TriangleMesh};

/// Quadric error decimation simplifier
#[derive(Debug, Clone, Default)]
pub struct QuadricErrorSimplifier {
    pub options: DecimationOptions,
}

impl QuadricErrorSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecimationOptions) -> Self {
        Self { options }
    }
}

impl MeshSimplifier for QuadricErrorSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&reduction_ratio) {
            return Err(Error::InvalidData(
                "Reduction ratio must be between 0.0 and 1.0".to_string(),
            ));
        }
        if reduction_ratio == 0.0 {
            return Ok(mesh.clone());
        }

        let kept = 1.0 - f64::from(reduction_ratio);
        let target = (mesh.faces.len() as f64 * kept).round() as usize;
        let target = target.max(MIN_TARGET_TRIANGLES);
        let options = self.options.clone().with_target_count(target);
        let mut decimator = Decimator::new(mesh, &options)?;
        decimator.run();
        Ok(decimator.into_mesh())
    }
}
