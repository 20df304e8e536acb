//! Decimation parameters

use decimesh_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// How many triangles the decimation should stop at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Absolute triangle count
    Count(usize),
    /// Fraction of the input triangle count, clamped to `[0, 1]`
    Ratio(f32),
}

impl Target {
    pub fn resolve(&self, triangle_count: usize) -> usize {
        match *self {
            Target::Count(n) => n,
            Target::Ratio(r) => {
                (triangle_count as f64 * f64::from(r.clamp(0.0, 1.0))).round() as usize
            }
        }
    }
}

/// Tuning knobs for [`crate::Decimator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimationOptions {
    pub target: Target,
    /// Exponent of the per-pass acceptance threshold; higher is faster and coarser
    pub aggressiveness: f64,
    /// Percentile (0, 100] of face-normal deviation admitted for collapse; the
    /// ceiling is fixed by the flattest pass so far, and 100 lifts it
    pub normal_threshold_ratio: f64,
    /// Minimum dot between a triangle's old and new normal
    pub flip_threshold: f64,
    /// Weight of the boundary-constraint planes
    pub border_penalty: f64,
    /// Upper bound on threshold passes
    pub max_passes: usize,
    /// Recompute stale candidates with rayon between passes
    pub parallel: bool,
}

impl Default for DecimationOptions {
    fn default() -> Self {
        Self {
            target: Target::Ratio(0.5),
            aggressiveness: 7.0,
            normal_threshold_ratio: 10.0,
            flip_threshold: 0.2,
            border_penalty: 1000.0,
            max_passes: 100,
            parallel: true,
        }
    }
}

impl DecimationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_count(mut self, count: usize) -> Self {
        self.target = Target::Count(count);
        self
    }

    pub fn with_target_ratio(mut self, ratio: f32) -> Self {
        self.target = Target::Ratio(ratio);
        self
    }

    pub fn with_aggressiveness(mut self, aggressiveness: f64) -> Self {
        self.aggressiveness = aggressiveness;
        self
    }

    pub fn with_normal_threshold_ratio(mut self, ratio: f64) -> Self {
        self.normal_threshold_ratio = ratio;
        self
    }

    pub fn with_flip_threshold(mut self, threshold: f64) -> Self {
        self.flip_threshold = threshold;
        self
    }

    pub fn with_border_penalty(mut self, penalty: f64) -> Self {
        self.border_penalty = penalty;
        self
    }

    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check that every knob is inside its usable range.
    pub fn validate(&self) -> Result<()> {
        if !(self.aggressiveness.is_finite() && self.aggressiveness > 0.0) {
            return Err(Error::InvalidData(format!(
                "Aggressiveness must be positive, got {}",
                self.aggressiveness
            )));
        }
        if !(self.normal_threshold_ratio > 0.0 && self.normal_threshold_ratio <= 100.0) {
            return Err(Error::InvalidData(format!(
                "Normal threshold ratio must be in (0, 100], got {}",
                self.normal_threshold_ratio
            )));
        }
        if !(-1.0..=1.0).contains(&self.flip_threshold) {
            return Err(Error::InvalidData(format!(
                "Flip threshold must be in [-1, 1], got {}",
                self.flip_threshold
            )));
        }
        if !(self.border_penalty.is_finite() && self.border_penalty >= 0.0) {
            return Err(Error::InvalidData(format!(
                "Border penalty must be non-negative, got {}",
                self.border_penalty
            )));
        }
        if self.max_passes == 0 {
            return Err(Error::InvalidData("At least one pass is required".to_string()));
        }
        if let Target::Ratio(r) = self.target {
            if !(r > 0.0) {
                return Err(Error::InvalidData(format!(
                    "Target ratio must be positive, got {}",
                    r
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DecimationOptions::default();
        assert_eq!(options.aggressiveness, 7.0);
        assert_eq!(options.normal_threshold_ratio, 10.0);
        assert_eq!(options.flip_threshold, 0.2);
        assert_eq!(options.max_passes, 100);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = DecimationOptions::new()
            .with_target_count(40)
            .with_aggressiveness(5.0)
            .with_normal_threshold_ratio(50.0)
            .with_parallel(false);
        assert_eq!(options.target, Target::Count(40));
        assert_eq!(options.aggressiveness, 5.0);
        assert!(!options.parallel);
    }

    #[test]
    fn test_validation() {
        assert!(DecimationOptions::new().with_aggressiveness(0.0).validate().is_err());
        assert!(DecimationOptions::new().with_aggressiveness(f64::NAN).validate().is_err());
        assert!(DecimationOptions::new().with_normal_threshold_ratio(0.0).validate().is_err());
        assert!(DecimationOptions::new().with_normal_threshold_ratio(100.5).validate().is_err());
        assert!(DecimationOptions::new().with_normal_threshold_ratio(100.0).validate().is_ok());
        assert!(DecimationOptions::new().with_flip_threshold(1.5).validate().is_err());
        assert!(DecimationOptions::new().with_max_passes(0).validate().is_err());
        assert!(DecimationOptions::new().with_target_ratio(0.0).validate().is_err());
    }

    #[test]
    fn test_target_resolution() {
        assert_eq!(Target::Count(10).resolve(500), 10);
        assert_eq!(Target::Ratio(0.5).resolve(12), 6);
        assert_eq!(Target::Ratio(0.2).resolve(101), 20);
        assert_eq!(Target::Ratio(3.0).resolve(12), 12);
    }

    #[test]
    fn test_ratio_target_on_large_meshes() {
        // Counts past 2^24 are not representable as f32
        assert_eq!(Target::Ratio(1.0).resolve(100_000_001), 100_000_001);
        assert_eq!(Target::Ratio(0.5).resolve(33_554_433), 16_777_217);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "target": { "count": 64 }, "aggressiveness": 5.0 }"#;
        let options: DecimationOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.target, Target::Count(64));
        assert_eq!(options.aggressiveness, 5.0);
        assert_eq!(options.normal_threshold_ratio, 10.0);
        assert!(options.parallel);
    }
}
