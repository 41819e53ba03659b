// src/config.rs - Construction-time configuration for one engine instance
use crate::error::EngineError;
use serde::Deserialize;

/// Per-segment mean-confidence thresholds. A segment's metrics are withheld
/// whenever its mean landmark confidence does not exceed the threshold.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SegmentThresholds {
    pub upper: f64,
    pub core: f64,
    pub lower: f64,
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            upper: 0.6,
            core: 0.7,
            lower: 0.5,
        }
    }
}

/// Bounds on the fraction of frame height the subject should span for angle
/// measurements to be meaningful.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub min_height_fraction: f64,
    pub max_height_fraction: f64,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            min_height_fraction: 0.3,
            max_height_fraction: 0.8,
        }
    }
}

/// Frontal-facing bounds for the shoulder and hip lines.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    pub max_tilt_deg: f64,
    pub max_rotation_deg: f64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            max_tilt_deg: 15.0,
            max_rotation_deg: 20.0,
        }
    }
}

/// Everything a [`crate::engine::MovementEngine`] needs at construction.
///
/// Deserializable so deployments can load it from JSON; every field has a
/// documented default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of each per-joint angle buffer.
    pub history_capacity: usize,
    /// Window of hip-midpoint positions behind the stability score.
    pub stability_window: usize,
    /// Fallback sampling interval in seconds for rate-of-change when frame
    /// timestamps do not advance.
    pub nominal_frame_interval: f64,
    /// Use the depth-aware angle formula when all three landmarks of a
    /// joint carry depth.
    pub use_depth: bool,
    /// Compute head yaw/roll and eye symmetry from face landmarks.
    pub face_metrics: bool,
    /// Consecutive frames without a usable primary-joint angle before a
    /// tracked exercise is abandoned.
    pub subject_loss_frames: usize,
    pub segment_thresholds: SegmentThresholds,
    pub distance: DistanceConfig,
    pub orientation: OrientationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 30,
            stability_window: 100,
            nominal_frame_interval: 0.5,
            use_depth: false,
            face_metrics: false,
            subject_loss_frames: 30,
            segment_thresholds: SegmentThresholds::default(),
            distance: DistanceConfig::default(),
            orientation: OrientationConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.history_capacity == 0 || self.stability_window == 0 {
            return Err(EngineError::ZeroHistoryCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn json_overrides_merge_with_defaults() {
        let config = EngineConfig::from_json(
            r#"{"history_capacity": 60, "segment_thresholds": {"upper": 0.8}}"#,
        )
        .unwrap();
        assert_eq!(config.history_capacity, 60);
        assert!((config.segment_thresholds.upper - 0.8).abs() < 1e-9);
        // Untouched fields keep their defaults.
        assert!((config.segment_thresholds.core - 0.7).abs() < 1e-9);
        assert_eq!(config.stability_window, 100);
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(EngineConfig::from_json(r#"{"history_capacity": 0}"#).is_err());
    }
}
