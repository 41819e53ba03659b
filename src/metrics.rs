// src/metrics.rs - Per-frame assembly of the immutable metrics snapshot
use crate::config::EngineConfig;
use crate::geometry;
use crate::history::{JointHistories, StabilityTracker};
use crate::landmarks::{Joint, LandmarkFrame, PoseLandmark};
use crate::validity::{ValidityGate, ValidityResult};
use serde::Serialize;
use std::collections::HashMap;
use tracing::trace;

/// Head pose and face symmetry, computed only when the `face_metrics`
/// capability is enabled.
#[derive(Debug, Clone, Serialize)]
pub struct HeadMetrics {
    /// Side-to-side head turn in degrees, from the nose offset within the
    /// ear line. Positive turns toward the subject's left.
    pub yaw_deg: Option<f64>,
    /// Head tilt in degrees from the eye line.
    pub roll_deg: Option<f64>,
    /// Left/right eye width agreement, 0-100.
    pub eye_symmetry: Option<f64>,
}

/// Posture indicators derived from whichever segments passed validity.
#[derive(Debug, Clone, Serialize)]
pub struct PostureMetrics {
    /// Degrees off vertical of the shoulder-midpoint to hip-midpoint line.
    /// 0 means upright.
    pub spine_angle_deg: Option<f64>,
    /// Shoulder levelness, 0-100.
    pub shoulder_level: Option<f64>,
    /// Hip levelness, 0-100.
    pub hip_level: Option<f64>,
    /// Shoulder line vs hip line rotation in degrees.
    pub torso_rotation_deg: Option<f64>,
    /// Nose / shoulder-midpoint / hip-midpoint vertical stacking, 0-100.
    pub body_alignment: Option<f64>,
}

/// Immutable per-frame aggregate of everything the engine measured.
///
/// Absent fields mean "not measured this frame" (missing landmark or failed
/// segment validity), never "measured as zero".
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: f64,
    angles: HashMap<Joint, f64>,
    rom: HashMap<Joint, f64>,
    pub posture: PostureMetrics,
    /// Bilateral elbow angle agreement, 0-100.
    pub elbow_symmetry: Option<f64>,
    /// Bilateral knee angle agreement, 0-100.
    pub knee_symmetry: Option<f64>,
    /// Inverse hip-midpoint positional variance, 0-100.
    pub stability: f64,
    pub head: Option<HeadMetrics>,
    pub validity: ValidityResult,
}

impl MetricsSnapshot {
    /// Measured angle for a joint, absent when it was withheld this frame.
    pub fn angle(&self, joint: Joint) -> Option<f64> {
        self.angles.get(&joint).copied()
    }

    /// Range of motion over the joint's recent history window.
    pub fn range_of_motion(&self, joint: Joint) -> f64 {
        self.rom.get(&joint).copied().unwrap_or(0.0)
    }

    pub fn measured_joints(&self) -> impl Iterator<Item = (Joint, f64)> + '_ {
        self.angles.iter().map(|(&j, &a)| (j, a))
    }

    /// Snapshot with the given angles and everything else absent-but-valid,
    /// for driving the state machine without a full pipeline.
    #[cfg(test)]
    pub(crate) fn synthetic(timestamp: f64, angles: HashMap<Joint, f64>) -> Self {
        use crate::validity::{
            DistanceEstimate, FramingState, OrientationCheck, SegmentValidity,
        };
        let valid = SegmentValidity {
            is_valid: true,
            confidence: 0.9,
        };
        MetricsSnapshot {
            timestamp,
            rom: angles.keys().map(|&j| (j, 0.0)).collect(),
            angles,
            posture: PostureMetrics {
                spine_angle_deg: None,
                shoulder_level: None,
                hip_level: None,
                torso_rotation_deg: None,
                body_alignment: None,
            },
            elbow_symmetry: None,
            knee_symmetry: None,
            stability: 100.0,
            head: None,
            validity: ValidityResult {
                upper: valid,
                core: valid,
                lower: valid,
                distance: DistanceEstimate {
                    state: FramingState::Optimal,
                    height_fraction: Some(0.5),
                },
                orientation: OrientationCheck {
                    shoulder_tilt_deg: None,
                    hip_tilt_deg: None,
                    torso_rotation_deg: None,
                    frontal: true,
                },
                messages: Vec::new(),
            },
        }
    }

    /// Synthetic-snapshot variant with a measured spine angle, for driving
    /// posture form checks.
    #[cfg(test)]
    pub(crate) fn with_spine_angle(mut self, spine_angle_deg: f64) -> Self {
        self.posture.spine_angle_deg = Some(spine_angle_deg);
        self
    }
}

/// Orchestrates the gate, geometry and histories into one snapshot per frame.
///
/// Owns all temporal state for a single tracked subject; one instance per
/// subject, no sharing.
pub struct MetricsEngine {
    config: EngineConfig,
    gate: ValidityGate,
    histories: JointHistories,
    stability: StabilityTracker,
}

impl MetricsEngine {
    pub fn new(config: EngineConfig) -> Self {
        let gate = ValidityGate::new(
            config.segment_thresholds,
            config.distance,
            config.orientation,
        );
        let histories = JointHistories::new(config.history_capacity);
        let stability = StabilityTracker::new(config.stability_window);
        Self {
            config,
            gate,
            histories,
            stability,
        }
    }

    /// Process one frame into a snapshot. Never fails: a frame with zero
    /// usable landmarks yields an all-absent snapshot.
    pub fn process(&mut self, frame: &LandmarkFrame) -> MetricsSnapshot {
        let validity = self.gate.check(frame);

        // Out-of-band framing suppresses angle measurement entirely; the
        // numbers would not be meaningful at that distance.
        let framing_ok = !matches!(
            validity.distance.state,
            crate::validity::FramingState::TooClose | crate::validity::FramingState::TooFar
        );

        let mut angles = HashMap::new();
        let mut rom = HashMap::new();
        if framing_ok {
            for joint in Joint::ALL {
                if !validity.segment(joint.segment()).is_valid {
                    continue;
                }
                if let Some(angle) = self.joint_angle(frame, joint) {
                    self.histories.push(joint, angle, frame.timestamp);
                    angles.insert(joint, angle);
                    rom.insert(joint, self.histories.range_of_motion(joint));
                }
            }
        }

        if validity.core.is_valid {
            if let Some(mid) = frame.midpoint(PoseLandmark::LeftHip, PoseLandmark::RightHip) {
                self.stability.push(mid.xy());
            }
        }

        let posture = self.posture(frame, &validity);
        let elbow_symmetry = geometry::symmetry(
            angles.get(&Joint::LeftElbow).copied(),
            angles.get(&Joint::RightElbow).copied(),
        );
        let knee_symmetry = geometry::symmetry(
            angles.get(&Joint::LeftKnee).copied(),
            angles.get(&Joint::RightKnee).copied(),
        );
        let head = self.config.face_metrics.then(|| Self::head_metrics(frame));

        trace!(
            timestamp = frame.timestamp,
            measured = angles.len(),
            valid_upper = validity.upper.is_valid,
            valid_core = validity.core.is_valid,
            valid_lower = validity.lower.is_valid,
            "frame processed"
        );

        MetricsSnapshot {
            timestamp: frame.timestamp,
            angles,
            rom,
            posture,
            elbow_symmetry,
            knee_symmetry,
            stability: self.stability.stability(),
            head,
            validity,
        }
    }

    /// Degrees per second of a joint's last movement, from real frame
    /// timestamps with the configured nominal interval as fallback.
    pub fn rate_of_change(&self, joint: Joint) -> Option<f64> {
        self.histories
            .rate_of_change(joint, self.config.nominal_frame_interval)
    }

    /// Session boundary: drop all temporal state.
    pub fn reset(&mut self) {
        self.histories.clear();
        self.stability.clear();
    }

    fn joint_angle(&self, frame: &LandmarkFrame, joint: Joint) -> Option<f64> {
        let (a, b, c) = joint.triple();
        if self.config.use_depth {
            geometry::angle_3d(frame.get(a), frame.get(b), frame.get(c))
        } else {
            geometry::angle(frame.get(a), frame.get(b), frame.get(c))
        }
    }

    fn posture(&self, frame: &LandmarkFrame, validity: &ValidityResult) -> PostureMetrics {
        if !validity.core.is_valid {
            return PostureMetrics {
                spine_angle_deg: None,
                shoulder_level: None,
                hip_level: None,
                torso_rotation_deg: None,
                body_alignment: None,
            };
        }

        let shoulder_mid =
            frame.midpoint(PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder);
        let hip_mid = frame.midpoint(PoseLandmark::LeftHip, PoseLandmark::RightHip);

        let spine_angle_deg = shoulder_mid.zip(hip_mid).map(|(s, h)| {
            // Bearing of the hip-to-shoulder line off vertical; y grows
            // downward so an upright spine has the shoulders above the hips.
            (s.x - h.x).atan2(h.y - s.y).to_degrees().abs()
        });

        let shoulder_level = geometry::horizontal_deviation(
            frame.get(PoseLandmark::LeftShoulder),
            frame.get(PoseLandmark::RightShoulder),
        );
        let hip_level = geometry::horizontal_deviation(
            frame.get(PoseLandmark::LeftHip),
            frame.get(PoseLandmark::RightHip),
        );

        let torso_rotation_deg = frame
            .get(PoseLandmark::LeftShoulder)
            .zip(frame.get(PoseLandmark::RightShoulder))
            .zip(
                frame
                    .get(PoseLandmark::LeftHip)
                    .zip(frame.get(PoseLandmark::RightHip)),
            )
            .map(|(shoulders, hips)| geometry::rotation(shoulders, hips));

        let body_alignment = frame
            .get(PoseLandmark::Nose)
            .zip(shoulder_mid.zip(hip_mid))
            .and_then(|(nose, (s, h))| geometry::vertical_deviation(&[nose, s, h]));

        PostureMetrics {
            spine_angle_deg,
            shoulder_level,
            hip_level,
            torso_rotation_deg,
            body_alignment,
        }
    }

    fn head_metrics(frame: &LandmarkFrame) -> HeadMetrics {
        let nose = frame.get(PoseLandmark::Nose);
        let left_ear = frame.get(PoseLandmark::LeftEar);
        let right_ear = frame.get(PoseLandmark::RightEar);

        // Nose offset from the ear midpoint, normalized by ear spacing.
        let yaw_deg = nose.zip(left_ear.zip(right_ear)).and_then(|(n, (l, r))| {
            let spacing = (l.x - r.x).abs();
            if spacing < 1e-6 {
                return None;
            }
            let offset = n.x - (l.x + r.x) / 2.0;
            Some((offset / spacing).clamp(-1.0, 1.0).asin().to_degrees())
        });

        let roll_deg = frame
            .get(PoseLandmark::LeftEye)
            .zip(frame.get(PoseLandmark::RightEye))
            .map(|(l, r)| geometry::line_tilt(l, r));

        let left_eye_width = geometry::distance(
            frame.get(PoseLandmark::LeftEyeInner),
            frame.get(PoseLandmark::LeftEyeOuter),
        );
        let right_eye_width = geometry::distance(
            frame.get(PoseLandmark::RightEyeInner),
            frame.get(PoseLandmark::RightEyeOuter),
        );
        // Eye widths live in normalized units; rescale before the 0-100 map.
        let eye_symmetry =
            geometry::symmetry(left_eye_width.map(|w| w * 100.0), right_eye_width.map(|w| w * 100.0));

        HeadMetrics {
            yaw_deg,
            roll_deg,
            eye_symmetry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Landmark;

    /// A frontal standing pose with every landmark at the given confidence.
    fn standing_frame(timestamp: f64, confidence: f64) -> LandmarkFrame {
        let mut frame = LandmarkFrame::empty(timestamp);
        let place = |frame: &mut LandmarkFrame, index: PoseLandmark, x: f64, y: f64| {
            frame.set(index, Landmark::new(x, y, 0.0, confidence));
        };
        place(&mut frame, PoseLandmark::Nose, 0.5, 0.18);
        place(&mut frame, PoseLandmark::LeftEyeInner, 0.515, 0.16);
        place(&mut frame, PoseLandmark::LeftEye, 0.525, 0.16);
        place(&mut frame, PoseLandmark::LeftEyeOuter, 0.535, 0.16);
        place(&mut frame, PoseLandmark::RightEyeInner, 0.485, 0.16);
        place(&mut frame, PoseLandmark::RightEye, 0.475, 0.16);
        place(&mut frame, PoseLandmark::RightEyeOuter, 0.465, 0.16);
        place(&mut frame, PoseLandmark::LeftEar, 0.55, 0.17);
        place(&mut frame, PoseLandmark::RightEar, 0.45, 0.17);
        place(&mut frame, PoseLandmark::LeftShoulder, 0.58, 0.3);
        place(&mut frame, PoseLandmark::RightShoulder, 0.42, 0.3);
        place(&mut frame, PoseLandmark::LeftElbow, 0.62, 0.42);
        place(&mut frame, PoseLandmark::RightElbow, 0.38, 0.42);
        place(&mut frame, PoseLandmark::LeftWrist, 0.64, 0.53);
        place(&mut frame, PoseLandmark::RightWrist, 0.36, 0.53);
        place(&mut frame, PoseLandmark::LeftHip, 0.55, 0.55);
        place(&mut frame, PoseLandmark::RightHip, 0.45, 0.55);
        place(&mut frame, PoseLandmark::LeftKnee, 0.55, 0.72);
        place(&mut frame, PoseLandmark::RightKnee, 0.45, 0.72);
        place(&mut frame, PoseLandmark::LeftAnkle, 0.55, 0.88);
        place(&mut frame, PoseLandmark::RightAnkle, 0.45, 0.88);
        frame
    }

    #[test]
    fn standing_pose_measures_all_joints() {
        let mut engine = MetricsEngine::new(EngineConfig::default());
        let snapshot = engine.process(&standing_frame(0.0, 0.9));
        for joint in Joint::ALL {
            assert!(
                snapshot.angle(joint).is_some(),
                "{:?} missing from snapshot",
                joint
            );
        }
        // Straight legs: knee angle near 180.
        assert!(snapshot.angle(Joint::LeftKnee).unwrap() > 170.0);
        // Upright spine.
        assert!(snapshot.posture.spine_angle_deg.unwrap() < 5.0);
        assert_eq!(snapshot.posture.shoulder_level, Some(100.0));
    }

    #[test]
    fn low_confidence_segment_yields_absent_metrics_not_zero() {
        let mut engine = MetricsEngine::new(EngineConfig::default());
        let mut frame = standing_frame(0.0, 0.9);
        // Degrade the hips and below; upper body stays confident.
        for index in [
            PoseLandmark::LeftKnee,
            PoseLandmark::RightKnee,
            PoseLandmark::LeftAnkle,
            PoseLandmark::RightAnkle,
            PoseLandmark::LeftHip,
            PoseLandmark::RightHip,
        ] {
            let mut lm = frame.get(index).unwrap();
            lm.confidence = 0.2;
            frame.set(index, lm);
        }
        let snapshot = engine.process(&frame);
        assert!(snapshot.angle(Joint::LeftKnee).is_none());
        assert!(snapshot.angle(Joint::RightKnee).is_none());
        assert!(snapshot.knee_symmetry.is_none());
        // Upper body is unaffected by lower-body degradation.
        assert!(snapshot.angle(Joint::LeftElbow).is_some());
    }

    #[test]
    fn missing_landmark_degrades_only_dependent_angles() {
        let mut engine = MetricsEngine::new(EngineConfig::default());
        // Copy the standing pose minus the left wrist; that elbow becomes
        // unmeasurable while the upper segment can stay valid on the
        // remaining confident points.
        let full = standing_frame(0.0, 0.9);
        let mut frame = LandmarkFrame::empty(0.0);
        for index in [
            PoseLandmark::Nose,
            PoseLandmark::LeftShoulder,
            PoseLandmark::RightShoulder,
            PoseLandmark::LeftElbow,
            PoseLandmark::RightElbow,
            PoseLandmark::RightWrist,
            PoseLandmark::LeftHip,
            PoseLandmark::RightHip,
            PoseLandmark::LeftKnee,
            PoseLandmark::RightKnee,
            PoseLandmark::LeftAnkle,
            PoseLandmark::RightAnkle,
        ] {
            frame.set(index, full.get(index).unwrap());
        }
        let snapshot = engine.process(&frame);
        assert!(snapshot.angle(Joint::LeftElbow).is_none());
        assert!(snapshot.angle(Joint::RightElbow).is_some());
        assert!(snapshot.angle(Joint::LeftKnee).is_some());
    }

    #[test]
    fn empty_frame_yields_all_absent_snapshot() {
        let mut engine = MetricsEngine::new(EngineConfig::default());
        let snapshot = engine.process(&LandmarkFrame::empty(1.0));
        assert_eq!(snapshot.measured_joints().count(), 0);
        assert!(snapshot.posture.spine_angle_deg.is_none());
        assert!(snapshot.elbow_symmetry.is_none());
        assert_eq!(snapshot.stability, 100.0);
        assert!(snapshot.validity.all_invalid());
    }

    #[test]
    fn rom_accumulates_across_frames() {
        let mut engine = MetricsEngine::new(EngineConfig::default());
        // Same pose twice: ROM stays 0 for a static joint.
        engine.process(&standing_frame(0.0, 0.9));
        let snapshot = engine.process(&standing_frame(0.033, 0.9));
        assert!(snapshot.range_of_motion(Joint::LeftKnee) < 1.0);
    }

    #[test]
    fn head_metrics_gated_by_capability_flag() {
        let mut plain = MetricsEngine::new(EngineConfig::default());
        assert!(plain.process(&standing_frame(0.0, 0.9)).head.is_none());

        let mut with_face = MetricsEngine::new(EngineConfig {
            face_metrics: true,
            ..EngineConfig::default()
        });
        let head = with_face.process(&standing_frame(0.0, 0.9)).head.unwrap();
        // Frontal pose: nose centered between the ears, eyes level.
        assert!(head.yaw_deg.unwrap().abs() < 5.0);
        assert!(head.roll_deg.unwrap() < 5.0);
        assert!(head.eye_symmetry.unwrap() > 95.0);
    }

    #[test]
    fn reset_clears_rom() {
        let mut engine = MetricsEngine::new(EngineConfig::default());
        engine.process(&standing_frame(0.0, 0.9));
        engine.process(&standing_frame(0.033, 0.9));
        engine.reset();
        let snapshot = engine.process(&standing_frame(0.066, 0.9));
        // One sample after reset: floor.
        assert_eq!(snapshot.range_of_motion(Joint::LeftKnee), 0.0);
    }
}
