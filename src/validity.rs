// src/validity.rs - Per-frame confidence and framing plausibility checks
use crate::config::{DistanceConfig, OrientationConfig, SegmentThresholds};
use crate::geometry;
use crate::landmarks::{BodySegment, LandmarkFrame, PoseLandmark};
use serde::Serialize;

/// Validity verdict for one body segment.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SegmentValidity {
    pub is_valid: bool,
    pub confidence: f64,
}

/// Tri-state framing verdict plus the continuous estimate it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FramingState {
    TooClose,
    Optimal,
    TooFar,
    /// Not enough reference landmarks to estimate.
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DistanceEstimate {
    pub state: FramingState,
    /// Fraction of frame height spanned by the subject, when measurable.
    pub height_fraction: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OrientationCheck {
    pub shoulder_tilt_deg: Option<f64>,
    pub hip_tilt_deg: Option<f64>,
    pub torso_rotation_deg: Option<f64>,
    /// True when every measurable bound is within configuration.
    pub frontal: bool,
}

/// Everything the gate decided about one frame. Computed fresh per frame and
/// never persisted. The diagnostic messages exist for downstream UI; the
/// engine itself only consults the booleans.
#[derive(Debug, Clone, Serialize)]
pub struct ValidityResult {
    pub upper: SegmentValidity,
    pub core: SegmentValidity,
    pub lower: SegmentValidity,
    pub distance: DistanceEstimate,
    pub orientation: OrientationCheck,
    pub messages: Vec<String>,
}

impl ValidityResult {
    pub fn segment(&self, segment: BodySegment) -> SegmentValidity {
        match segment {
            BodySegment::Upper => self.upper,
            BodySegment::Core => self.core,
            BodySegment::Lower => self.lower,
        }
    }

    /// True when no segment passed the gate.
    pub fn all_invalid(&self) -> bool {
        !self.upper.is_valid && !self.core.is_valid && !self.lower.is_valid
    }
}

/// Decides, per frame, which metrics the landmark quality supports.
pub struct ValidityGate {
    thresholds: SegmentThresholds,
    distance: DistanceConfig,
    orientation: OrientationConfig,
}

impl ValidityGate {
    pub fn new(
        thresholds: SegmentThresholds,
        distance: DistanceConfig,
        orientation: OrientationConfig,
    ) -> Self {
        Self {
            thresholds,
            distance,
            orientation,
        }
    }

    /// Mean confidence over a landmark index set. Missing landmarks count
    /// as zero confidence rather than being skipped, so a half-empty
    /// segment scores low instead of looking clean.
    pub fn segment_confidence(frame: &LandmarkFrame, indices: &[PoseLandmark]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().map(|&i| frame.confidence(i)).sum::<f64>() / indices.len() as f64
    }

    fn threshold(&self, segment: BodySegment) -> f64 {
        match segment {
            BodySegment::Upper => self.thresholds.upper,
            BodySegment::Core => self.thresholds.core,
            BodySegment::Lower => self.thresholds.lower,
        }
    }

    fn check_segment(&self, frame: &LandmarkFrame, segment: BodySegment) -> SegmentValidity {
        let confidence = Self::segment_confidence(frame, segment.indices());
        SegmentValidity {
            is_valid: confidence > self.threshold(segment),
            confidence,
        }
    }

    /// Fraction of frame height spanned nose to ankle midpoint; falls back
    /// to shoulder width (scaled to an equivalent body-height span) when
    /// the ankles are not visible.
    pub fn estimate_distance(&self, frame: &LandmarkFrame) -> DistanceEstimate {
        let span = frame
            .get(PoseLandmark::Nose)
            .zip(frame.midpoint(PoseLandmark::LeftAnkle, PoseLandmark::RightAnkle))
            .map(|(nose, ankles)| (ankles.y - nose.y).abs())
            .or_else(|| {
                // Shoulder width runs roughly a quarter of standing height.
                geometry::distance(
                    frame.get(PoseLandmark::LeftShoulder),
                    frame.get(PoseLandmark::RightShoulder),
                )
                .map(|w| w * 4.0)
            });

        match span {
            None => DistanceEstimate {
                state: FramingState::Unknown,
                height_fraction: None,
            },
            Some(fraction) => {
                let state = if fraction > self.distance.max_height_fraction {
                    FramingState::TooClose
                } else if fraction < self.distance.min_height_fraction {
                    FramingState::TooFar
                } else {
                    FramingState::Optimal
                };
                DistanceEstimate {
                    state,
                    height_fraction: Some(fraction),
                }
            }
        }
    }

    /// Shoulder-line and hip-line bearings against the configured tilt and
    /// rotation bounds.
    pub fn orientation(&self, frame: &LandmarkFrame) -> OrientationCheck {
        let shoulders = frame
            .get(PoseLandmark::LeftShoulder)
            .zip(frame.get(PoseLandmark::RightShoulder));
        let hips = frame
            .get(PoseLandmark::LeftHip)
            .zip(frame.get(PoseLandmark::RightHip));

        let shoulder_tilt = shoulders.map(|(l, r)| geometry::line_tilt(l, r));
        let hip_tilt = hips.map(|(l, r)| geometry::line_tilt(l, r));
        let torso_rotation = shoulders.zip(hips).map(|(s, h)| geometry::rotation(s, h));

        let tilt_ok = |tilt: Option<f64>| tilt.map_or(true, |t| t <= self.orientation.max_tilt_deg);
        let frontal = tilt_ok(shoulder_tilt)
            && tilt_ok(hip_tilt)
            && torso_rotation.map_or(true, |r| r <= self.orientation.max_rotation_deg);

        OrientationCheck {
            shoulder_tilt_deg: shoulder_tilt,
            hip_tilt_deg: hip_tilt,
            torso_rotation_deg: torso_rotation,
            frontal,
        }
    }

    /// Run every check for one frame.
    pub fn check(&self, frame: &LandmarkFrame) -> ValidityResult {
        let upper = self.check_segment(frame, BodySegment::Upper);
        let core = self.check_segment(frame, BodySegment::Core);
        let lower = self.check_segment(frame, BodySegment::Lower);
        let distance = self.estimate_distance(frame);
        let orientation = self.orientation(frame);

        let mut messages = Vec::new();
        for (validity, segment) in [(upper, BodySegment::Upper), (core, BodySegment::Core), (lower, BodySegment::Lower)] {
            if !validity.is_valid {
                messages.push(format!(
                    "{} body confidence too low ({:.2})",
                    segment.name(),
                    validity.confidence
                ));
            }
        }
        match distance.state {
            FramingState::TooClose => messages.push("subject too close to camera".to_string()),
            FramingState::TooFar => messages.push("subject too far from camera".to_string()),
            FramingState::Unknown => messages.push("subject distance unknown".to_string()),
            FramingState::Optimal => {}
        }
        if !orientation.frontal {
            messages.push("face the camera squarely".to_string());
        }

        ValidityResult {
            upper,
            core,
            lower,
            distance,
            orientation,
            messages,
        }
    }
}
