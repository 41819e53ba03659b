// src/landmarks.rs - Canonical landmark frame types and the fixed 33-point topology
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Number of points in the pose topology. Fixed for a whole session.
pub const LANDMARK_COUNT: usize = 33;

/// A single tracked anatomical point.
///
/// `x` and `y` are normalized to the frame ([0,1]); `z` is relative and
/// unitless; `confidence` is the estimator's certainty in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub confidence: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, confidence: f64) -> Self {
        Self { x, y, z, confidence }
    }

    pub fn xy(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn xyz(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// One frame of pose estimation output: 33 optional landmarks plus the
/// capture timestamp in seconds.
///
/// A slot is `None` when the estimator produced nothing usable for that
/// point. The index-to-joint mapping ([`PoseLandmark`]) never changes
/// within a session.
#[derive(Debug, Clone)]
pub struct LandmarkFrame {
    points: [Option<Landmark>; LANDMARK_COUNT],
    pub timestamp: f64,
}

impl LandmarkFrame {
    pub fn new(points: [Option<Landmark>; LANDMARK_COUNT], timestamp: f64) -> Self {
        Self { points, timestamp }
    }

    /// A frame with every slot empty. Still a well-formed input.
    pub fn empty(timestamp: f64) -> Self {
        Self {
            points: [None; LANDMARK_COUNT],
            timestamp,
        }
    }

    pub fn get(&self, index: PoseLandmark) -> Option<Landmark> {
        self.points[index as usize]
    }

    pub fn set(&mut self, index: PoseLandmark, landmark: Landmark) {
        self.points[index as usize] = Some(landmark);
    }

    /// Confidence of a slot, 0.0 when missing.
    pub fn confidence(&self, index: PoseLandmark) -> f64 {
        self.points[index as usize].map_or(0.0, |l| l.confidence)
    }

    /// Midpoint of two landmarks, averaging all three coordinates. The
    /// confidence of the synthetic point is the lower of the pair.
    pub fn midpoint(&self, a: PoseLandmark, b: PoseLandmark) -> Option<Landmark> {
        let pa = self.get(a)?;
        let pb = self.get(b)?;
        Some(Landmark {
            x: (pa.x + pb.x) / 2.0,
            y: (pa.y + pb.y) / 2.0,
            z: (pa.z + pb.z) / 2.0,
            confidence: pa.confidence.min(pb.confidence),
        })
    }
}

/// MediaPipe pose landmark indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

/// Joints the engine measures, each defined by the (a, vertex, c) landmark
/// triple whose angle at the vertex is the joint angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    LeftElbow,
    RightElbow,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
}

impl Joint {
    pub const ALL: [Joint; 8] = [
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
    ];

    /// The (a, vertex, c) landmark triple for this joint.
    pub fn triple(&self) -> (PoseLandmark, PoseLandmark, PoseLandmark) {
        use PoseLandmark::*;
        match self {
            Joint::LeftElbow => (LeftShoulder, LeftElbow, LeftWrist),
            Joint::RightElbow => (RightShoulder, RightElbow, RightWrist),
            Joint::LeftShoulder => (LeftHip, LeftShoulder, LeftElbow),
            Joint::RightShoulder => (RightHip, RightShoulder, RightElbow),
            Joint::LeftHip => (LeftShoulder, LeftHip, LeftKnee),
            Joint::RightHip => (RightShoulder, RightHip, RightKnee),
            Joint::LeftKnee => (LeftHip, LeftKnee, LeftAnkle),
            Joint::RightKnee => (RightHip, RightKnee, RightAnkle),
        }
    }

    /// Which body segment gates this joint's measurement.
    pub fn segment(&self) -> BodySegment {
        match self {
            Joint::LeftElbow | Joint::RightElbow | Joint::LeftShoulder | Joint::RightShoulder => {
                BodySegment::Upper
            }
            Joint::LeftHip | Joint::RightHip => BodySegment::Core,
            Joint::LeftKnee | Joint::RightKnee => BodySegment::Lower,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
        }
    }
}

/// Body regions used for confidence gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySegment {
    Upper,
    Core,
    Lower,
}

impl BodySegment {
    pub const ALL: [BodySegment; 3] = [BodySegment::Upper, BodySegment::Core, BodySegment::Lower];

    /// Landmark indices whose mean confidence decides segment validity.
    pub fn indices(&self) -> &'static [PoseLandmark] {
        use PoseLandmark::*;
        match self {
            BodySegment::Upper => &[
                LeftShoulder,
                RightShoulder,
                LeftElbow,
                RightElbow,
                LeftWrist,
                RightWrist,
            ],
            BodySegment::Core => &[LeftShoulder, RightShoulder, LeftHip, RightHip],
            BodySegment::Lower => &[
                LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BodySegment::Upper => "upper",
            BodySegment::Core => "core",
            BodySegment::Lower => "lower",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_has_no_points() {
        let frame = LandmarkFrame::empty(0.0);
        assert!(frame.get(PoseLandmark::Nose).is_none());
        assert_eq!(frame.confidence(PoseLandmark::LeftKnee), 0.0);
    }

    #[test]
    fn midpoint_averages_and_takes_min_confidence() {
        let mut frame = LandmarkFrame::empty(0.0);
        frame.set(PoseLandmark::LeftHip, Landmark::new(0.4, 0.6, 0.0, 0.9));
        frame.set(PoseLandmark::RightHip, Landmark::new(0.6, 0.6, 0.2, 0.7));

        let mid = frame
            .midpoint(PoseLandmark::LeftHip, PoseLandmark::RightHip)
            .unwrap();
        assert!((mid.x - 0.5).abs() < 1e-9);
        assert!((mid.z - 0.1).abs() < 1e-9);
        assert!((mid.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn midpoint_is_none_when_either_side_missing() {
        let mut frame = LandmarkFrame::empty(0.0);
        frame.set(PoseLandmark::LeftHip, Landmark::new(0.4, 0.6, 0.0, 0.9));
        assert!(frame
            .midpoint(PoseLandmark::LeftHip, PoseLandmark::RightHip)
            .is_none());
    }

    #[test]
    fn every_joint_belongs_to_a_segment_that_contains_its_vertex() {
        for joint in Joint::ALL {
            let (_, vertex, _) = joint.triple();
            let segment = joint.segment();
            assert!(
                segment.indices().contains(&vertex),
                "{:?} vertex not gated by {:?}",
                joint,
                segment
            );
        }
    }
}
