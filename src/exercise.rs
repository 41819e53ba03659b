// src/exercise.rs - Exercise profiles, phase state machine, rep counting, form checks
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::landmarks::{Joint, LandmarkFrame, PoseLandmark};
use crate::metrics::MetricsSnapshot;
use crate::validity::ValidityGate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which way the primary-joint angle must cross a phase boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossDirection {
    Below,
    Above,
}

/// Exit boundary of a phase: the state machine advances when the primary
/// joint's angle crosses `threshold_deg` in `direction`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdCrossing {
    pub threshold_deg: f64,
    pub direction: CrossDirection,
}

/// One named stage of the exercise cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    pub exit: ThresholdCrossing,
}

/// Conditions for matching a profile from the idle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StartCondition {
    pub min_angle_deg: f64,
    pub max_angle_deg: f64,
    /// Mean confidence the tracked points must exceed.
    pub min_confidence: f64,
}

/// Movement-quality predicate evaluated every tracked frame. A check passes
/// when its input is unmeasured this frame; warnings only come from data
/// the engine actually has.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum FormCheck {
    /// Spine must stay within `max_deg` of vertical.
    MaxSpineAngle { max_deg: f64, message: String },
    /// Shoulder levelness score must stay at or above `min_score`.
    MinShoulderLevel { min_score: f64, message: String },
    /// A joint angle must stay inside [min_deg, max_deg].
    JointAngleRange {
        joint: Joint,
        min_deg: f64,
        max_deg: f64,
        message: String,
    },
}

impl FormCheck {
    /// The warning message when the check fails, `None` when it passes.
    fn evaluate(&self, snapshot: &MetricsSnapshot) -> Option<&str> {
        match self {
            FormCheck::MaxSpineAngle { max_deg, message } => snapshot
                .posture
                .spine_angle_deg
                .filter(|angle| angle > max_deg)
                .map(|_| message.as_str()),
            FormCheck::MinShoulderLevel { min_score, message } => snapshot
                .posture
                .shoulder_level
                .filter(|score| score < min_score)
                .map(|_| message.as_str()),
            FormCheck::JointAngleRange {
                joint,
                min_deg,
                max_deg,
                message,
            } => snapshot
                .angle(*joint)
                .filter(|angle| angle < min_deg || angle > max_deg)
                .map(|_| message.as_str()),
        }
    }
}

/// Static configuration for one recognizable exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseProfile {
    pub name: String,
    /// The joint whose angle drives phase transitions.
    pub primary_joint: Joint,
    /// Landmarks whose mean confidence gates start matching.
    pub tracked_points: Vec<PoseLandmark>,
    pub start: StartCondition,
    /// Ordered phase cycle; wrapping back to the first phase completes a rep.
    pub phases: Vec<PhaseSpec>,
    #[serde(default)]
    pub form_checks: Vec<FormCheck>,
}

impl ExerciseProfile {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.phases.is_empty() {
            return Err(EngineError::EmptyPhases(self.name.clone()));
        }
        if self.tracked_points.is_empty() {
            return Err(EngineError::EmptyTrackedPoints(self.name.clone()));
        }
        if self.start.min_angle_deg > self.start.max_angle_deg {
            return Err(EngineError::InvalidStartBand {
                profile: self.name.clone(),
                min_deg: self.start.min_angle_deg,
                max_deg: self.start.max_angle_deg,
            });
        }
        if !(0.0..=1.0).contains(&self.start.min_confidence) {
            return Err(EngineError::InvalidConfidenceThreshold {
                profile: self.name.clone(),
                threshold: self.start.min_confidence,
            });
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }
}

static BUILTIN_PROFILES: Lazy<Vec<ExerciseProfile>> = Lazy::new(|| {
    use PoseLandmark::*;
    vec![
        ExerciseProfile {
            name: "squat".to_string(),
            primary_joint: Joint::RightKnee,
            tracked_points: vec![LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle],
            start: StartCondition {
                min_angle_deg: 150.0,
                max_angle_deg: 180.0,
                min_confidence: 0.5,
            },
            phases: vec![
                PhaseSpec {
                    name: "preparation".to_string(),
                    exit: ThresholdCrossing {
                        threshold_deg: 140.0,
                        direction: CrossDirection::Below,
                    },
                },
                PhaseSpec {
                    name: "descent".to_string(),
                    exit: ThresholdCrossing {
                        threshold_deg: 100.0,
                        direction: CrossDirection::Below,
                    },
                },
                PhaseSpec {
                    name: "hold".to_string(),
                    exit: ThresholdCrossing {
                        threshold_deg: 110.0,
                        direction: CrossDirection::Above,
                    },
                },
                PhaseSpec {
                    name: "ascent".to_string(),
                    exit: ThresholdCrossing {
                        threshold_deg: 150.0,
                        direction: CrossDirection::Above,
                    },
                },
            ],
            form_checks: vec![
                FormCheck::MaxSpineAngle {
                    max_deg: 20.0,
                    message: "Straighten your back".to_string(),
                },
                FormCheck::MinShoulderLevel {
                    min_score: 90.0,
                    message: "Level your shoulders".to_string(),
                },
            ],
        },
        ExerciseProfile {
            name: "pushup".to_string(),
            primary_joint: Joint::RightElbow,
            tracked_points: vec![
                LeftShoulder,
                RightShoulder,
                LeftElbow,
                RightElbow,
                LeftWrist,
                RightWrist,
            ],
            start: StartCondition {
                min_angle_deg: 150.0,
                max_angle_deg: 180.0,
                min_confidence: 0.5,
            },
            phases: vec![
                PhaseSpec {
                    name: "up".to_string(),
                    exit: ThresholdCrossing {
                        threshold_deg: 140.0,
                        direction: CrossDirection::Below,
                    },
                },
                PhaseSpec {
                    name: "descent".to_string(),
                    exit: ThresholdCrossing {
                        threshold_deg: 90.0,
                        direction: CrossDirection::Below,
                    },
                },
                PhaseSpec {
                    name: "hold".to_string(),
                    exit: ThresholdCrossing {
                        threshold_deg: 100.0,
                        direction: CrossDirection::Above,
                    },
                },
                PhaseSpec {
                    name: "ascent".to_string(),
                    exit: ThresholdCrossing {
                        threshold_deg: 150.0,
                        direction: CrossDirection::Above,
                    },
                },
            ],
            form_checks: vec![FormCheck::MaxSpineAngle {
                max_deg: 25.0,
                message: "Keep your body in a straight line".to_string(),
            }],
        },
    ]
});

/// The built-in squat and pushup profiles.
pub fn builtin_profiles() -> Vec<ExerciseProfile> {
    BUILTIN_PROFILES.clone()
}

/// Mutable per-subject tracking state.
#[derive(Debug, Clone)]
pub struct ExerciseState {
    profile_index: Option<usize>,
    phase_index: usize,
    rep_count: u32,
    tracked_frames: u32,
    clean_frames: u32,
    missed_frames: usize,
}

impl ExerciseState {
    fn idle() -> Self {
        Self {
            profile_index: None,
            phase_index: 0,
            rep_count: 0,
            tracked_frames: 0,
            clean_frames: 0,
            missed_frames: 0,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.profile_index.is_some()
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    /// Fraction of tracked frames without form warnings, 0-100. A session
    /// with no tracked frames yet scores 100.
    pub fn form_score(&self) -> f64 {
        if self.tracked_frames == 0 {
            100.0
        } else {
            self.clean_frames as f64 / self.tracked_frames as f64 * 100.0
        }
    }
}

/// Matches the frame stream against configured profiles, tracks phase
/// transitions, counts reps, and runs form checks.
pub struct ExercisePhaseStateMachine {
    profiles: Vec<ExerciseProfile>,
    subject_loss_frames: usize,
    state: ExerciseState,
}

impl ExercisePhaseStateMachine {
    pub fn new(
        profiles: Vec<ExerciseProfile>,
        subject_loss_frames: usize,
    ) -> Result<Self, EngineError> {
        for profile in &profiles {
            profile.validate()?;
        }
        Ok(Self {
            profiles,
            subject_loss_frames,
            state: ExerciseState::idle(),
        })
    }

    pub fn state(&self) -> &ExerciseState {
        &self.state
    }

    /// Name of the exercise being tracked, if any.
    pub fn current_exercise(&self) -> Option<&str> {
        self.state
            .profile_index
            .map(|i| self.profiles[i].name.as_str())
    }

    /// Name of the active phase, if tracking.
    pub fn current_phase(&self) -> Option<&str> {
        self.state
            .profile_index
            .map(|i| self.profiles[i].phases[self.state.phase_index].name.as_str())
    }

    /// Clear exercise, phase, rep count and form accumulators.
    pub fn reset(&mut self) {
        self.state = ExerciseState::idle();
    }

    /// Advance the machine by one frame.
    pub fn process(&mut self, frame: &LandmarkFrame, snapshot: &MetricsSnapshot) -> Vec<EngineEvent> {
        match self.state.profile_index {
            None => self.try_start(frame, snapshot),
            Some(index) => self.track(index, snapshot),
        }
    }

    /// First profile (declaration order) whose confidence and start band
    /// are simultaneously satisfied wins. The order dependence is the
    /// documented policy for ambiguous matches.
    fn try_start(&mut self, frame: &LandmarkFrame, snapshot: &MetricsSnapshot) -> Vec<EngineEvent> {
        for (index, profile) in self.profiles.iter().enumerate() {
            let confidence = ValidityGate::segment_confidence(frame, &profile.tracked_points);
            if confidence <= profile.start.min_confidence {
                continue;
            }
            let Some(angle) = snapshot.angle(profile.primary_joint) else {
                continue;
            };
            if angle < profile.start.min_angle_deg || angle > profile.start.max_angle_deg {
                continue;
            }

            debug!(
                exercise = %profile.name,
                angle_deg = angle,
                confidence,
                "exercise matched"
            );
            self.state = ExerciseState {
                profile_index: Some(index),
                ..ExerciseState::idle()
            };
            return vec![EngineEvent::PhaseChanged {
                exercise: profile.name.clone(),
                from_phase: "idle".to_string(),
                to_phase: profile.phases[0].name.clone(),
                timestamp: snapshot.timestamp,
            }];
        }
        Vec::new()
    }

    fn track(&mut self, index: usize, snapshot: &MetricsSnapshot) -> Vec<EngineEvent> {
        let profile = &self.profiles[index];
        let mut events = Vec::new();

        let Some(angle) = snapshot.angle(profile.primary_joint) else {
            self.state.missed_frames += 1;
            if self.state.missed_frames >= self.subject_loss_frames {
                debug!(exercise = %profile.name, "subject lost, returning to idle");
                self.reset();
            }
            return events;
        };
        self.state.missed_frames = 0;
        self.state.tracked_frames += 1;

        let warnings: Vec<String> = profile
            .form_checks
            .iter()
            .filter_map(|check| check.evaluate(snapshot).map(str::to_string))
            .collect();
        if warnings.is_empty() {
            self.state.clean_frames += 1;
        } else {
            events.push(EngineEvent::FormWarning {
                exercise: profile.name.clone(),
                messages: warnings,
                timestamp: snapshot.timestamp,
            });
        }

        let exit = &profile.phases[self.state.phase_index].exit;
        let crossed = match exit.direction {
            CrossDirection::Below => angle < exit.threshold_deg,
            CrossDirection::Above => angle > exit.threshold_deg,
        };
        if crossed {
            let from_phase = profile.phases[self.state.phase_index].name.clone();
            self.state.phase_index = (self.state.phase_index + 1) % profile.phases.len();
            let to_phase = profile.phases[self.state.phase_index].name.clone();
            debug!(exercise = %profile.name, %from_phase, %to_phase, angle_deg = angle, "phase transition");
            events.push(EngineEvent::PhaseChanged {
                exercise: profile.name.clone(),
                from_phase,
                to_phase,
                timestamp: snapshot.timestamp,
            });

            // Wrapping back to the first phase closes the cycle.
            if self.state.phase_index == 0 {
                self.state.rep_count += 1;
                events.push(EngineEvent::RepCompleted {
                    exercise: profile.name.clone(),
                    rep_count: self.state.rep_count,
                    form_score: self.state.form_score(),
                    range_of_motion: snapshot.range_of_motion(profile.primary_joint),
                    timestamp: snapshot.timestamp,
                });
            }
        }

        events
    }
}
