// src/engine.rs - The per-frame entry point for one tracked subject
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::exercise::{builtin_profiles, ExercisePhaseStateMachine, ExerciseProfile, ExerciseState};
use crate::landmarks::{Joint, LandmarkFrame};
use crate::metrics::{MetricsEngine, MetricsSnapshot};

/// Everything produced for one submitted frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub snapshot: MetricsSnapshot,
    pub events: Vec<EngineEvent>,
}

/// The movement analysis engine for a single tracked subject.
///
/// Frame-synchronous and single-threaded: call [`process_frame`] once per
/// incoming landmark frame, at whatever rate the pose estimator produces
/// them. Nothing blocks, nothing queues, nothing is shared; serve multiple
/// subjects with one instance each.
///
/// [`process_frame`]: MovementEngine::process_frame
pub struct MovementEngine {
    metrics: MetricsEngine,
    exercise: ExercisePhaseStateMachine,
}

impl MovementEngine {
    /// Engine with the given configuration and exercise profiles. Fails
    /// only on malformed configuration; per-frame processing never does.
    pub fn new(config: EngineConfig, profiles: Vec<ExerciseProfile>) -> Result<Self, EngineError> {
        config.validate()?;
        let exercise = ExercisePhaseStateMachine::new(profiles, config.subject_loss_frames)?;
        Ok(Self {
            metrics: MetricsEngine::new(config),
            exercise,
        })
    }

    /// Engine with default configuration and the built-in profiles.
    pub fn with_defaults() -> Result<Self, EngineError> {
        Self::new(EngineConfig::default(), builtin_profiles())
    }

    /// Process one frame: gate validity, compute metrics, advance the
    /// exercise state machine, and return the snapshot plus any events.
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> FrameOutput {
        let snapshot = self.metrics.process(frame);
        let events = self.exercise.process(frame, &snapshot);
        FrameOutput { snapshot, events }
    }

    pub fn exercise_state(&self) -> &ExerciseState {
        self.exercise.state()
    }

    pub fn current_exercise(&self) -> Option<&str> {
        self.exercise.current_exercise()
    }

    pub fn current_phase(&self) -> Option<&str> {
        self.exercise.current_phase()
    }

    /// Degrees per second of a joint's last movement.
    pub fn rate_of_change(&self, joint: Joint) -> Option<f64> {
        self.metrics.rate_of_change(joint)
    }

    /// Session boundary: clear all histories and exercise state, e.g. on
    /// subject change.
    pub fn reset(&mut self) {
        self.metrics.reset();
        self.exercise.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Landmark, PoseLandmark};

    /// Frontal pose whose right knee is bent to `knee_deg`, built by
    /// swinging the ankle around the knee. All other joints are static.
    fn squat_frame(knee_deg: f64, timestamp: f64) -> LandmarkFrame {
        let mut frame = LandmarkFrame::empty(timestamp);
        let set = |frame: &mut LandmarkFrame, index: PoseLandmark, x: f64, y: f64| {
            frame.set(index, Landmark::new(x, y, 0.0, 0.9));
        };
        set(&mut frame, PoseLandmark::Nose, 0.5, 0.15);
        set(&mut frame, PoseLandmark::LeftShoulder, 0.58, 0.3);
        set(&mut frame, PoseLandmark::RightShoulder, 0.42, 0.3);
        set(&mut frame, PoseLandmark::LeftElbow, 0.62, 0.42);
        set(&mut frame, PoseLandmark::RightElbow, 0.38, 0.42);
        set(&mut frame, PoseLandmark::LeftWrist, 0.64, 0.52);
        set(&mut frame, PoseLandmark::RightWrist, 0.36, 0.52);
        set(&mut frame, PoseLandmark::LeftHip, 0.55, 0.5);
        set(&mut frame, PoseLandmark::RightHip, 0.45, 0.5);
        set(&mut frame, PoseLandmark::LeftKnee, 0.55, 0.68);
        set(&mut frame, PoseLandmark::RightKnee, 0.45, 0.68);
        set(&mut frame, PoseLandmark::LeftAnkle, 0.55, 0.86);

        // Right ankle placed so hip-knee-ankle subtends knee_deg at the
        // knee. The thigh points straight up from the knee; rotate the
        // shin by the interior angle.
        let hip = (0.45_f64, 0.5_f64);
        let knee = (0.45_f64, 0.68_f64);
        let thigh_bearing = (hip.1 - knee.1).atan2(hip.0 - knee.0);
        let shin_bearing = thigh_bearing + knee_deg.to_radians();
        let shin_len = 0.18;
        frame.set(
            PoseLandmark::RightAnkle,
            Landmark::new(
                knee.0 + shin_bearing.cos() * shin_len,
                knee.1 + shin_bearing.sin() * shin_len,
                0.0,
                0.9,
            ),
        );
        frame
    }

    fn run(engine: &mut MovementEngine, knee_angles: &[f64]) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        for (i, &deg) in knee_angles.iter().enumerate() {
            let out = engine.process_frame(&squat_frame(deg, i as f64 / 30.0));
            events.extend(out.events);
        }
        events
    }

    #[test]
    fn synthetic_frame_measures_requested_knee_angle() {
        let mut engine = MovementEngine::with_defaults().unwrap();
        for target in [170.0, 120.0, 95.0] {
            let out = engine.process_frame(&squat_frame(target, 0.0));
            let measured = out.snapshot.angle(Joint::RightKnee).unwrap();
            assert!(
                (measured - target).abs() < 2.0,
                "wanted {}, measured {}",
                target,
                measured
            );
        }
    }

    #[test]
    fn full_squat_through_the_pipeline_counts_one_rep() {
        let mut engine = MovementEngine::with_defaults().unwrap();
        let events = run(
            &mut engine,
            &[170.0, 160.0, 135.0, 115.0, 95.0, 97.0, 112.0, 130.0, 155.0, 168.0],
        );
        assert_eq!(engine.exercise_state().rep_count(), 1);
        assert_eq!(engine.current_exercise(), Some("squat"));

        let reps: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::RepCompleted { .. }))
            .collect();
        assert_eq!(reps.len(), 1);
        if let EngineEvent::RepCompleted {
            rep_count,
            range_of_motion,
            ..
        } = reps[0]
        {
            assert_eq!(*rep_count, 1);
            // The knee swept roughly 170 down to 95.
            assert!(*range_of_motion > 60.0);
        }
    }

    #[test]
    fn rate_of_change_tracks_descent_speed() {
        let mut engine = MovementEngine::with_defaults().unwrap();
        engine.process_frame(&squat_frame(170.0, 0.0));
        engine.process_frame(&squat_frame(160.0, 0.1));
        let rate = engine.rate_of_change(Joint::RightKnee).unwrap();
        // ~10 degrees in 0.1s, downward.
        assert!(rate < -50.0 && rate > -150.0);
    }

    #[test]
    fn reset_returns_engine_to_idle() {
        let mut engine = MovementEngine::with_defaults().unwrap();
        run(&mut engine, &[170.0, 135.0, 95.0]);
        assert!(engine.exercise_state().is_tracking());
        engine.reset();
        assert!(!engine.exercise_state().is_tracking());
        assert_eq!(engine.exercise_state().rep_count(), 0);
        assert!(engine.current_phase().is_none());
    }

    #[test]
    fn empty_frames_produce_output_without_events() {
        let mut engine = MovementEngine::with_defaults().unwrap();
        let out = engine.process_frame(&LandmarkFrame::empty(0.0));
        assert!(out.events.is_empty());
        assert_eq!(out.snapshot.measured_joints().count(), 0);
    }
}
