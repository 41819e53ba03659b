//! Streaming biomechanical analysis over pose-estimation landmark frames.
//!
//! An external pose estimator produces one 33-point [`LandmarkFrame`] per
//! video frame; a [`MovementEngine`] turns that stream into joint angles,
//! posture indicators, symmetry and stability scores, exercise phase
//! tracking and repetition counts. Per-frame data is confidence-gated:
//! metrics the landmark quality cannot support are withheld rather than
//! fabricated, and nothing the engine does per frame can fail.
//!
//! ```no_run
//! use movement_engine::{LandmarkFrame, MovementEngine};
//!
//! let mut engine = MovementEngine::with_defaults()?;
//! let frame = LandmarkFrame::empty(0.0); // from the pose estimator
//! let output = engine.process_frame(&frame);
//! for event in &output.events {
//!     println!("{:?}", event);
//! }
//! # Ok::<(), movement_engine::EngineError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod exercise;
pub mod export;
pub mod geometry;
pub mod history;
pub mod landmarks;
pub mod metrics;
pub mod validity;

pub use config::EngineConfig;
pub use engine::{FrameOutput, MovementEngine};
pub use error::EngineError;
pub use events::EngineEvent;
pub use exercise::{builtin_profiles, ExerciseProfile, ExercisePhaseStateMachine};
pub use export::SessionExporter;
pub use landmarks::{BodySegment, Joint, Landmark, LandmarkFrame, PoseLandmark, LANDMARK_COUNT};
pub use metrics::{MetricsEngine, MetricsSnapshot};
pub use validity::{ValidityGate, ValidityResult};
