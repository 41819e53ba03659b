// src/events.rs - Typed output events for downstream renderers and UI
use serde::Serialize;

/// Events emitted by the engine, returned from each `process_frame` call.
///
/// No global bus: the caller receives the events for the frame it submitted
/// and routes them wherever it likes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    PhaseChanged {
        exercise: String,
        from_phase: String,
        to_phase: String,
        timestamp: f64,
    },
    RepCompleted {
        exercise: String,
        rep_count: u32,
        /// Fraction of tracked frames this session without form warnings,
        /// 0-100.
        form_score: f64,
        /// Primary-joint range of motion over the recent window, degrees.
        range_of_motion: f64,
        timestamp: f64,
    },
    FormWarning {
        exercise: String,
        messages: Vec<String>,
        timestamp: f64,
    },
}
