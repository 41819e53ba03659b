// src/error.rs
use thiserror::Error;

/// Construction-time validation failures.
///
/// Per-frame processing is infallible: degraded input produces absent
/// metrics, never an error. This type only guards engine and profile
/// configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("exercise profile '{0}' has no phases")]
    EmptyPhases(String),

    #[error("exercise profile '{profile}' start band is inverted ({min_deg} > {max_deg})")]
    InvalidStartBand {
        profile: String,
        min_deg: f64,
        max_deg: f64,
    },

    #[error("exercise profile '{0}' tracks no landmarks")]
    EmptyTrackedPoints(String),

    #[error("exercise profile '{profile}' confidence threshold {threshold} outside [0,1]")]
    InvalidConfidenceThreshold { profile: String, threshold: f64 },

    #[error("history capacity must be at least 1")]
    ZeroHistoryCapacity,

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
