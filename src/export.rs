// src/export.rs - Session-scoped CSV export and summary reporting
use crate::events::EngineEvent;
use crate::landmarks::Joint;
use crate::metrics::MetricsSnapshot;
use anyhow::Result;
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct SnapshotRecord {
    timestamp: f64,
    frame: usize,

    left_elbow_deg: Option<f64>,
    right_elbow_deg: Option<f64>,
    left_shoulder_deg: Option<f64>,
    right_shoulder_deg: Option<f64>,
    left_hip_deg: Option<f64>,
    right_hip_deg: Option<f64>,
    left_knee_deg: Option<f64>,
    right_knee_deg: Option<f64>,

    spine_angle_deg: Option<f64>,
    shoulder_level: Option<f64>,
    hip_level: Option<f64>,
    torso_rotation_deg: Option<f64>,
    body_alignment: Option<f64>,
    elbow_symmetry: Option<f64>,
    knee_symmetry: Option<f64>,
    stability: f64,

    upper_valid: bool,
    core_valid: bool,
    lower_valid: bool,
}

/// Accumulates one session's snapshots and events in memory and writes a
/// per-frame CSV plus a plain-text summary. The engine itself persists
/// nothing; this lives with the caller and is dropped with the session.
pub struct SessionExporter {
    output_dir: PathBuf,
    session_name: String,
    records: Vec<SnapshotRecord>,
    rep_counts: BTreeMap<String, u32>,
    warning_count: usize,
    valid_frames: usize,
}

impl SessionExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name
            .unwrap_or_else(|| format!("session_{}", Local::now().format("%Y%m%d_%H%M%S")));
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            records: Vec::new(),
            rep_counts: BTreeMap::new(),
            warning_count: 0,
            valid_frames: 0,
        }
    }

    pub fn add_frame(&mut self, snapshot: &MetricsSnapshot, events: &[EngineEvent]) {
        if !snapshot.validity.all_invalid() {
            self.valid_frames += 1;
        }
        for event in events {
            match event {
                EngineEvent::RepCompleted {
                    exercise,
                    rep_count,
                    ..
                } => {
                    self.rep_counts.insert(exercise.clone(), *rep_count);
                }
                EngineEvent::FormWarning { .. } => self.warning_count += 1,
                EngineEvent::PhaseChanged { .. } => {}
            }
        }
        self.records.push(Self::record(self.records.len(), snapshot));
    }

    pub fn frame_count(&self) -> usize {
        self.records.len()
    }

    /// Write `<output_dir>/<session>/metrics.csv`, one row per frame.
    /// Absent metrics become empty cells, not zeros.
    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self
            .output_dir
            .join(&self.session_name)
            .join("metrics.csv");
        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(csv_path)
    }

    /// Write a plain-text session summary next to the CSV.
    pub fn write_summary(&self) -> Result<PathBuf> {
        let summary_path = self
            .output_dir
            .join(&self.session_name)
            .join("summary.txt");
        if let Some(parent) = summary_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let total = self.records.len();
        let valid_rate = if total == 0 {
            0.0
        } else {
            self.valid_frames as f64 / total as f64 * 100.0
        };

        let mut summary = String::new();
        summary.push_str(&format!("Session: {}\n", self.session_name));
        summary.push_str(&format!("Frames: {}\n", total));
        summary.push_str(&format!("Valid frame rate: {:.1}%\n", valid_rate));
        summary.push_str(&format!("Form warnings: {}\n", self.warning_count));
        if self.rep_counts.is_empty() {
            summary.push_str("Repetitions: none\n");
        } else {
            for (exercise, reps) in &self.rep_counts {
                summary.push_str(&format!("Repetitions ({}): {}\n", exercise, reps));
            }
        }

        std::fs::write(&summary_path, summary)?;
        Ok(summary_path)
    }

    fn record(frame: usize, snapshot: &MetricsSnapshot) -> SnapshotRecord {
        SnapshotRecord {
            timestamp: snapshot.timestamp,
            frame,
            left_elbow_deg: snapshot.angle(Joint::LeftElbow),
            right_elbow_deg: snapshot.angle(Joint::RightElbow),
            left_shoulder_deg: snapshot.angle(Joint::LeftShoulder),
            right_shoulder_deg: snapshot.angle(Joint::RightShoulder),
            left_hip_deg: snapshot.angle(Joint::LeftHip),
            right_hip_deg: snapshot.angle(Joint::RightHip),
            left_knee_deg: snapshot.angle(Joint::LeftKnee),
            right_knee_deg: snapshot.angle(Joint::RightKnee),
            spine_angle_deg: snapshot.posture.spine_angle_deg,
            shoulder_level: snapshot.posture.shoulder_level,
            hip_level: snapshot.posture.hip_level,
            torso_rotation_deg: snapshot.posture.torso_rotation_deg,
            body_alignment: snapshot.posture.body_alignment,
            elbow_symmetry: snapshot.elbow_symmetry,
            knee_symmetry: snapshot.knee_symmetry,
            stability: snapshot.stability,
            upper_valid: snapshot.validity.upper.is_valid,
            core_valid: snapshot.validity.core.is_valid,
            lower_valid: snapshot.validity.lower.is_valid,
        }
    }
}
