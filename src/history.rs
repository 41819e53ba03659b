// src/history.rs - Bounded temporal buffers for ROM, stability and rate queries
use crate::landmarks::Joint;
use nalgebra::Vector2;
use std::collections::{HashMap, VecDeque};

/// Divisor mapping positional variance magnitude to the 0-100 stability
/// score. Variance magnitude at or beyond this value scores 0.
const STABILITY_VARIANCE_FULL_SCALE: f64 = 0.1;

/// Bounded FIFO of a joint's recent angle samples, each with the frame
/// timestamp that produced it. Oldest sample evicted on overflow.
#[derive(Debug, Clone)]
pub struct AngleHistory {
    samples: VecDeque<(f64, f64)>, // (angle_deg, timestamp_s)
    capacity: usize,
}

impl AngleHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, angle_deg: f64, timestamp_s: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((angle_deg, timestamp_s));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, angle_deg: f64) -> bool {
        self.samples.iter().any(|&(a, _)| (a - angle_deg).abs() < 1e-9)
    }

    /// `max - min` over the buffer. Fewer than 2 samples is a defined
    /// floor of 0.0, not an error.
    pub fn range_of_motion(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &(angle, _) in &self.samples {
            min = min.min(angle);
            max = max.max(angle);
        }
        max - min
    }

    /// Degrees per second between the last two samples, using the real
    /// elapsed time between their frame timestamps. When the timestamps do
    /// not advance (duplicate or out-of-order frames) the caller's nominal
    /// interval stands in.
    pub fn rate_of_change(&self, nominal_interval_s: f64) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let (prev_angle, prev_ts) = self.samples[self.samples.len() - 2];
        let (last_angle, last_ts) = self.samples[self.samples.len() - 1];
        let elapsed = last_ts - prev_ts;
        let dt = if elapsed > 0.0 {
            elapsed
        } else {
            nominal_interval_s
        };
        Some((last_angle - prev_angle) / dt)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Sliding window of a center-of-mass-like reference point (hip midpoint)
/// behind the stability score.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    positions: VecDeque<Vector2<f64>>,
    capacity: usize,
}

impl StabilityTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            positions: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, position: Vector2<f64>) {
        if self.positions.len() == self.capacity {
            self.positions.pop_front();
        }
        self.positions.push_back(position);
    }

    /// Inverse positional variance mapped to 0-100. Fewer than 2 samples
    /// is insufficiently informative and scores 100 (assume stable).
    pub fn stability(&self) -> f64 {
        if self.positions.len() < 2 {
            return 100.0;
        }
        let n = self.positions.len() as f64;
        let mean_x = self.positions.iter().map(|p| p.x).sum::<f64>() / n;
        let mean_y = self.positions.iter().map(|p| p.y).sum::<f64>() / n;
        let var_x = self.positions.iter().map(|p| (p.x - mean_x).powi(2)).sum::<f64>() / n;
        let var_y = self.positions.iter().map(|p| (p.y - mean_y).powi(2)).sum::<f64>() / n;

        let magnitude = var_x.hypot(var_y);
        100.0 * (1.0 - (magnitude / STABILITY_VARIANCE_FULL_SCALE).min(1.0))
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

/// Per-joint angle histories for one tracked subject.
#[derive(Debug)]
pub struct JointHistories {
    histories: HashMap<Joint, AngleHistory>,
    capacity: usize,
}

impl JointHistories {
    pub fn new(capacity: usize) -> Self {
        Self {
            histories: HashMap::new(),
            capacity,
        }
    }

    pub fn push(&mut self, joint: Joint, angle_deg: f64, timestamp_s: f64) {
        self.histories
            .entry(joint)
            .or_insert_with(|| AngleHistory::new(self.capacity))
            .push(angle_deg, timestamp_s);
    }

    pub fn get(&self, joint: Joint) -> Option<&AngleHistory> {
        self.histories.get(&joint)
    }

    pub fn range_of_motion(&self, joint: Joint) -> f64 {
        self.histories
            .get(&joint)
            .map_or(0.0, |h| h.range_of_motion())
    }

    pub fn rate_of_change(&self, joint: Joint, nominal_interval_s: f64) -> Option<f64> {
        self.histories
            .get(&joint)
            .and_then(|h| h.rate_of_change(nominal_interval_s))
    }

    pub fn clear(&mut self) {
        self.histories.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_bound_holds_and_oldest_is_evicted() {
        let mut history = AngleHistory::new(5);
        for i in 0..6 {
            history.push(i as f64, i as f64 * 0.033);
        }
        assert_eq!(history.len(), 5);
        assert!(!history.contains(0.0));
        assert!(history.contains(5.0));
    }

    #[test]
    fn rom_floor_with_too_few_samples() {
        let mut history = AngleHistory::new(30);
        assert_eq!(history.range_of_motion(), 0.0);
        history.push(90.0, 0.0);
        assert_eq!(history.range_of_motion(), 0.0);
    }

    #[test]
    fn rom_is_max_minus_min() {
        let mut history = AngleHistory::new(30);
        for (i, angle) in [60.0, 90.0, 75.0].into_iter().enumerate() {
            history.push(angle, i as f64 * 0.033);
        }
        assert!((history.range_of_motion() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn rate_uses_real_timestamps() {
        let mut history = AngleHistory::new(30);
        history.push(100.0, 1.0);
        history.push(110.0, 1.2);
        let rate = history.rate_of_change(0.5).unwrap();
        assert!((rate - 50.0).abs() < 1e-6);
    }

    #[test]
    fn rate_falls_back_to_nominal_interval() {
        let mut history = AngleHistory::new(30);
        history.push(100.0, 1.0);
        history.push(110.0, 1.0); // duplicate timestamp
        let rate = history.rate_of_change(0.5).unwrap();
        assert!((rate - 20.0).abs() < 1e-6);
    }

    #[test]
    fn rate_none_with_one_sample() {
        let mut history = AngleHistory::new(30);
        history.push(100.0, 1.0);
        assert!(history.rate_of_change(0.5).is_none());
    }

    #[test]
    fn stability_floor_is_100() {
        let tracker = StabilityTracker::new(100);
        assert_eq!(tracker.stability(), 100.0);
    }

    #[test]
    fn still_subject_scores_near_100() {
        let mut tracker = StabilityTracker::new(100);
        for _ in 0..50 {
            tracker.push(Vector2::new(0.5, 0.6));
        }
        assert!(tracker.stability() > 99.0);
    }

    #[test]
    fn swaying_subject_scores_lower_than_still() {
        let mut still = StabilityTracker::new(100);
        let mut swaying = StabilityTracker::new(100);
        for i in 0..50 {
            still.push(Vector2::new(0.5, 0.6));
            let t = i as f64 * 0.4;
            swaying.push(Vector2::new(0.5 + 0.2 * t.sin(), 0.6 + 0.2 * t.cos()));
        }
        assert!(swaying.stability() < still.stability());
    }

    #[test]
    fn joint_histories_reset_clears_everything() {
        let mut histories = JointHistories::new(30);
        histories.push(Joint::LeftKnee, 120.0, 0.0);
        histories.push(Joint::LeftKnee, 90.0, 0.033);
        assert!(histories.range_of_motion(Joint::LeftKnee) > 0.0);
        histories.clear();
        assert_eq!(histories.range_of_motion(Joint::LeftKnee), 0.0);
        assert!(histories.get(Joint::LeftKnee).is_none());
    }
}
