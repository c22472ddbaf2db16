use std::collections::VecDeque;
use serde::Serialize;

use crate::detection::constants::MonotonicMillis;
use crate::detection::stats::SessionStats;
use crate::detection::types::{BreathState, CalibrationBounds, GestureEvent, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineCommand {
    SetThresholds(Thresholds),
    ResetSession,
    ResetCalibration,
    StartCalibration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineEvent {
    StateChange {
        from: BreathState,
        to: BreathState,
        at: MonotonicMillis,
        normalized: f32,
    },
    BreathCompleted {
        count: u32,
        duration_ms: MonotonicMillis,
        average_ms: f32,
    },
    Gesture {
        gesture: GestureEvent,
        at: MonotonicMillis,
    },
    CalibrationSaved(Thresholds),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Start in calibration mode: learn thresholds until the user holds their breath.
    pub calibrate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub samples: usize,
    pub stats: SessionStats,
    pub thresholds: Thresholds,
    pub calibration_bounds: CalibrationBounds,
    /// Every gesture seen, including those no longer in `gestures`.
    pub gesture_count: usize,
    /// The most recent gestures, oldest first.
    pub gestures: Vec<(MonotonicMillis, GestureEvent)>,
}

/// Bounded record of recognized gestures; a stdin session can run indefinitely.
#[derive(Debug, Clone)]
pub struct GestureLog {
    recent: VecDeque<(MonotonicMillis, GestureEvent)>,
    capacity: usize,
    total: usize,
}

impl GestureLog {
    pub fn new(capacity: usize) -> Self {
        GestureLog {
            recent: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    pub fn push(&mut self, at: MonotonicMillis, gesture: GestureEvent) {
        if self.capacity == 0 {
            self.total += 1;
            return;
        }
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back((at, gesture));
        self.total += 1;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn recent(&self) -> Vec<(MonotonicMillis, GestureEvent)> {
        self.recent.iter().copied().collect()
    }
}
