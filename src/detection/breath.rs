use log::debug;

use crate::detection::constants::{HOLD_STABILITY_PA, HOLD_TIMEOUT_MS, MonotonicMillis};
use crate::detection::types::{BreathState, Thresholds};

/// What happened during a single `detect` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreathEventInfo {
    pub previous_state: BreathState,
    pub transitioned: bool,
    /// Set when this tick completed an exhale to inhale cycle; holds the cycle duration.
    pub completed_cycle_ms: Option<MonotonicMillis>,
}

/// Classifies pressure deltas into breath states and keeps the session statistics.
#[derive(Debug, Clone)]
pub struct BreathDetector {
    thresholds: Thresholds,
    current_state: BreathState,
    breath_start_time: MonotonicMillis,
    last_breath_time: MonotonicMillis,
    breath_count: u32,
    average_breath_duration_ms: f32,
    session_start_time: MonotonicMillis,
}

impl BreathDetector {
    pub fn new(thresholds: Thresholds, now: MonotonicMillis) -> Self {
        BreathDetector {
            thresholds,
            current_state: BreathState::Idle,
            breath_start_time: now,
            last_breath_time: now,
            breath_count: 0,
            average_breath_duration_ms: 0.0,
            session_start_time: now,
        }
    }

    fn classify(&self, delta: f32, now: MonotonicMillis) -> BreathState {
        if delta < self.thresholds.inhale {
            BreathState::Inhale
        } else if delta > self.thresholds.exhale {
            BreathState::Exhale
        } else if now.saturating_sub(self.last_breath_time) > HOLD_TIMEOUT_MS
            && delta.abs() < HOLD_STABILITY_PA
        {
            BreathState::Hold
        } else {
            BreathState::Idle
        }
    }

    pub fn detect(&mut self, delta: f32, now: MonotonicMillis) -> (BreathState, BreathEventInfo) {
        let previous_state = self.current_state;
        let state = self.classify(delta, now);

        let mut info = BreathEventInfo {
            previous_state,
            transitioned: previous_state != state,
            completed_cycle_ms: None,
        };

        if info.transitioned {
            self.current_state = state;
            self.breath_start_time = now;

            if previous_state == BreathState::Exhale && state == BreathState::Inhale {
                let duration = now.saturating_sub(self.last_breath_time);
                self.breath_count += 1;

                if self.breath_count == 1 {
                    self.average_breath_duration_ms = duration as f32;
                } else {
                    let count = self.breath_count as f32;
                    self.average_breath_duration_ms =
                        (self.average_breath_duration_ms * (count - 1.0) + duration as f32) / count;
                }

                info.completed_cycle_ms = Some(duration);
            }

            debug!("{} -> {} at {} ms ({:.2} Pa)", previous_state, state, now, delta);
            self.last_breath_time = now;
        }

        (state, info)
    }

    /// Clears the counters; the current state and thresholds are kept.
    pub fn reset_session(&mut self, now: MonotonicMillis) {
        self.breath_count = 0;
        self.average_breath_duration_ms = 0.0;
        self.session_start_time = now;
    }

    pub fn state(&self) -> BreathState {
        self.current_state
    }

    pub fn breath_count(&self) -> u32 {
        self.breath_count
    }

    pub fn average_breath_duration_ms(&self) -> f32 {
        self.average_breath_duration_ms
    }

    pub fn session_start_time(&self) -> MonotonicMillis {
        self.session_start_time
    }

    pub fn breath_start_time(&self) -> MonotonicMillis {
        self.breath_start_time
    }

    pub fn last_breath_time(&self) -> MonotonicMillis {
        self.last_breath_time
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }
}
