use log::{info, warn};

use crate::detection::constants::{
    CALIBRATION_THRESHOLD_RATIO, DEBOUNCE_MS, HOLD_MENU_MS, MonotonicMillis,
};
use crate::detection::types::{BreathState, Thresholds};

/// Learns thresholds from a few deep breaths. The user holds their breath to
/// accept the proposal.
#[derive(Debug, Clone, Default)]
pub struct ThresholdCalibrator {
    // None until the first sample of a run
    extremes: Option<(f32, f32)>,
    last_commit_time: Option<MonotonicMillis>,
}

impl ThresholdCalibrator {
    pub fn new() -> Self {
        ThresholdCalibrator::default()
    }

    pub fn is_active(&self) -> bool {
        self.extremes.is_some()
    }

    pub fn observe(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }

        self.extremes = match self.extremes {
            None => Some((delta, delta)),
            Some((min, max)) => Some((min.min(delta), max.max(delta))),
        };
    }

    pub fn extremes(&self) -> Option<(f32, f32)> {
        self.extremes
    }

    pub fn proposed(&self) -> Option<Thresholds> {
        self.extremes.map(|(min, max)| {
            Thresholds::new(min * CALIBRATION_THRESHOLD_RATIO, max * CALIBRATION_THRESHOLD_RATIO)
        })
    }

    /// Returns the thresholds to save once the user has held their breath long enough.
    pub fn poll(
        &mut self,
        state: BreathState,
        breath_start_time: MonotonicMillis,
        now: MonotonicMillis,
    ) -> Option<Thresholds> {
        if state != BreathState::Hold || now.saturating_sub(breath_start_time) <= HOLD_MENU_MS {
            return None;
        }

        if let Some(last) = self.last_commit_time {
            if now.saturating_sub(last) <= DEBOUNCE_MS {
                return None;
            }
        }

        let proposed = self.proposed()?;
        if !proposed.is_valid() {
            warn!("Not saving calibration, observed range is one-sided: {}", proposed);
            // wait for the next hold before complaining again
            self.last_commit_time = Some(now);
            return None;
        }

        info!("Calibration accepted: {}", proposed);
        self.last_commit_time = Some(now);
        self.extremes = None;
        Some(proposed)
    }

    pub fn reset(&mut self) {
        self.extremes = None;
    }
}
