use serde::{Deserialize, Serialize};

use crate::detection::constants::{
    DEFAULT_EXHALE_THRESHOLD, DEFAULT_INHALE_THRESHOLD, INITIAL_MAX_DELTA, INITIAL_MIN_DELTA,
    MonotonicMillis,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BreathState {
    #[default]
    Idle,
    Inhale,
    Exhale,
    Hold,
}

impl std::fmt::Display for BreathState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            BreathState::Idle => "Idle",
            BreathState::Inhale => "Inhale",
            BreathState::Exhale => "Exhale",
            BreathState::Hold => "Hold",
        };

        write!(f, "{}", result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GestureEvent {
    #[default]
    None,
    NextMode,
    PrevMode,
    ResetSession,
}

impl GestureEvent {
    pub fn is_none(&self) -> bool {
        matches!(self, GestureEvent::None)
    }
}

impl std::fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            GestureEvent::None => "None",
            GestureEvent::NextMode => "Next mode",
            GestureEvent::PrevMode => "Previous mode",
            GestureEvent::ResetSession => "Reset session",
        };

        write!(f, "{}", result)
    }
}

/// One reading from the pressure sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Pressure relative to the calibrated baseline, in Pa. Negative while inhaling.
    pub pressure_delta: f32,
    pub timestamp: MonotonicMillis,
}

impl Sample {
    pub fn new(pressure_delta: f32, timestamp: MonotonicMillis) -> Self {
        Sample { pressure_delta, timestamp }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub inhale: f32,
    pub exhale: f32,
}

impl Thresholds {
    pub fn new(inhale: f32, exhale: f32) -> Self {
        Thresholds { inhale, exhale }
    }

    /// The detector assumes `inhale < 0 < exhale`; anything else is a misconfiguration.
    pub fn is_valid(&self) -> bool {
        self.inhale.is_finite() && self.exhale.is_finite() && self.inhale < 0.0 && self.exhale > 0.0
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            inhale: DEFAULT_INHALE_THRESHOLD,
            exhale: DEFAULT_EXHALE_THRESHOLD,
        }
    }
}

impl std::fmt::Display for Thresholds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inhale {:.1} Pa, exhale {:.1} Pa", self.inhale, self.exhale)
    }
}

/// Observed pressure envelope. `min <= 0 <= max` holds at all times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationBounds {
    pub min: f32,
    pub max: f32,
}

impl Default for CalibrationBounds {
    fn default() -> Self {
        CalibrationBounds {
            min: INITIAL_MIN_DELTA,
            max: INITIAL_MAX_DELTA,
        }
    }
}
