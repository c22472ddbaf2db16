use log::info;

use crate::detection::breath::{BreathDetector, BreathEventInfo};
use crate::detection::constants::MonotonicMillis;
use crate::detection::gesture::GestureRecognizer;
use crate::detection::normalize::Normalizer;
use crate::detection::stats::SessionStats;
use crate::detection::types::{BreathState, CalibrationBounds, GestureEvent, Sample, Thresholds};

/// Everything one tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    pub state: BreathState,
    pub info: BreathEventInfo,
    pub normalized: f32,
    pub gesture: GestureEvent,
}

/// One breath session: the normalizer, the detector and the gesture recognizer.
///
/// Calls must be serialized by the owner; the host supplies the clock.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    normalizer: Normalizer,
    detector: BreathDetector,
    recognizer: GestureRecognizer,
}

impl SessionHandle {
    pub fn init(thresholds: Thresholds, now: MonotonicMillis) -> Self {
        info!("Starting breath session with {}", thresholds);

        SessionHandle {
            normalizer: Normalizer::new(),
            detector: BreathDetector::new(thresholds, now),
            recognizer: GestureRecognizer::new(now),
        }
    }

    pub fn observe_normalized(&mut self, delta: f32) -> f32 {
        self.normalizer.observe(delta)
    }

    pub fn detect(&mut self, delta: f32, now: MonotonicMillis) -> BreathState {
        self.detect_with_info(delta, now).0
    }

    pub fn detect_with_info(&mut self, delta: f32, now: MonotonicMillis) -> (BreathState, BreathEventInfo) {
        self.detector.detect(delta, now)
    }

    pub fn recognize(&mut self, now: MonotonicMillis) -> GestureEvent {
        self.recognizer.recognize(
            self.detector.state(),
            self.detector.breath_start_time(),
            now,
        )
    }

    /// Normalize, detect, then recognize.
    pub fn tick(&mut self, sample: Sample) -> TickOutput {
        let normalized = self.observe_normalized(sample.pressure_delta);
        let (state, info) = self.detect_with_info(sample.pressure_delta, sample.timestamp);
        let gesture = self.recognize(sample.timestamp);

        TickOutput { state, info, normalized, gesture }
    }

    pub fn reset_session(&mut self, now: MonotonicMillis) {
        info!("Session reset");
        self.detector.reset_session(now);
    }

    pub fn reset_calibration(&mut self) {
        info!("Normalization bounds reset");
        self.normalizer.reset();
    }

    pub fn state(&self) -> BreathState {
        self.detector.state()
    }

    pub fn breath_count(&self) -> u32 {
        self.detector.breath_count()
    }

    pub fn average_breath_duration_ms(&self) -> f32 {
        self.detector.average_breath_duration_ms()
    }

    pub fn session_start_time(&self) -> MonotonicMillis {
        self.detector.session_start_time()
    }

    pub fn breath_start_time(&self) -> MonotonicMillis {
        self.detector.breath_start_time()
    }

    pub fn calibration_bounds(&self) -> CalibrationBounds {
        self.normalizer.bounds()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.detector.thresholds()
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        info!("Thresholds set to {}", thresholds);
        self.detector.set_thresholds(thresholds);
    }

    pub fn stats(&self, now: MonotonicMillis) -> SessionStats {
        SessionStats::snapshot(&self.detector, now)
    }
}
