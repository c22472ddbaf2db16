use log::info;

use crate::detection::constants::{
    DEBOUNCE_MS, HOLD_MENU_MS, LONG_BREATH_MS, MonotonicMillis, PUFF_WINDOW_MS,
};
use crate::detection::types::{BreathState, GestureEvent};

/// Turns sustained breath states into gestures.
///
/// Every gesture fires at most once per visit to a state: the latch is only
/// re-armed by observing `Idle`. After any gesture, nothing fires (and the latch
/// is not re-armed) for `DEBOUNCE_MS`.
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    last_gesture_time: MonotonicMillis,
    long_breath_triggered: bool,
    // Double puff tracking. The counter is windowed but no gesture reads it yet.
    puff_count: u32,
    last_puff_time: MonotonicMillis,
}

impl GestureRecognizer {
    pub fn new(now: MonotonicMillis) -> Self {
        GestureRecognizer {
            last_gesture_time: now,
            long_breath_triggered: false,
            puff_count: 0,
            last_puff_time: now,
        }
    }

    pub fn recognize(
        &mut self,
        state: BreathState,
        breath_start_time: MonotonicMillis,
        now: MonotonicMillis,
    ) -> GestureEvent {
        if now.saturating_sub(self.last_gesture_time) < DEBOUNCE_MS {
            return GestureEvent::None;
        }

        if now.saturating_sub(self.last_puff_time) > PUFF_WINDOW_MS {
            self.puff_count = 0;
        }

        let breath_duration = now.saturating_sub(breath_start_time);

        let gesture = match state {
            BreathState::Idle => {
                self.long_breath_triggered = false;
                GestureEvent::None
            }
            BreathState::Exhale if breath_duration > LONG_BREATH_MS => GestureEvent::NextMode,
            BreathState::Inhale if breath_duration > LONG_BREATH_MS => GestureEvent::PrevMode,
            BreathState::Hold if breath_duration > HOLD_MENU_MS => GestureEvent::ResetSession,
            BreathState::Exhale | BreathState::Inhale | BreathState::Hold => GestureEvent::None,
        };

        if gesture.is_none() || self.long_breath_triggered {
            return GestureEvent::None;
        }

        self.long_breath_triggered = true;
        self.last_gesture_time = now;
        info!("Gesture: {} ({} for {} ms)", gesture, state, breath_duration);
        gesture
    }

    pub fn last_gesture_time(&self) -> MonotonicMillis {
        self.last_gesture_time
    }

    pub fn long_breath_triggered(&self) -> bool {
        self.long_breath_triggered
    }

    pub fn puff_count(&self) -> u32 {
        self.puff_count
    }

    pub fn last_puff_time(&self) -> MonotonicMillis {
        self.last_puff_time
    }
}
