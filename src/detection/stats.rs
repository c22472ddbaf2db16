use serde::Serialize;

use crate::detection::breath::BreathDetector;
use crate::detection::constants::MonotonicMillis;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub breath_count: u32,
    pub session_duration_secs: u64,
    pub breaths_per_minute: Option<f32>,
    pub average_breath_duration_ms: Option<f32>,
}

impl SessionStats {
    pub fn snapshot(detector: &BreathDetector, now: MonotonicMillis) -> Self {
        let breath_count = detector.breath_count();
        let session_duration_secs = now.saturating_sub(detector.session_start_time()) / 1000;

        let breaths_per_minute = if breath_count > 0 && session_duration_secs > 0 {
            Some(breath_count as f32 * 60.0 / session_duration_secs as f32)
        } else {
            None
        };

        let average_breath_duration_ms = if breath_count > 0 {
            Some(detector.average_breath_duration_ms())
        } else {
            None
        };

        SessionStats {
            breath_count,
            session_duration_secs,
            breaths_per_minute,
            average_breath_duration_ms,
        }
    }
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let minutes = self.session_duration_secs / 60;
        let seconds = self.session_duration_secs % 60;
        write!(f, "{:02}:{:02}, {} breaths", minutes, seconds, self.breath_count)?;

        match self.breaths_per_minute {
            Some(rate) => write!(f, ", {:.1}/min", rate)?,
            None => write!(f, ", --/min")?,
        }

        match self.average_breath_duration_ms {
            Some(average) => write!(f, ", avg {:.1}s", average / 1000.0),
            None => write!(f, ", avg --"),
        }
    }
}
