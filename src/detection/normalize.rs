use crate::detection::constants::NORMALIZE_EPSILON;
use crate::detection::types::CalibrationBounds;

/// Maps pressure deltas to `[-1, 1]` using an envelope that grows to fit the
/// largest inhale and exhale seen so far.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    bounds: CalibrationBounds,
}

impl Normalizer {
    pub fn new() -> Self {
        Normalizer::default()
    }

    pub fn bounds(&self) -> CalibrationBounds {
        self.bounds
    }

    pub fn observe(&mut self, delta: f32) -> f32 {
        // NaN fails both comparisons and leaves the envelope alone
        if delta < self.bounds.min {
            self.bounds.min = delta;
        }
        if delta > self.bounds.max {
            self.bounds.max = delta;
        }

        let normalized = if delta < 0.0 && self.bounds.min < -NORMALIZE_EPSILON {
            delta / -self.bounds.min
        } else if delta > 0.0 && self.bounds.max > NORMALIZE_EPSILON {
            delta / self.bounds.max
        } else {
            0.0
        };

        normalized.clamp(-1.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.bounds = CalibrationBounds::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn uses_default_envelope_until_exceeded() {
        let mut normalizer = Normalizer::new();
        assert_eq!(normalizer.observe(5.0), 0.5);
        assert_eq!(normalizer.observe(-2.5), -0.25);
        assert_eq!(normalizer.observe(0.0), 0.0);
    }

    #[test]
    fn envelope_expands_to_extremes() {
        let mut normalizer = Normalizer::new();
        assert_eq!(normalizer.observe(-40.0), -1.0);
        assert_eq!(normalizer.bounds().min, -40.0);
        assert_eq!(normalizer.observe(-10.0), -0.25);

        assert_eq!(normalizer.observe(20.0), 1.0);
        assert_eq!(normalizer.observe(5.0), 0.25);
        assert_eq!(normalizer.bounds().max, 20.0);
    }

    #[test]
    fn reset_restores_initial_envelope() {
        let mut normalizer = Normalizer::new();
        normalizer.observe(-40.0);
        normalizer.observe(40.0);
        normalizer.reset();
        assert_eq!(normalizer.bounds(), CalibrationBounds::default());
        assert_eq!(normalizer.observe(5.0), 0.5);
    }

    #[test]
    fn nan_maps_to_zero_and_keeps_bounds() {
        let mut normalizer = Normalizer::new();
        assert_eq!(normalizer.observe(f32::NAN), 0.0);
        assert_eq!(normalizer.bounds(), CalibrationBounds::default());
    }

    proptest! {
        #[test]
        fn output_stays_in_unit_range(deltas in prop::collection::vec(-1.0e6f32..1.0e6f32, 1..200)) {
            let mut normalizer = Normalizer::new();
            for delta in deltas {
                let value = normalizer.observe(delta);
                prop_assert!((-1.0..=1.0).contains(&value));
            }
        }

        #[test]
        fn bounds_only_grow(deltas in prop::collection::vec(-500.0f32..500.0f32, 1..200)) {
            let mut normalizer = Normalizer::new();
            let mut previous = normalizer.bounds();
            for delta in deltas {
                normalizer.observe(delta);
                let bounds = normalizer.bounds();
                prop_assert!(bounds.min <= previous.min);
                prop_assert!(bounds.max >= previous.max);
                prop_assert!(bounds.min <= 0.0 && bounds.max >= 0.0);
                previous = bounds;
            }
        }
    }
}
