/**
 * Monotonic milliseconds, supplied by the host on every tick.
 */
pub type MonotonicMillis = u64;

/**
 * Default pressure delta (Pa) below which a sample counts as inhaling.
 * Inhale pulls the pressure below the baseline, so this is negative.
 */
pub const DEFAULT_INHALE_THRESHOLD: f32 = -5.0;

/**
 * Default pressure delta (Pa) above which a sample counts as exhaling.
 */
pub const DEFAULT_EXHALE_THRESHOLD: f32 = 5.0;

/**
 * How long (milliseconds) since the last transition before a stable signal becomes a hold.
 */
pub const HOLD_TIMEOUT_MS: MonotonicMillis = 3000;

/**
 * Maximum absolute pressure delta (Pa) that still counts as "stable" for a hold.
 */
pub const HOLD_STABILITY_PA: f32 = 2.0;

/**
 * How long (milliseconds) an inhale or exhale must last to count as a long breath gesture.
 */
pub const LONG_BREATH_MS: MonotonicMillis = 1500;

/**
 * How long (milliseconds) a hold must last to trigger the reset session gesture.
 * The calibrator uses the same duration to commit its thresholds.
 */
pub const HOLD_MENU_MS: MonotonicMillis = 5000;

/**
 * Minimum quiet period (milliseconds) between any two gestures.
 */
pub const DEBOUNCE_MS: MonotonicMillis = 1000;

/**
 * Window (milliseconds) after which the puff counter is cleared.
 */
pub const PUFF_WINDOW_MS: MonotonicMillis = 1000;

/**
 * The initial normalization envelope (Pa), restored by a calibration reset.
 */
pub const INITIAL_MIN_DELTA: f32 = -10.0;
pub const INITIAL_MAX_DELTA: f32 = 10.0;

/**
 * Bounds closer to zero than this (Pa) are too small to divide by.
 */
pub const NORMALIZE_EPSILON: f32 = 0.1;

/**
 * Fraction of the observed extremes that the calibrator proposes as thresholds.
 */
pub const CALIBRATION_THRESHOLD_RATIO: f32 = 0.7;
