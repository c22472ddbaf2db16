/**
 * Most recent gestures kept for the session summary. Older ones are only counted.
 */
pub const MAX_SUMMARY_GESTURES: usize = 256;
