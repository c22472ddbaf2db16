/**
 * Longest pause (milliseconds) honoured between two samples during a realtime replay.
 * Recordings may contain gaps where the device was idle.
 */
pub const MAX_REALTIME_GAP_MS: u64 = 10_000;

/**
 * Capacity of the sample channel between the replay task and the pipeline.
 */
pub const SAMPLE_CHANNEL_CAPACITY: usize = 128;
