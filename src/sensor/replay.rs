use futures::SinkExt;
use futures::channel::mpsc::Sender;
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::detection::types::Sample;
use crate::error::{ReplayError, SampleError};
use crate::sensor::constants::MAX_REALTIME_GAP_MS;
use crate::sensor::types::SensorEvent;

/// Parses one recorded line: `<timestamp_ms> <delta_pa>`, separated by whitespace or a comma.
/// Returns `Ok(None)` for blank lines and `#` comments. `line_number` is 1-based.
pub fn parse_sample_line(line: &str, line_number: usize) -> Result<Option<Sample>, SampleError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty());

    let (timestamp, delta) = match (fields.next(), fields.next(), fields.next()) {
        (Some(timestamp), Some(delta), None) => (timestamp, delta),
        _ => return Err(SampleError::Malformed { line: line_number }),
    };

    let timestamp = timestamp
        .parse::<u64>()
        .map_err(|source| SampleError::Timestamp { line: line_number, source })?;
    let delta = delta
        .parse::<f32>()
        .map_err(|source| SampleError::Delta { line: line_number, source })?;

    if !delta.is_finite() {
        return Err(SampleError::NonFinite { line: line_number });
    }

    Ok(Some(Sample::new(delta, timestamp)))
}

/// Reads recorded samples and forwards them, standing in for the pressure sensor.
///
/// With `realtime`, waits for the gap between consecutive timestamps before
/// sending, like a device sampling at that rate. The sender is dropped when the
/// input ends, which closes the stream for the receiver.
pub fn replay_task<R>(
    cancel: CancellationToken,
    reader: R,
    mut sender: Sender<SensorEvent>,
    realtime: bool,
) -> JoinHandle<Result<usize, ReplayError>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    spawn(async move {
        let mut lines = reader.lines();
        let mut line_number = 0;
        let mut sent = 0;
        let mut previous_timestamp: Option<u64> = None;

        'mainloop: loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                break 'mainloop;
            };
            line_number += 1;

            let Some(sample) = parse_sample_line(&line, line_number)? else {
                continue;
            };

            if realtime {
                if let Some(previous) = previous_timestamp {
                    let gap = sample.timestamp.saturating_sub(previous).min(MAX_REALTIME_GAP_MS);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            break 'mainloop;
                        },
                        _ = sleep(Duration::from_millis(gap)) => {},
                    }
                }
            }
            previous_timestamp = Some(sample.timestamp);

            if let Err(err) = sender.send(SensorEvent::Sample(sample)).await {
                warn!("Sample receiver went away: {:?}", err);
                break 'mainloop;
            }
            sent += 1;
        }

        debug!("Replay stopped after {} lines", line_number);
        info!("Replayed {} samples", sent);
        Ok(sent)
    })
}
