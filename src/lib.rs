use std::env;
use std::path::{Path, PathBuf};
use futures::StreamExt;
use futures::channel::mpsc::channel;
use log::{info, warn};
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;

use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::detection::types::Thresholds;
use crate::error::{AppRunError, ReplayError};
use crate::pipeline::breath_pipeline::breath_pipeline;
use crate::pipeline::types::{PipelineEvent, PipelineOptions, SessionSummary};
use crate::sensor::replay::replay_task;

pub mod config;
pub mod detection;
pub mod error;
pub mod pipeline;
pub mod sensor;

pub fn init_logging(level: log::LevelFilter) {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        match fern::log_file(&log_file) {
            Ok(file) => dispatch = dispatch.chain(file),
            Err(err) => eprintln!("Failed to open LOG_FILE {}: {}", log_file, err),
        }
    }

    if let Err(err) = dispatch.apply() {
        eprintln!("Failed to initialize logger: {}", err);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Recorded samples; stdin when `None`.
    pub input: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub inhale_threshold: Option<f32>,
    pub exhale_threshold: Option<f32>,
    pub calibrate: bool,
    pub realtime: bool,
}

async fn open_input(input: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, ReplayError> {
    match input {
        Some(path) => {
            info!("Replaying samples from {}", path.to_string_lossy());
            let file = tokio::fs::File::open(path).await?;
            Ok(Box::new(BufReader::new(file)))
        },
        None => {
            info!("Reading samples from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        },
    }
}

/// Replays recorded pressure samples through a breath session and reports what it saw.
pub async fn run(options: RunOptions) -> Result<SessionSummary, AppRunError> {
    let config_io = ConfigIO::open(options.config.as_deref())?;
    let mut locker = config_io.locker()?;
    let _config_guard = locker.lock()?;

    let mut config = config_io.read().await?;
    let thresholds = Thresholds::new(
        options.inhale_threshold.unwrap_or(config.thresholds.inhale),
        options.exhale_threshold.unwrap_or(config.thresholds.exhale),
    );
    // a broken stored value is fine as long as the command line replaces it
    Config { thresholds }.validate()?;

    let input = open_input(options.input.as_deref()).await?;

    let cancel = CancellationToken::new();
    let (event_sender, mut event_receiver) = channel::<PipelineEvent>(128);
    let pipeline_options = PipelineOptions { calibrate: options.calibrate };
    let (sample_sender, _command_sender, pipeline_handle) =
        breath_pipeline(cancel.clone(), thresholds, pipeline_options, event_sender);
    let replay_handle = replay_task(cancel.clone(), input, sample_sender, options.realtime);

    while let Some(event) = event_receiver.next().await {
        match event {
            PipelineEvent::StateChange { from, to, at, normalized } => {
                info!("{:>8} ms  {} -> {} ({:+.2})", at, from, to, normalized);
            },
            PipelineEvent::BreathCompleted { count, duration_ms, average_ms } => {
                info!("Breath #{} took {} ms (average {:.0} ms)", count, duration_ms, average_ms);
            },
            PipelineEvent::Gesture { gesture, at } => {
                info!("{:>8} ms  gesture: {}", at, gesture);
            },
            PipelineEvent::CalibrationSaved(thresholds) => {
                config.thresholds = thresholds;
                if let Err(err) = config_io.save(config).await {
                    warn!("Failed to save calibration: {}", err);
                }
            },
        }
    }

    // the event stream only ends once the pipeline has finished
    let summary = pipeline_handle.await.expect("Failed to join breath pipeline task");
    replay_handle.await.expect("Failed to join replay task")?;

    Ok(summary)
}
