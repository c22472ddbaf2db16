use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;
use log::{error, info};
use inhale::{init_logging, run, RunOptions};
use inhale::error::{AppRunError, ConfigError};

/// Turns recorded breath pressure into breath states and gestures.
///
/// Samples are read one per line as "<timestamp_ms> <delta_pa>", where the
/// delta is relative to the resting baseline and negative while inhaling.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// File with recorded samples. Reads stdin when omitted.
    input: Option<PathBuf>,

    /// Config file holding the saved thresholds.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inhale threshold in Pa, overrides the saved value.
    #[arg(long, allow_hyphen_values = true)]
    inhale_threshold: Option<f32>,

    /// Exhale threshold in Pa, overrides the saved value.
    #[arg(long)]
    exhale_threshold: Option<f32>,

    /// Learn new thresholds from the samples; hold your breath for 5 s to save them.
    #[arg(long)]
    calibrate: bool,

    /// Replay with the original timing between samples.
    #[arg(long)]
    realtime: bool,

    /// Print the session summary as JSON.
    #[arg(long)]
    json: bool,

    /// Log every state transition.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    info!(concat!("Inhale ", env!("CARGO_PKG_VERSION")));

    let json = cli.json;
    let options = RunOptions {
        input: cli.input,
        config: cli.config,
        inhale_threshold: cli.inhale_threshold,
        exhale_threshold: cli.exhale_threshold,
        calibrate: cli.calibrate,
        realtime: cli.realtime,
    };

    match run(options).await {
        Ok(summary) if json => match serde_json::to_string_pretty(&summary) {
            Ok(content) => {
                println!("{}", content);
                ExitCode::SUCCESS
            },
            Err(err) => {
                error!("Failed to encode summary: {}", err);
                ExitCode::FAILURE
            },
        },
        Ok(summary) => {
            println!("{}", summary.stats);
            let hidden = summary.gesture_count - summary.gestures.len();
            if hidden > 0 {
                println!("({} earlier gestures not shown)", hidden);
            }
            for (at, gesture) in &summary.gestures {
                println!("{:>8} ms  {}", at, gesture);
            }
            ExitCode::SUCCESS
        },
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            error!("Another instance is already using this config file");
            ExitCode::FAILURE
        },
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        },
    }
}
