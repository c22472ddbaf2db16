use std::io;
use std::num::ParseFloatError;
use std::num::ParseIntError;
use std::str::Utf8Error;
use thiserror::Error;
use serde_json;

use crate::detection::types::Thresholds;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },

    #[error("Config contains unusable thresholds ({thresholds}); inhale must be negative and exhale positive")]
    InvalidThresholds { thresholds: Thresholds },
}

#[derive(Error, Debug, PartialEq)]
pub enum SampleError {
    #[error("Line {line}: expected \"<timestamp_ms> <delta_pa>\"")]
    Malformed { line: usize },

    #[error("Line {line}: invalid timestamp: {source}")]
    Timestamp { line: usize, source: ParseIntError },

    #[error("Line {line}: invalid pressure delta: {source}")]
    Delta { line: usize, source: ParseFloatError },

    #[error("Line {line}: pressure delta is not a finite number")]
    NonFinite { line: usize },
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read samples: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse samples: {source}")]
    Sample { #[from] source: SampleError },
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Failed to replay samples: {source}")]
    ReplayError { #[from] source: ReplayError },
}
