//! Error types for livemon

use std::time::Duration;

use thiserror::Error;

use crate::params::ParamKind;

/// Why a start attempt ended without a running session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("Audio context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("Microphone permission denied")]
    PermissionDenied,
    #[error("Microphone unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("{0}")]
    Other(String),
    #[error("Start timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Start cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("Non-finite value for {0}")]
    NotFinite(ParamKind),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
