//! Status line phrases shown to the user

use std::fmt;

use crate::error::StartError;

/// Human-readable monitor status, updated at every lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    Initializing,
    MicrophoneConnected,
    GainCreated,
    CompressorCreated,
    Active,
    Error(String),
    Stopped,
    StartCancelled,
    /// A cancelled or timed-out start still holds the audio device
    Releasing,
}

impl Status {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<&StartError> for Status {
    fn from(err: &StartError) -> Self {
        match err {
            StartError::Cancelled => Self::StartCancelled,
            other => Self::Error(other.to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::Initializing => f.write_str("Initializing\u{2026}"),
            Self::MicrophoneConnected => f.write_str("Microphone connected"),
            Self::GainCreated => f.write_str("Gain stage created"),
            Self::CompressorCreated => f.write_str("Compressor created"),
            Self::Active => f.write_str("Active"),
            Self::Error(detail) => write!(f, "Error: {}", detail),
            Self::Stopped => f.write_str("Stopped"),
            Self::StartCancelled => f.write_str("Start cancelled"),
            Self::Releasing => f.write_str("Previous start still releasing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_names_failure() {
        let status = Status::from(&StartError::PermissionDenied);
        assert!(status.is_error());
        assert_eq!(status.to_string(), "Error: Microphone permission denied");
    }

    #[test]
    fn test_cancel_is_not_an_error() {
        let status = Status::from(&StartError::Cancelled);
        assert_eq!(status, Status::StartCancelled);
        assert!(!status.is_error());
    }
}
