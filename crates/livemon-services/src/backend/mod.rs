//! Platform audio backend: processing context and microphone capture

mod cpal_backend;
#[cfg(test)]
pub(crate) mod mock;

pub use cpal_backend::{CpalBackend, CpalCapture, CpalContext, InputDevice};

use std::fmt;

use crossbeam_channel::Receiver;
use livemon_core::{MonitorConfig, StartError};

use crate::graph::SignalGraph;

/// Lifecycle state of a processing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspended => f.write_str("suspended"),
            Self::Running => f.write_str("running"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// What to capture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Input device name; `None` picks the host default
    pub device: Option<String>,
}

impl CaptureConstraints {
    pub fn from_config(config: &MonitorConfig) -> Self {
        let device = match config.input_device.as_str() {
            "default" => None,
            name => Some(name.to_string()),
        };
        Self { device }
    }
}

/// Entry point into the host audio system
pub trait AudioBackend: Send + Sync + 'static {
    type Context: ProcessingContext;

    /// Create a fresh processing context bound to the output device
    fn create_context(&self) -> Result<Self::Context, StartError>;
}

/// Live audio-graph execution environment bound to the output device
pub trait ProcessingContext {
    type Capture: CaptureStream;

    fn state(&self) -> ContextState;

    fn resume(&mut self) -> Result<(), StartError>;

    /// Open the microphone. May block until the host grants or refuses access.
    fn request_microphone(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<Self::Capture, StartError>;

    /// Graph whose destination feeds the output device
    fn graph(&self) -> &SignalGraph;

    /// Release the output device and all processing. Idempotent.
    fn close(&mut self);
}

/// A running microphone capture
pub trait CaptureStream {
    /// Mono sample blocks; handed out once to the graph source
    fn take_feed(&mut self) -> Option<Receiver<Vec<f32>>>;

    /// Stop every capture track and release the hardware. Idempotent.
    fn stop_tracks(&mut self);

    fn live_tracks(&self) -> usize;
}
