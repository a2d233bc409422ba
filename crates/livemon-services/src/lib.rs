//! livemon-services: Audio backend, signal graph, DSP and the live monitor controller

pub mod backend;
pub mod dsp;
pub mod graph;
mod meter;
mod monitor;
mod session;

pub use backend::{
    AudioBackend, CaptureConstraints, CaptureStream, ContextState, CpalBackend, InputDevice,
    ProcessingContext,
};
pub use graph::{AudioParam, GraphError, LiveParams, SignalGraph};
pub use meter::MeterState;
pub use monitor::{LiveMonitor, MonitorState};
