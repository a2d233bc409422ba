//! livemon-core: Domain types for the livemon microphone monitor

pub mod config;
mod error;
mod panel;
pub mod params;
mod status;

pub use config::MonitorConfig;
pub use error::{ConfigError, ParamError, StartError};
pub use panel::{ControlPanel, Controls};
pub use params::{ParamKind, ParamRange, ParamRanges, ParamSet};
pub use status::Status;
