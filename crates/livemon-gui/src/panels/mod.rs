//! UI panels

mod meter;
mod params;
mod transport;

pub use meter::MeterPanel;
pub use params::ParamPanel;
pub use transport::{TransportAction, TransportPanel};
