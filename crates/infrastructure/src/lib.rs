//! Infrastructure layer - Adapters for the device and the filesystem

pub mod config_store;
pub mod printer;
pub mod probe;

pub use config_store::{ConfigStore, DashboardConfig};
pub use probe::UsbProbe;
