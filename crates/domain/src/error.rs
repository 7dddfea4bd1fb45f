use thiserror::Error;

/// Failures of the printer transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Not connected")]
    NotConnected,
}

/// Failures at the configuration boundary
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Vendor ID must be a hex value such as 0x0fe6, got '{0}'")]
    InvalidVendorId(String),
    #[error("Product ID must be a hex value such as 0x811e, got '{0}'")]
    InvalidProductId(String),
    #[error("Interface must be an integer, got '{0}'")]
    InvalidInterface(String),
    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}
