use async_trait::async_trait;

use crate::settings::PrinterSettings;

/// Out-of-band presence check for the configured device.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    /// Whether a device matching `settings` is currently enumerable by the
    /// host. Probe failures read as absent, never as errors.
    async fn is_present(&self, settings: &PrinterSettings) -> bool;
}
