use async_trait::async_trait;

use domain::probe::DeviceProbe;
use domain::settings::PrinterSettings;

/// Presence scan over the host's USB device list.
///
/// Any enumeration failure reads as "not present"; the monitor retries on
/// its next period anyway.
pub struct UsbProbe;

#[async_trait]
impl DeviceProbe for UsbProbe {
    async fn is_present(&self, settings: &PrinterSettings) -> bool {
        let (vendor_id, product_id) = (settings.vendor_id, settings.product_id);
        tokio::task::spawn_blocking(move || scan(vendor_id, product_id))
            .await
            .unwrap_or(false)
    }
}

fn scan(vendor_id: u16, product_id: u16) -> bool {
    let Ok(devices) = rusb::devices() else {
        return false;
    };
    devices.iter().any(|device| {
        device
            .device_descriptor()
            .map(|descriptor| {
                descriptor.vendor_id() == vendor_id && descriptor.product_id() == product_id
            })
            .unwrap_or(false)
    })
}
