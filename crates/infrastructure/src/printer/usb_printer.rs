use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusb::{ConfigDescriptor, DeviceHandle, Direction, GlobalContext, TransferType};
use tracing::info;

use domain::error::TransportError;
use domain::printer::{Alignment, PrinterTransport, TextStyle};
use domain::settings::PrinterSettings;

/// ESC/POS transport over a claimed USB interface.
///
/// The handle is opened by vendor/product id and bound to the settings it
/// was opened with; a failed payload write drops the handle so the next job
/// reconnects from scratch. libusb calls are blocking and run off the
/// async workers.
pub struct UsbPrinter {
    handle: Option<Arc<DeviceHandle<GlobalContext>>>,
    endpoint: u8,
    timeout: Duration,
}

impl UsbPrinter {
    pub fn new() -> Self {
        Self {
            handle: None,
            endpoint: 0,
            timeout: Duration::from_secs(5),
        }
    }

    async fn write(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let Some(handle) = self.handle.clone() else {
            return Err(TransportError::NotConnected);
        };
        let endpoint = self.endpoint;
        let timeout = self.timeout;
        let result =
            tokio::task::spawn_blocking(move || handle.write_bulk(endpoint, &bytes, timeout))
                .await;
        match result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => {
                // A failed write means the handle is stale; drop it so the
                // next job reconnects from scratch.
                self.handle = None;
                Err(TransportError::WriteFailed(err.to_string()))
            }
            Err(join_err) => Err(TransportError::WriteFailed(join_err.to_string())),
        }
    }
}

impl Default for UsbPrinter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrinterTransport for UsbPrinter {
    async fn connect(&mut self, settings: &PrinterSettings) -> Result<(), TransportError> {
        if self.handle.is_some() {
            return Ok(());
        }
        let settings = *settings;
        let opened = tokio::task::spawn_blocking(move || open_device(&settings))
            .await
            .map_err(|err| TransportError::ConnectionFailed(err.to_string()))?;
        let (handle, endpoint) = opened?;
        info!(
            "🖨️ printer opened: {:#06x}:{:#06x} interface {} endpoint {:#04x}",
            settings.vendor_id, settings.product_id, settings.interface, endpoint
        );
        self.handle = Some(Arc::new(handle));
        self.endpoint = endpoint;
        // Reset the printer state machine (ESC @)
        self.write(vec![0x1B, 0x40]).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(handle) = self.handle.take() {
            // The claimed interface is released when the last clone of the
            // handle drops; an in-flight write keeps it alive until done.
            drop(handle);
            info!("printer handle closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    async fn emit(&mut self, text: &str, style: TextStyle) -> Result<(), TransportError> {
        if self.handle.is_none() {
            return Err(TransportError::NotConnected);
        }
        // Styling is cosmetic; a rejected prefix must not abort the line
        let _ = self.write(style_bytes(style)).await;
        let mut payload = text.as_bytes().to_vec();
        payload.push(b'\n');
        self.write(payload).await
    }

    async fn cut(&mut self) -> Result<(), TransportError> {
        // Feed to the cut position, then partial cut (GS V 66 0)
        self.write(vec![0x1B, 0x64, 0x03, 0x1D, 0x56, 66, 0]).await
    }
}

fn style_bytes(style: TextStyle) -> Vec<u8> {
    let align = match style.align {
        Alignment::Left => 0u8,
        Alignment::Center => 1,
        Alignment::Right => 2,
    };
    let size = if style.double_size { 0x11 } else { 0x00 };
    vec![
        0x1B, 0x61, align,                 // ESC a: alignment
        0x1B, 0x45, style.emphasis as u8,  // ESC E: emphasis
        0x1D, 0x21, size,                  // GS !: character size
    ]
}

fn open_device(
    settings: &PrinterSettings,
) -> Result<(DeviceHandle<GlobalContext>, u8), TransportError> {
    let devices =
        rusb::devices().map_err(|err| TransportError::ConnectionFailed(err.to_string()))?;
    for device in devices.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(descriptor) => descriptor,
            Err(_) => continue,
        };
        if descriptor.vendor_id() != settings.vendor_id
            || descriptor.product_id() != settings.product_id
        {
            continue;
        }
        let handle = device
            .open()
            .map_err(|err| TransportError::ConnectionFailed(err.to_string()))?;
        let config = device
            .active_config_descriptor()
            .map_err(|err| TransportError::ConnectionFailed(err.to_string()))?;
        let endpoint = bulk_out_endpoint(&config, settings.interface).ok_or_else(|| {
            TransportError::ConnectionFailed(format!(
                "no bulk-out endpoint on interface {}",
                settings.interface
            ))
        })?;
        // Not supported on every platform; claiming still works without it
        let _ = handle.set_auto_detach_kernel_driver(true);
        handle
            .claim_interface(settings.interface)
            .map_err(|err| TransportError::ConnectionFailed(err.to_string()))?;
        return Ok((handle, endpoint));
    }
    Err(TransportError::ConnectionFailed(format!(
        "device {:#06x}:{:#06x} not found",
        settings.vendor_id, settings.product_id
    )))
}

fn bulk_out_endpoint(config: &ConfigDescriptor, interface: u8) -> Option<u8> {
    config
        .interfaces()
        .filter(|candidate| candidate.number() == interface)
        .flat_map(|candidate| candidate.descriptors())
        .flat_map(|descriptor| descriptor.endpoint_descriptors())
        .find(|endpoint| {
            endpoint.direction() == Direction::Out
                && endpoint.transfer_type() == TransferType::Bulk
        })
        .map(|endpoint| endpoint.address())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_bytes_plain() {
        let bytes = style_bytes(TextStyle::default());
        assert_eq!(bytes, vec![0x1B, 0x61, 0, 0x1B, 0x45, 0, 0x1D, 0x21, 0]);
    }

    #[test]
    fn test_style_bytes_title() {
        let bytes = style_bytes(TextStyle::title());
        assert_eq!(
            bytes,
            vec![0x1B, 0x61, 1, 0x1B, 0x45, 1, 0x1D, 0x21, 0x11]
        );
    }
}
