use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use domain::error::TransportError;
use domain::printer::{PrinterTransport, TextStyle};
use domain::settings::PrinterSettings;

/// Renders receipts as plain text into a file.
///
/// Useful on machines without the device; styling is dropped, which is the
/// documented degraded mode for cosmetic failures.
pub struct FilePrinter {
    path: PathBuf,
    connected: bool,
}

impl FilePrinter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connected: false,
        }
    }

    // Open, write, close per line so output lands immediately even when the
    // path is a network share.
    async fn append(&self, bytes: &[u8]) -> Result<(), TransportError> {
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
        {
            Ok(mut file) => {
                if let Err(err) = file.write_all(bytes).await {
                    error!("failed to write to printer file: {err}");
                    return Err(TransportError::WriteFailed(err.to_string()));
                }
                if let Err(err) = file.flush().await {
                    error!("failed to flush printer file: {err}");
                    return Err(TransportError::WriteFailed(err.to_string()));
                }
                Ok(())
            }
            Err(err) => {
                error!("failed to open printer file {:?}: {err}", self.path);
                Err(TransportError::ConnectionFailed(err.to_string()))
            }
        }
    }
}

#[async_trait]
impl PrinterTransport for FilePrinter {
    async fn connect(&mut self, _settings: &PrinterSettings) -> Result<(), TransportError> {
        info!("printing to file {:?}", self.path);
        self.connected = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn emit(&mut self, text: &str, _style: TextStyle) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let mut line = text.as_bytes().to_vec();
        line.push(b'\n');
        self.append(&line).await
    }

    async fn cut(&mut self) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.append(b"\n").await
    }
}
