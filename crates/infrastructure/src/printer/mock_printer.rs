use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use domain::error::TransportError;
use domain::printer::{PrinterTransport, TextStyle};
use domain::settings::PrinterSettings;

/// Recording transport for tests.
///
/// Clones share state, so a test can keep a handle while the coordinator
/// owns the boxed original.
#[derive(Clone, Default)]
pub struct MockPrinter {
    connected: Arc<AtomicBool>,
    pub lines: Arc<Mutex<Vec<String>>>,
    pub connects: Arc<AtomicUsize>,
    pub cuts: Arc<AtomicUsize>,
    pub fail_connect: Arc<AtomicBool>,
    pub emit_delay: Duration,
}

impl MockPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_emit_delay(mut self, delay: Duration) -> Self {
        self.emit_delay = delay;
        self
    }

    pub fn is_device_open(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrinterTransport for MockPrinter {
    async fn connect(&mut self, _settings: &PrinterSettings) -> Result<(), TransportError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed(
                "mock connect failure".to_string(),
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn emit(&mut self, text: &str, _style: TextStyle) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if !self.emit_delay.is_zero() {
            tokio::time::sleep(self.emit_delay).await;
        }
        self.lines.lock().await.push(text.to_string());
        Ok(())
    }

    async fn cut(&mut self) -> Result<(), TransportError> {
        self.cuts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
