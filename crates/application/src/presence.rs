use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use domain::probe::DeviceProbe;
use domain::settings::PrinterSettings;

use crate::coordinator::CoordinatorHandle;

/// Recurring out-of-band presence check for the configured device.
///
/// Delivers every scan result to the coordinator, which reacts to
/// transitions. Runs for the lifetime of the process; the cancellation
/// token exists for orderly shutdown only.
pub struct PresenceMonitor {
    probe: Box<dyn DeviceProbe>,
    settings: Arc<RwLock<PrinterSettings>>,
    coordinator: CoordinatorHandle,
    period: Duration,
    cancel: CancellationToken,
}

impl PresenceMonitor {
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(3);

    pub fn new(
        probe: Box<dyn DeviceProbe>,
        settings: Arc<RwLock<PrinterSettings>>,
        coordinator: CoordinatorHandle,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            probe,
            settings,
            coordinator,
            period,
            cancel,
        }
    }

    pub async fn run(self) {
        info!(period = ?self.period, "📡 Presence monitor started");
        let mut timer = tokio::time::interval(self.period);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Presence monitor stopped");
                    break;
                }
                _ = timer.tick() => {
                    let settings = *self.settings.read().await;
                    let present = self.probe.is_present(&settings).await;
                    debug!(present, "presence scan");
                    if self.coordinator.report_presence(present).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
