use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Local, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{error, info, warn};

use domain::counter::Counter;
use domain::event::{Mode, Notice, UiEvent};
use domain::printer::PrinterTransport;
use domain::settings::{AutoRunConfig, PrinterSettings};

use crate::receipt::{self, Receipt, ReceiptKind};

/// Intents issued by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ManualAdd,
    ResetCounter,
    StartAutoRun { max_count: u32, interval_secs: f64 },
    StopAutoRun,
    PrintNow,
    TestPrint,
    SetMode(Mode),
    UpdatePrinterSettings(PrinterSettings),
}

enum Message {
    Command(Command),
    AutoTick { value: u32, max: u32 },
    AutoDone,
    AutoFailed(String),
    AutoCleanup,
    Presence(bool),
}

/// The coordinator task is no longer running.
#[derive(Debug, Clone, Copy, Error)]
#[error("coordinator is no longer running")]
pub struct CoordinatorClosed;

/// Clonable entry point for sending intents to the coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Message>,
}

impl CoordinatorHandle {
    pub async fn send(&self, command: Command) -> Result<(), CoordinatorClosed> {
        self.tx
            .send(Message::Command(command))
            .await
            .map_err(|_| CoordinatorClosed)
    }

    /// Deliver one presence scan result. Called by the presence monitor on
    /// every scan; the coordinator publishes transitions only.
    pub async fn report_presence(&self, connected: bool) -> Result<(), CoordinatorClosed> {
        self.tx
            .send(Message::Presence(connected))
            .await
            .map_err(|_| CoordinatorClosed)
    }
}

struct AutoRun {
    running: Arc<AtomicBool>,
    max: u32,
}

/// Owner of all dashboard state: the counter, the active auto run, the last
/// known device presence, and the printer handle behind the print lock.
///
/// Every mutation arrives as a message on one channel, so state is touched
/// from exactly one task. Print jobs are the only work that leaves this
/// task, and they take the transport with them inside an owned lock guard.
pub struct Coordinator {
    counter: Counter,
    mode: Mode,
    auto: Option<AutoRun>,
    device_present: Option<bool>,
    settings: Arc<RwLock<PrinterSettings>>,
    gate: Arc<Mutex<Box<dyn PrinterTransport>>>,
    msg_tx: mpsc::Sender<Message>,
    msg_rx: mpsc::Receiver<Message>,
    events: mpsc::UnboundedSender<UiEvent>,
}

impl Coordinator {
    pub fn new(
        settings: Arc<RwLock<PrinterSettings>>,
        transport: Box<dyn PrinterTransport>,
    ) -> (Self, CoordinatorHandle, mpsc::UnboundedReceiver<UiEvent>) {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (events, events_rx) = mpsc::unbounded_channel();
        let handle = CoordinatorHandle { tx: msg_tx.clone() };
        let coordinator = Self {
            counter: Counter::default(),
            mode: Mode::Manual,
            auto: None,
            device_present: None,
            settings,
            gate: Arc::new(Mutex::new(transport)),
            msg_tx,
            msg_rx,
            events,
        };
        (coordinator, handle, events_rx)
    }

    pub async fn run(mut self) {
        info!("🎛️ Coordinator started");
        while let Some(message) = self.msg_rx.recv().await {
            self.handle_message(message).await;
        }
        info!("Coordinator channel closed, stopping");
    }

    async fn handle_message(&mut self, message: Message) {
        match message {
            Message::Command(command) => self.handle_command(command).await,
            Message::AutoTick { value, max } => {
                self.counter.set(u64::from(value));
                self.publish(UiEvent::CounterChanged {
                    value: self.counter.value(),
                });
                self.publish(UiEvent::AutoProgress {
                    current: value,
                    max,
                });
            }
            Message::AutoDone => {
                // The run is time-bounded, not print-success-bounded: a busy
                // or failed print still resets the counter and ends the run.
                self.spawn_print(ReceiptKind::Count).await;
                let max = self.auto.as_ref().map(|run| run.max).unwrap_or(0);
                self.counter.reset();
                self.publish(UiEvent::CounterChanged { value: 0 });
                self.publish(UiEvent::AutoProgress { current: 0, max });
            }
            Message::AutoFailed(reason) => {
                error!("auto worker failed: {reason}");
                self.publish(UiEvent::Notice(Notice::error(format!(
                    "Terjadi error pada proses otomatis: {reason}"
                ))));
            }
            Message::AutoCleanup => {
                self.auto = None;
                self.publish(UiEvent::AutoFinished);
            }
            Message::Presence(connected) => self.handle_presence(connected),
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::ManualAdd => {
                let value = self.counter.increment();
                self.publish(UiEvent::CounterChanged { value });
            }
            Command::ResetCounter => {
                self.counter.reset();
                self.publish(UiEvent::CounterChanged { value: 0 });
            }
            Command::SetMode(mode) => {
                if self.mode != mode {
                    self.mode = mode;
                    self.publish(UiEvent::ModeChanged(mode));
                }
            }
            Command::StartAutoRun {
                max_count,
                interval_secs,
            } => self.start_auto_run(max_count, interval_secs),
            Command::StopAutoRun => {
                if let Some(run) = &self.auto {
                    info!("stop requested, worker exits at its next tick boundary");
                    run.running.store(false, Ordering::SeqCst);
                }
            }
            Command::PrintNow => self.spawn_print(ReceiptKind::Count).await,
            Command::TestPrint => self.spawn_print(ReceiptKind::Test).await,
            Command::UpdatePrinterSettings(new_settings) => {
                *self.settings.write().await = new_settings;
                info!(
                    "printer settings updated: {:#06x}:{:#06x} interface {}",
                    new_settings.vendor_id, new_settings.product_id, new_settings.interface
                );
                // Invalidate any open handle so the next job reconnects with
                // the new identity. Close errors are irrelevant here.
                let gate = self.gate.clone();
                tokio::spawn(async move {
                    let mut transport = gate.lock().await;
                    let _ = transport.close().await;
                });
            }
        }
    }

    fn start_auto_run(&mut self, max_count: u32, interval_secs: f64) {
        if self.auto.is_some() {
            // The front end disables the control; reject re-entry anyway.
            warn!("auto run already active, ignoring start request");
            return;
        }
        let config = AutoRunConfig::clamped(max_count, interval_secs);
        self.counter.reset();
        self.publish(UiEvent::CounterChanged { value: 0 });
        self.publish(UiEvent::AutoStarted {
            max: config.max_count,
        });

        let running = Arc::new(AtomicBool::new(true));
        let print_scheduled = Arc::new(AtomicBool::new(false));
        let worker = tokio::spawn(auto_worker(
            config,
            running.clone(),
            print_scheduled.clone(),
            self.msg_tx.clone(),
        ));

        // Surface a worker panic as an auto error, then run the same cleanup
        // path as normal completion. Worker failure is never fatal.
        let tx = self.msg_tx.clone();
        let flag = running.clone();
        tokio::spawn(async move {
            if let Err(join_error) = worker.await {
                if join_error.is_panic() {
                    flag.store(false, Ordering::SeqCst);
                    let _ = tx.send(Message::AutoFailed(join_error.to_string())).await;
                    let _ = tx.send(Message::AutoCleanup).await;
                }
            }
        });

        info!(
            max = config.max_count,
            interval = ?config.interval,
            "auto run started"
        );
        self.auto = Some(AutoRun {
            running,
            max: config.max_count,
        });
    }

    /// Try to start a print job. The print lock is try-acquired: a held lock
    /// means another job is in flight, which is reported and not queued.
    async fn spawn_print(&mut self, kind: ReceiptKind) {
        match self.gate.clone().try_lock_owned() {
            Err(_) => {
                info!("print rejected, another job is in flight");
                self.publish(UiEvent::Notice(Notice::info(
                    "Proses cetak sedang berjalan. Mohon tunggu.",
                )));
            }
            Ok(transport) => {
                let receipt = self.build_receipt(kind);
                let settings = *self.settings.read().await;
                let events = self.events.clone();
                tokio::spawn(run_print_job(transport, settings, receipt, kind, events));
            }
        }
    }

    fn build_receipt(&self, kind: ReceiptKind) -> Receipt {
        let timestamp = receipt::format_timestamp(Local::now());
        match kind {
            ReceiptKind::Count => {
                receipt::count_receipt(self.counter.value(), &timestamp, Utc::now().timestamp())
            }
            ReceiptKind::Test => receipt::test_receipt(&timestamp),
        }
    }

    fn handle_presence(&mut self, connected: bool) {
        let changed = self.device_present != Some(connected);
        self.device_present = Some(connected);
        if !changed {
            return;
        }
        self.publish(UiEvent::DeviceStatus { connected });
        if !connected {
            info!("🔌 device disconnected, discarding any open printer handle");
            let gate = self.gate.clone();
            tokio::spawn(async move {
                let mut transport = gate.lock().await;
                let _ = transport.close().await;
            });
        }
    }

    fn publish(&self, event: UiEvent) {
        // The rendering side may be gone during shutdown; drops are fine then.
        let _ = self.events.send(event);
    }
}

/// One concurrent counting task per active run.
///
/// Observes the stop flag only at iteration boundaries (the in-flight sleep
/// always completes), and schedules the completion print exactly once whether
/// the loop finished naturally or was stopped.
async fn auto_worker(
    config: AutoRunConfig,
    running: Arc<AtomicBool>,
    print_scheduled: Arc<AtomicBool>,
    tx: mpsc::Sender<Message>,
) {
    let mut i = 0u32;
    while running.load(Ordering::SeqCst) && i < config.max_count {
        i += 1;
        let tick = Message::AutoTick {
            value: i,
            max: config.max_count,
        };
        if tx.send(tick).await.is_err() {
            return; // coordinator gone, nothing left to publish to
        }
        tokio::time::sleep(config.interval).await;
    }
    // A user stop and natural completion can race here; the swap keeps the
    // completion print single-shot per run.
    if !print_scheduled.swap(true, Ordering::SeqCst) {
        let _ = tx.send(Message::AutoDone).await;
    }
    running.store(false, Ordering::SeqCst);
    let _ = tx.send(Message::AutoCleanup).await;
}

/// Runs one exclusive print job. The owned guard is the print lock: dropping
/// it on any exit path releases the printer for the next job.
async fn run_print_job(
    mut transport: OwnedMutexGuard<Box<dyn PrinterTransport>>,
    settings: PrinterSettings,
    receipt: Receipt,
    kind: ReceiptKind,
    events: mpsc::UnboundedSender<UiEvent>,
) {
    if !transport.is_connected() {
        if let Err(err) = transport.connect(&settings).await {
            warn!("printer connection failed: {err}");
            let _ = events.send(UiEvent::Notice(Notice::error(format!(
                "Gagal terhubung ke printer: {err}"
            ))));
            return;
        }
    }

    for line in receipt.lines() {
        if let Err(err) = transport.emit(&line.text, line.style).await {
            error!("print failed: {err}");
            let _ = events.send(UiEvent::Notice(Notice::error(format!(
                "Gagal mencetak: {err}"
            ))));
            return;
        }
    }

    // Cut failures are cosmetic
    let _ = transport.cut().await;

    info!("✅ print job finished");
    let _ = events.send(UiEvent::Notice(Notice::success(kind.success_message())));
}
