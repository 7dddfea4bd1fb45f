use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::coordinator::{Command, Coordinator, CoordinatorHandle};
use application::presence::PresenceMonitor;
use domain::event::{Mode, NoticeLevel, UiEvent};
use domain::printer::PrinterTransport;
use domain::settings::AutoRunConfig;
use infrastructure::config_store::{ConfigStore, DashboardConfig};
use infrastructure::printer::{FilePrinter, UsbPrinter};
use infrastructure::probe::UsbProbe;

#[derive(Parser, Debug)]
#[command(author, version, about = "PrinterPro counting dashboard", long_about = None)]
struct Args {
    /// Path to the configuration document
    #[arg(long, default_value = "printer_config.json")]
    config: String,

    /// Print to a plain-text file instead of the USB device
    #[arg(long)]
    file_printer: Option<String>,

    /// Presence scan period in seconds
    #[arg(long, default_value_t = 3)]
    scan_period: u64,
}

const HELP: &str = "\
commands:
  add                             add one to the counter
  reset                           reset the counter to zero
  start [max] [interval]          start an auto run (defaults from config)
  stop                            stop the active auto run
  print                           print the counting receipt
  test                            print the diagnostic receipt
  mode <manual|auto>              switch the dashboard mode
  set <vendor> <product> <iface>  validate and save printer settings
  status                          show the loaded configuration
  help                            show this help
  quit                            exit";

async fn run() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("🖨️ PrinterPro Dashboard starting...");

    // 1. Load Configuration
    let store = ConfigStore::new(&args.config);
    let config = store.load().await;
    info!(
        "✅ Loaded configuration: {}:{} interface {}",
        config.vendor_id, config.product_id, config.interface
    );

    // 2. Wire the coordinator around the chosen transport
    let settings = Arc::new(RwLock::new(config.printer_settings()));
    let transport: Box<dyn PrinterTransport> = match &args.file_printer {
        Some(path) => Box::new(FilePrinter::new(path)),
        None => Box::new(UsbPrinter::new()),
    };
    let (coordinator, handle, mut events) = Coordinator::new(settings.clone(), transport);
    tokio::spawn(coordinator.run());

    // 3. Presence monitor, cancelled only at process exit
    let shutdown = CancellationToken::new();
    let monitor = PresenceMonitor::new(
        Box::new(UsbProbe),
        settings,
        handle.clone(),
        Duration::from_secs(args.scan_period.max(1)),
        shutdown.clone(),
    );
    tokio::spawn(monitor.run());

    // 4. Rendering side: coordinator events become terminal lines
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            render(event);
        }
    });

    repl(store, config, handle).await?;

    shutdown.cancel();
    info!("👋 Bye");
    Ok(())
}

fn render(event: UiEvent) {
    match event {
        UiEvent::CounterChanged { value } => println!("  counter: {value}"),
        UiEvent::AutoStarted { max } => println!("  counting to {max}..."),
        UiEvent::AutoProgress { current, max } if current > 0 => {
            println!("  counting: {current}/{max}")
        }
        UiEvent::AutoProgress { .. } => {}
        UiEvent::AutoFinished => println!("  auto run complete"),
        UiEvent::DeviceStatus { connected } => {
            println!(
                "  device: {}",
                if connected { "connected" } else { "disconnected" }
            )
        }
        UiEvent::ModeChanged(mode) => println!("  mode: {mode:?}"),
        UiEvent::Notice(notice) => {
            let tag = match notice.level {
                NoticeLevel::Success => "ok",
                NoticeLevel::Info => "info",
                NoticeLevel::Error => "error",
            };
            println!("  [{tag}] {}", notice.message);
        }
    }
}

async fn repl(
    store: ConfigStore,
    mut config: DashboardConfig,
    handle: CoordinatorHandle,
) -> Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !dispatch(&store, &mut config, &handle, line.trim()).await? {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn dispatch(
    store: &ConfigStore,
    config: &mut DashboardConfig,
    handle: &CoordinatorHandle,
    line: &str,
) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };
    match command {
        "add" => handle.send(Command::ManualAdd).await?,
        "reset" => handle.send(Command::ResetCounter).await?,
        "start" => {
            // Unparseable input falls back to the saved defaults; the
            // coordinator clamps the range.
            let max_count: u32 = parts
                .next()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(config.auto_max_count);
            let interval_secs: f64 = parts
                .next()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(config.auto_interval);
            // Remember the clamped values as the defaults for the next run
            let clamped = AutoRunConfig::clamped(max_count, interval_secs);
            config.auto_max_count = clamped.max_count;
            config.auto_interval = clamped.interval.as_secs_f64();
            handle
                .send(Command::StartAutoRun {
                    max_count,
                    interval_secs,
                })
                .await?;
        }
        "stop" => handle.send(Command::StopAutoRun).await?,
        "print" => handle.send(Command::PrintNow).await?,
        "test" => handle.send(Command::TestPrint).await?,
        "mode" => match parts.next() {
            Some("manual") => handle.send(Command::SetMode(Mode::Manual)).await?,
            Some("auto") => handle.send(Command::SetMode(Mode::Auto)).await?,
            _ => println!("usage: mode <manual|auto>"),
        },
        "set" => {
            let (Some(vendor), Some(product), Some(interface)) =
                (parts.next(), parts.next(), parts.next())
            else {
                println!("usage: set <vendor> <product> <iface>");
                return Ok(true);
            };
            let mut updated = config.clone();
            match updated.apply_settings_input(vendor, product, interface) {
                Err(err) => println!("  [error] {err}"),
                Ok(()) => match store.save(&updated).await {
                    Err(err) => println!("  [error] {err}"),
                    Ok(()) => {
                        *config = updated;
                        handle
                            .send(Command::UpdatePrinterSettings(config.printer_settings()))
                            .await?;
                        println!("  [ok] configuration saved");
                    }
                },
            }
        }
        "status" => {
            println!(
                "  printer {}:{} interface {} | auto defaults: {} ticks @ {}s | config file {:?}",
                config.vendor_id,
                config.product_id,
                config.interface,
                config.auto_max_count,
                config.auto_interval,
                store.path()
            );
        }
        "help" => println!("{HELP}"),
        "quit" | "exit" => return Ok(false),
        other => println!("unknown command '{other}' (try 'help')"),
    }
    Ok(true)
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("fatal: {err}");
        std::process::exit(1);
    }
}
