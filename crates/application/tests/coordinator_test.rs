use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};

use application::coordinator::{Command, Coordinator, CoordinatorHandle};
use domain::event::{NoticeLevel, UiEvent};
use domain::settings::PrinterSettings;
use infrastructure::printer::MockPrinter;

fn spawn_coordinator(
    mock: MockPrinter,
) -> (
    CoordinatorHandle,
    UnboundedReceiver<UiEvent>,
    Arc<RwLock<PrinterSettings>>,
) {
    let settings = Arc::new(RwLock::new(PrinterSettings::default()));
    let (coordinator, handle, events) = Coordinator::new(settings.clone(), Box::new(mock));
    tokio::spawn(coordinator.run());
    (handle, events, settings)
}

/// Drain events until the predicate fires, with a hard cap so a broken
/// coordinator fails the test instead of hanging it.
async fn collect_until(
    events: &mut UnboundedReceiver<UiEvent>,
    mut done: impl FnMut(&UiEvent) -> bool,
) -> Vec<UiEvent> {
    let mut collected = Vec::new();
    let result = timeout(Duration::from_secs(5), async {
        while let Some(event) = events.recv().await {
            let stop = done(&event);
            collected.push(event);
            if stop {
                break;
            }
        }
    })
    .await;
    assert!(
        result.is_ok(),
        "timed out waiting for events, got {collected:?}"
    );
    collected
}

fn counter_values(events: &[UiEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|event| match event {
            UiEvent::CounterChanged { value } => Some(*value),
            _ => None,
        })
        .collect()
}

fn count_finished(events: &[UiEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, UiEvent::AutoFinished))
        .count()
}

#[tokio::test]
async fn test_manual_add_and_reset_sequence() {
    let (handle, mut events, _) = spawn_coordinator(MockPrinter::new());

    for _ in 0..3 {
        handle.send(Command::ManualAdd).await.unwrap();
    }
    handle.send(Command::ResetCounter).await.unwrap();
    handle.send(Command::ManualAdd).await.unwrap();

    let mut seen = 0;
    let collected = collect_until(&mut events, |event| {
        if matches!(event, UiEvent::CounterChanged { .. }) {
            seen += 1;
        }
        seen == 5
    })
    .await;

    assert_eq!(counter_values(&collected), vec![1, 2, 3, 0, 1]);
}

#[tokio::test]
async fn test_auto_run_counts_prints_once_and_resets() {
    let mock = MockPrinter::new();
    let lines = mock.lines.clone();
    let (handle, mut events, _) = spawn_coordinator(mock);

    handle
        .send(Command::StartAutoRun {
            max_count: 5,
            interval_secs: 0.1,
        })
        .await
        .unwrap();

    let mut finished = false;
    let mut printed = false;
    let collected = collect_until(&mut events, |event| {
        match event {
            UiEvent::AutoFinished => finished = true,
            UiEvent::Notice(notice) if notice.level == NoticeLevel::Success => printed = true,
            _ => {}
        }
        finished && printed
    })
    .await;

    // Strictly increasing ticks framed by the start reset and the post-print reset
    assert_eq!(counter_values(&collected), vec![0, 1, 2, 3, 4, 5, 0]);
    assert!(
        collected
            .iter()
            .any(|event| matches!(event, UiEvent::AutoStarted { max: 5 }))
    );
    assert_eq!(count_finished(&collected), 1);

    // Exactly one receipt, carrying the final count
    let printed_lines = lines.lock().await;
    assert_eq!(
        printed_lines
            .iter()
            .filter(|line| line.contains("LAPORAN HITUNGAN"))
            .count(),
        1
    );
    assert!(
        printed_lines
            .iter()
            .any(|line| line == "Hasil Hitungan : 5")
    );
}

#[tokio::test]
async fn test_start_is_rejected_while_run_active() {
    let mock = MockPrinter::new();
    let (handle, mut events, _) = spawn_coordinator(mock);

    handle
        .send(Command::StartAutoRun {
            max_count: 3,
            interval_secs: 0.1,
        })
        .await
        .unwrap();
    handle
        .send(Command::StartAutoRun {
            max_count: 3,
            interval_secs: 0.1,
        })
        .await
        .unwrap();

    let mut finished = false;
    let mut printed = false;
    let collected = collect_until(&mut events, |event| {
        match event {
            UiEvent::AutoFinished => finished = true,
            UiEvent::Notice(notice) if notice.level == NoticeLevel::Success => printed = true,
            _ => {}
        }
        finished && printed
    })
    .await;

    let starts = collected
        .iter()
        .filter(|event| matches!(event, UiEvent::AutoStarted { .. }))
        .count();
    assert_eq!(starts, 1);
    assert_eq!(counter_values(&collected), vec![0, 1, 2, 3, 0]);
}

#[tokio::test]
async fn test_second_print_reports_busy_and_does_not_block() {
    let mock = MockPrinter::new().with_emit_delay(Duration::from_millis(50));
    let lines = mock.lines.clone();
    let (handle, mut events, _) = spawn_coordinator(mock);

    handle.send(Command::PrintNow).await.unwrap();
    sleep(Duration::from_millis(60)).await;
    handle.send(Command::PrintNow).await.unwrap();

    // The busy notice lands while the first job is still mid-receipt
    let collected = collect_until(&mut events, |event| {
        matches!(event, UiEvent::Notice(notice) if notice.level == NoticeLevel::Info)
    })
    .await;
    assert!(
        !collected
            .iter()
            .any(|event| matches!(event, UiEvent::Notice(n) if n.level == NoticeLevel::Success))
    );

    // The in-flight job completes unaffected, exactly once
    collect_until(&mut events, |event| {
        matches!(event, UiEvent::Notice(notice) if notice.level == NoticeLevel::Success)
    })
    .await;
    let printed_lines = lines.lock().await;
    assert_eq!(
        printed_lines
            .iter()
            .filter(|line| line.contains("LAPORAN HITUNGAN"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_stop_ends_run_early_with_single_cleanup_and_print() {
    let mock = MockPrinter::new();
    let lines = mock.lines.clone();
    let (handle, mut events, _) = spawn_coordinator(mock);

    handle
        .send(Command::StartAutoRun {
            max_count: 50,
            interval_secs: 0.1,
        })
        .await
        .unwrap();
    sleep(Duration::from_millis(250)).await;
    handle.send(Command::StopAutoRun).await.unwrap();

    let mut finished = false;
    let mut printed = false;
    let collected = collect_until(&mut events, |event| {
        match event {
            UiEvent::AutoFinished => finished = true,
            UiEvent::Notice(notice) if notice.level == NoticeLevel::Success => printed = true,
            _ => {}
        }
        finished && printed
    })
    .await;

    let ticks: Vec<u64> = counter_values(&collected)
        .into_iter()
        .filter(|value| *value > 0)
        .collect();
    assert!(!ticks.is_empty());
    assert!(ticks.len() < 50, "worker kept counting after stop: {ticks:?}");
    assert_eq!(count_finished(&collected), 1);
    assert_eq!(
        lines
            .lock()
            .await
            .iter()
            .filter(|line| line.contains("LAPORAN HITUNGAN"))
            .count(),
        1
    );

    // Settle and make sure neither the cleanup nor the print fires again
    sleep(Duration::from_millis(300)).await;
    let mut late = Vec::new();
    while let Ok(event) = events.try_recv() {
        late.push(event);
    }
    assert_eq!(count_finished(&late), 0);
    assert!(
        !late
            .iter()
            .any(|event| matches!(event, UiEvent::Notice(n) if n.level == NoticeLevel::Success))
    );
}

#[tokio::test]
async fn test_connection_failure_reports_and_releases_lock() {
    let mock = MockPrinter::new();
    mock.fail_connect.store(true, Ordering::SeqCst);
    let (handle, mut events, _) = spawn_coordinator(mock);

    handle.send(Command::PrintNow).await.unwrap();
    collect_until(&mut events, |event| {
        matches!(event, UiEvent::Notice(notice) if notice.level == NoticeLevel::Error)
    })
    .await;

    // The lock was released on the failure path: the next attempt retries
    // the connection instead of reporting a job in flight
    handle.send(Command::PrintNow).await.unwrap();
    let collected = collect_until(&mut events, |event| {
        matches!(event, UiEvent::Notice(notice) if notice.level == NoticeLevel::Error)
    })
    .await;
    assert!(
        !collected
            .iter()
            .any(|event| matches!(event, UiEvent::Notice(n) if n.level == NoticeLevel::Info))
    );
}

#[tokio::test]
async fn test_disconnect_forces_reconnect_on_next_print() {
    let mock = MockPrinter::new();
    let connects = mock.connects.clone();
    let open_check = mock.clone();
    let (handle, mut events, _) = spawn_coordinator(mock);

    handle.send(Command::PrintNow).await.unwrap();
    collect_until(&mut events, |event| {
        matches!(event, UiEvent::Notice(notice) if notice.level == NoticeLevel::Success)
    })
    .await;
    assert_eq!(connects.load(Ordering::SeqCst), 1);

    // Presence drops: the coordinator publishes the transition and discards
    // the stale handle
    handle.report_presence(false).await.unwrap();
    collect_until(&mut events, |event| {
        matches!(event, UiEvent::DeviceStatus { connected: false })
    })
    .await;
    sleep(Duration::from_millis(50)).await;
    assert!(!open_check.is_device_open());

    handle.send(Command::PrintNow).await.unwrap();
    collect_until(&mut events, |event| {
        matches!(event, UiEvent::Notice(notice) if notice.level == NoticeLevel::Success)
    })
    .await;
    assert_eq!(connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_settings_change_invalidates_open_handle() {
    let mock = MockPrinter::new();
    let connects = mock.connects.clone();
    let open_check = mock.clone();
    let (handle, mut events, settings) = spawn_coordinator(mock);

    handle.send(Command::PrintNow).await.unwrap();
    collect_until(&mut events, |event| {
        matches!(event, UiEvent::Notice(notice) if notice.level == NoticeLevel::Success)
    })
    .await;
    assert_eq!(connects.load(Ordering::SeqCst), 1);

    let new_settings = PrinterSettings {
        vendor_id: 0x1234,
        product_id: 0x5678,
        interface: 1,
    };
    handle
        .send(Command::UpdatePrinterSettings(new_settings))
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;

    assert!(!open_check.is_device_open());
    assert_eq!(*settings.read().await, new_settings);

    // The next job reconnects with the new identity
    handle.send(Command::PrintNow).await.unwrap();
    collect_until(&mut events, |event| {
        matches!(event, UiEvent::Notice(notice) if notice.level == NoticeLevel::Success)
    })
    .await;
    assert_eq!(connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_test_print_emits_diagnostic_receipt() {
    let mock = MockPrinter::new();
    let lines = mock.lines.clone();
    let (handle, mut events, _) = spawn_coordinator(mock);

    handle.send(Command::TestPrint).await.unwrap();
    collect_until(&mut events, |event| {
        matches!(event, UiEvent::Notice(notice) if notice.level == NoticeLevel::Success)
    })
    .await;

    let printed_lines = lines.lock().await;
    assert!(printed_lines.iter().any(|line| line == "TEST PRINT"));
    assert!(printed_lines.iter().any(|line| line == "Status : OK"));
    assert!(
        !printed_lines
            .iter()
            .any(|line| line.contains("Hasil Hitungan"))
    );
}
