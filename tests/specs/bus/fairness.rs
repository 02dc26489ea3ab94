//! Property 7: a handler that takes time T delays only itself — other
//! subscribers keep receiving events that arrived after T started, and
//! per-subscriber delivery order is preserved throughout.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use printernizer_core::{Event, PrinterId};
use printernizer_engine::EventBus;
use tokio::sync::Notify;

fn status(n: u32) -> Event {
    Event::PrinterStatus {
        printer_id: PrinterId::new(format!("p-{n}")),
        phase: printernizer_core::status::Phase::Online,
        timestamp: Utc::now(),
    }
}

fn printer_of(event: &Event) -> String {
    match event {
        Event::PrinterStatus { printer_id, .. } => printer_id.to_string(),
        _ => String::new(),
    }
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if check() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn a_stalled_subscriber_never_blocks_the_others() {
    let bus = EventBus::new();

    let gate = Arc::new(Notify::new());
    let stalled_seen = Arc::new(Mutex::new(Vec::new()));
    {
        let gate = Arc::clone(&gate);
        let stalled_seen = Arc::clone(&stalled_seen);
        bus.subscribe(
            "stalled",
            Arc::new(move |event| {
                let gate = Arc::clone(&gate);
                let stalled_seen = Arc::clone(&stalled_seen);
                Box::pin(async move {
                    gate.notified().await;
                    stalled_seen.lock().push(printer_of(&event));
                })
            }),
        );
    }

    let prompt_seen = Arc::new(Mutex::new(Vec::new()));
    {
        let prompt_seen = Arc::clone(&prompt_seen);
        bus.subscribe(
            "prompt",
            Arc::new(move |event| {
                let prompt_seen = Arc::clone(&prompt_seen);
                Box::pin(async move {
                    prompt_seen.lock().push(printer_of(&event));
                })
            }),
        );
    }

    for n in 1..=5 {
        bus.emit(status(n));
    }

    // The prompt subscriber drains all five while the stalled one is still
    // inside its first handler call.
    wait_until(|| prompt_seen.lock().len() == 5).await;
    assert_eq!(*prompt_seen.lock(), vec!["p-1", "p-2", "p-3", "p-4", "p-5"]);
    assert!(stalled_seen.lock().is_empty());

    // Releasing the gate one call at a time preserves the stalled
    // subscriber's own delivery order.
    for expected in 1..=5 {
        gate.notify_one();
        wait_until(|| stalled_seen.lock().len() == expected).await;
    }
    assert_eq!(*stalled_seen.lock(), vec!["p-1", "p-2", "p-3", "p-4", "p-5"]);

    bus.shutdown(std::time::Duration::from_secs(1)).await;
}
