//! Task 1 phase-edge semantics: `printer_connected` / `printer_disconnected`
//! fire only on online<->offline edges; `printer_status` fires every pass,
//! and liveness is written back through the printer repository.

use printernizer_core::Event;
use printernizer_drivers::FakePrinterDriver;

use crate::prelude::*;

#[tokio::test]
async fn edges_fire_once_and_status_fires_every_tick() {
    let h = Harness::new();
    let driver = FakePrinterDriver::new(vec![online_update()]);
    h.add_bambu(driver.clone()).await;

    // Two healthy observations: one connected edge, two status events.
    h.observe().await;
    h.observe().await;

    // A failed poll flips the cache offline: one disconnected edge.
    driver.fail_status_next();
    h.observe().await;

    // Recovery: a second connected edge.
    h.observe().await;

    let events = h.events().await;
    let connected = events.iter().filter(|e| matches!(e, Event::PrinterConnected { .. })).count();
    let disconnected = events.iter().filter(|e| matches!(e, Event::PrinterDisconnected { .. })).count();
    let status = events.iter().filter(|e| matches!(e, Event::PrinterStatus { .. })).count();
    assert_eq!(connected, 2);
    assert_eq!(disconnected, 1);
    assert_eq!(status, 4);
}

#[tokio::test]
async fn every_status_event_carries_an_iso_timestamp_payload() {
    let h = Harness::new();
    h.add_bambu(FakePrinterDriver::new(vec![online_update()])).await;
    h.observe().await;

    for event in h.events().await {
        let payload = event.to_payload();
        let timestamp = payload.get("timestamp").and_then(|v| v.as_str()).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok(), "{timestamp}");
    }
}
