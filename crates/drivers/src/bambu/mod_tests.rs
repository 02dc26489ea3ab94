// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use printernizer_core::PrinterId;

use super::*;

fn driver() -> BambuDriver {
    BambuDriver::new(PrinterId::new("bambu-1"), "10.0.0.5", "12345678", "01S00C123456789")
}

#[test]
fn cache_path_roots_bare_names_under_cache() {
    assert_eq!(cache_path("benchy.3mf"), "/cache/benchy.3mf");
    assert_eq!(cache_path("/cache/benchy.3mf"), "/cache/benchy.3mf");
}

#[test]
fn topics_are_scoped_to_the_printer_serial() {
    let driver = driver();
    assert_eq!(driver.report_topic(), "device/01S00C123456789/report");
    assert_eq!(driver.request_topic(), "device/01S00C123456789/request");
}

#[tokio::test]
async fn commands_before_connect_fail_fast() {
    let driver = driver();
    assert!(driver.pause().await.is_err());
    assert!(driver.resume().await.is_err());
    assert!(driver.stop().await.is_err());
}

#[tokio::test]
async fn disconnect_on_a_disconnected_driver_is_a_no_op() {
    let driver = driver();
    driver.disconnect().await;
    driver.disconnect().await;
    assert_eq!(driver.get_job().await.unwrap(), None);
}

#[tokio::test]
async fn get_job_without_any_telemetry_yet_is_none() {
    let driver = driver();
    assert_eq!(driver.get_job().await.unwrap(), None);
}

#[tokio::test]
async fn snapshot_returns_none_pending_tcp_camera_support() {
    let driver = driver();
    assert!(driver.has_camera());
    assert_eq!(driver.snapshot().await.unwrap(), None);
}
