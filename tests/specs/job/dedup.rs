//! S3: a restart replaying the same `(printer_id, filename, started_at)`
//! tuple never double-inserts, and the duplicate create emits nothing.

use std::sync::Arc;

use printernizer_core::job::JobStatus;
use printernizer_drivers::FakePrinterDriver;
use printernizer_storage::JobFilter;

use crate::prelude::*;

#[tokio::test]
async fn restart_replaying_the_same_print_does_not_double_insert() {
    let first = Harness::new();
    first
        .add_bambu(FakePrinterDriver::new(vec![printing_update("x.gcode", 40, 1_700_000_000)]))
        .await;
    first.observe().await;
    assert_eq!(first.jobs_repo.count(&JobFilter::default()).await.unwrap(), 1);

    // Restart: a new supervisor over the surviving repository sees the same
    // telemetry again.
    let restarted = Harness::over_repo(Arc::clone(&first.jobs_repo));
    restarted
        .add_bambu(FakePrinterDriver::new(vec![printing_update("x.gcode", 41, 1_700_000_000)]))
        .await;
    restarted.observe().await;

    let jobs = restarted.jobs_repo.list(&JobFilter::default(), 10, 0).await.unwrap();
    assert_eq!(jobs.len(), 1);
    // The replay resumed tracking the existing row rather than minting one.
    assert_eq!(jobs[0].status, JobStatus::Printing);
    assert_eq!(jobs[0].progress, 41);

    // No job_created fired on the restarted supervisor's bus.
    let types = restarted.event_types().await;
    assert!(!types.contains(&"job_created".to_string()), "{types:?}");
}

#[tokio::test]
async fn distinct_start_times_are_distinct_jobs() {
    let h = Harness::new();
    let driver = FakePrinterDriver::new(vec![
        printing_update("x.gcode", 50, 1_700_000_000),
        finished_update(),
        printing_update("x.gcode", 1, 1_700_009_999),
    ]);
    h.add_bambu(driver).await;

    h.observe().await;
    h.observe().await; // completes the first print
    h.observe().await; // the same file starts again later

    let jobs = h.jobs_repo.list(&JobFilter::default(), 10, 0).await.unwrap();
    assert_eq!(jobs.len(), 2);
}
