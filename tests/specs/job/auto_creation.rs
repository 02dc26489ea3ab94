//! S1: a printing Bambu report materializes a job, progress deltas emit
//! `job_update`, and the FINISH report completes it.

use printernizer_core::job::JobStatus;
use printernizer_core::Event;
use printernizer_drivers::FakePrinterDriver;
use printernizer_storage::JobFilter;

use crate::prelude::*;

#[tokio::test]
async fn printing_telemetry_creates_progresses_and_completes_a_job() {
    let h = Harness::new();
    let driver = FakePrinterDriver::new(vec![
        printing_update("calibration_cube.3mf", 12, 1_700_000_000),
        printing_update("calibration_cube.3mf", 22, 1_700_000_000),
        finished_update(),
    ]);
    h.add_bambu(driver).await;

    // Tick 1: gcode_state=PRINTING, subtask_name=calibration_cube.3mf,
    // mc_percent=12, gcode_start_time=1700000000.
    h.observe().await;
    let jobs = h.jobs_repo.list(&JobFilter::default(), 10, 0).await.unwrap();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.job_name, "calibration_cube.3mf");
    assert_eq!(job.status, JobStatus::Printing);
    assert_eq!(job.progress, 12);
    assert_eq!(job.started_at.unwrap().to_rfc3339(), "2023-11-14T22:13:20+00:00");

    // Tick 2: mc_percent=22 emits job_update with the 10-point delta.
    h.clear_events();
    h.observe().await;
    let events = h.events().await;
    let update = events
        .iter()
        .find_map(|e| match e {
            Event::JobUpdate { progress, progress_delta, .. } => Some((*progress, *progress_delta)),
            _ => None,
        })
        .expect("job_update should fire on a >=10 point change");
    assert_eq!(update, (22, 10));

    // Tick 3: FINISH with mc_percent=100 completes the job.
    h.observe().await;
    let jobs = h.jobs_repo.list(&JobFilter::default(), 10, 0).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Completed);
    assert_eq!(jobs[0].progress, 100);
    assert!(jobs[0].ended_at.is_some());
    // started_at survives untouched from the first observation.
    assert_eq!(jobs[0].started_at.unwrap().timestamp(), 1_700_000_000);

    let types = h.event_types().await;
    assert!(types.contains(&"job_created".to_string()));
    assert!(types.contains(&"job_completed".to_string()));
}

#[tokio::test]
async fn job_started_fires_once_when_the_job_enters_printing() {
    let h = Harness::new();
    let driver = FakePrinterDriver::new(vec![
        printing_update("benchy.3mf", 5, 1_700_000_100),
        printing_update("benchy.3mf", 7, 1_700_000_100),
    ]);
    h.add_bambu(driver).await;

    h.observe().await;
    h.observe().await;

    let types = h.event_types().await;
    let started = types.iter().filter(|t| *t == "job_started").count();
    assert_eq!(started, 1);
    // A 2-point change stays under the 10-point job_update threshold.
    assert!(!types.contains(&"job_update".to_string()));
}
