// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use chrono::Utc;
use printernizer_core::printer::{PrinterEndpoint, PrinterType};
use printernizer_core::{FakeClock, SequentialIdGen};
use printernizer_storage::InMemoryJobRepository;
use yare::parameterized;

use super::*;

struct Fixture {
    repo: Arc<InMemoryJobRepository>,
    service: Arc<JobService<FakeClock, SequentialIdGen>>,
    clock: FakeClock,
    bus: EventBus,
}

fn fixture() -> Fixture {
    let repo = Arc::new(InMemoryJobRepository::new());
    let bus = EventBus::new();
    let clock = FakeClock::at(1_700_000_000_000);
    let service = JobService::new(
        Arc::clone(&repo) as Arc<dyn JobRepository>,
        bus.clone(),
        clock.clone(),
        SequentialIdGen::new("job"),
        true,
    );
    Fixture { repo, service, clock, bus }
}

fn request(name: &str) -> JobCreate {
    JobCreate {
        printer_id: PrinterId::new("p-1"),
        printer_type: "bambu_lab".into(),
        job_name: name.into(),
        filename: Some(name.into()),
        status: JobStatus::Pending,
        started_at: None,
        is_business: false,
        customer_info: None,
    }
}

fn printer() -> Printer {
    Printer::new("p-1", PrinterType::BambuLab, PrinterEndpoint::default())
}

fn printing_update(name: &str, percent: u8, started_epoch: i64) -> StatusUpdate {
    let mut update = StatusUpdate::offline(PrinterId::new("p-1"), Utc::now());
    update.phase = Phase::Printing;
    update.current_job_name = Some(name.into());
    update.progress_percent = Some(percent);
    update.started_at = chrono::DateTime::from_timestamp(started_epoch, 0);
    update
}

#[tokio::test]
async fn create_assigns_identity_and_emits_job_created() {
    let f = fixture();
    let outcome = f.service.create(request("cube.3mf")).await.unwrap();
    let job = outcome.into_inner();
    assert_eq!(job.id, "job-1");
    assert_eq!(job.printer_type, "bambu_lab");
    assert_eq!(job.status, JobStatus::Pending);
    assert!(!job.job_name.is_empty());
}

#[tokio::test]
async fn business_job_without_customer_name_is_rejected() {
    let f = fixture();
    let mut req = request("cube.3mf");
    req.is_business = true;
    let err = f.service.create(req).await.unwrap_err();
    assert!(matches!(err, SupervisorError::Invalid(_)));
}

#[parameterized(
    pending_to_printing = { JobStatus::Pending, JobStatus::Printing, true },
    pending_to_paused = { JobStatus::Pending, JobStatus::Paused, false },
    printing_to_paused = { JobStatus::Printing, JobStatus::Paused, true },
    paused_to_printing = { JobStatus::Paused, JobStatus::Printing, true },
    completed_to_failed = { JobStatus::Completed, JobStatus::Failed, true },
    completed_to_running = { JobStatus::Completed, JobStatus::Running, false },
    failed_to_completed = { JobStatus::Failed, JobStatus::Completed, true },
    cancelled_is_terminal = { JobStatus::Cancelled, JobStatus::Running, false },
)]
fn transition_graph_edges(from: JobStatus, to: JobStatus, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[tokio::test]
async fn invalid_transition_lists_the_allowed_targets() {
    let f = fixture();
    let job = f.service.create(request("cube.3mf")).await.unwrap().into_inner();
    f.service.update_status(&job.id, JobStatus::Completed, false, None).await.unwrap();

    let err = f
        .service
        .update_status(&job.id, JobStatus::Running, false, None)
        .await
        .unwrap_err();
    let SupervisorError::InvalidTransition { from, to, allowed } = err else {
        panic!("expected InvalidTransition");
    };
    assert_eq!(from, "completed");
    assert_eq!(to, "running");
    assert_eq!(allowed, vec!["failed".to_string()]);

    // The row is unchanged.
    let unchanged = f.repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, JobStatus::Completed);
}

#[tokio::test]
async fn forced_transition_bypasses_the_graph_and_adds_a_note() {
    let f = fixture();
    let job = f.service.create(request("cube.3mf")).await.unwrap().into_inner();
    f.service.update_status(&job.id, JobStatus::Completed, false, None).await.unwrap();

    let updated = f
        .service
        .update_status(&job.id, JobStatus::Running, true, Some("operator recovery"))
        .await
        .unwrap();
    assert_eq!(updated.status, JobStatus::Running);
    let notes = updated.notes.unwrap();
    assert!(notes.contains("Status changed: completed → running: operator recovery"), "{notes}");
}

#[tokio::test]
async fn entering_running_sets_started_at_once_and_never_overwrites_it() {
    let f = fixture();
    let job = f.service.create(request("cube.3mf")).await.unwrap().into_inner();

    let first = f.service.update_status(&job.id, JobStatus::Running, false, None).await.unwrap();
    let started = first.started_at.unwrap();

    f.clock.advance_ms(60_000);
    f.service.update_status(&job.id, JobStatus::Paused, false, None).await.unwrap();
    let resumed = f.service.update_status(&job.id, JobStatus::Running, false, None).await.unwrap();
    assert_eq!(resumed.started_at.unwrap(), started);
}

#[tokio::test]
async fn terminal_statuses_set_ended_at_and_actual_duration() {
    let f = fixture();
    let job = f.service.create(request("cube.3mf")).await.unwrap().into_inner();
    f.service.update_status(&job.id, JobStatus::Printing, false, None).await.unwrap();
    f.clock.advance_ms(90_000);

    let done = f.service.update_status(&job.id, JobStatus::Completed, false, None).await.unwrap();
    assert!(done.ended_at.is_some());
    assert_eq!(done.actual_duration_s, Some(90));
}

#[tokio::test]
async fn repeating_a_status_update_is_a_no_op() {
    let f = fixture();
    let job = f.service.create(request("cube.3mf")).await.unwrap().into_inner();
    let first = f
        .service
        .update_status(&job.id, JobStatus::Completed, false, Some("done"))
        .await
        .unwrap();

    f.clock.advance_ms(5_000);
    let second = f
        .service
        .update_status(&job.id, JobStatus::Completed, false, Some("done"))
        .await
        .unwrap();
    assert_eq!(second.ended_at, first.ended_at);
    assert_eq!(second.notes, first.notes);
    assert_eq!(second.updated_at, first.updated_at);
}

#[tokio::test]
async fn progress_is_clamped_not_rejected() {
    let f = fixture();
    let job = f.service.create(request("cube.3mf")).await.unwrap().into_inner();
    assert_eq!(f.service.update_progress(&job.id, 130).await.unwrap().progress, 100);
    assert_eq!(f.service.update_progress(&job.id, -5).await.unwrap().progress, 0);
}

#[tokio::test]
async fn telemetry_auto_creates_a_printing_job_with_the_printer_start_time() {
    let f = fixture();
    let job = f
        .service
        .sync_from_status(&printer(), &printing_update("calibration_cube.3mf", 12, 1_700_000_000))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.job_name, "calibration_cube.3mf");
    assert_eq!(job.status, JobStatus::Printing);
    assert_eq!(job.progress, 12);
    assert_eq!(job.started_at.unwrap().timestamp(), 1_700_000_000);
}

#[tokio::test]
async fn restart_does_not_double_insert_the_same_print() {
    let f = fixture();
    let update = printing_update("x.gcode", 40, 1_700_000_000);
    f.service.sync_from_status(&printer(), &update).await.unwrap();

    // Simulate a supervisor restart: the active-job map is lost, telemetry
    // replays the same (printer, filename, started_at) tuple.
    f.service.active.lock().clear();
    f.service.sync_from_status(&printer(), &update).await.unwrap();

    assert_eq!(f.repo.count(&printernizer_storage::JobFilter::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn finish_telemetry_completes_the_tracked_job() {
    let f = fixture();
    f.service
        .sync_from_status(&printer(), &printing_update("cube.3mf", 95, 1_700_000_000))
        .await
        .unwrap();

    let mut done = StatusUpdate::offline(PrinterId::new("p-1"), Utc::now());
    done.phase = Phase::Online;
    done.progress_percent = Some(100);
    let job = f.service.sync_from_status(&printer(), &done).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job.ended_at.is_some());
}

#[tokio::test]
async fn error_telemetry_fails_the_tracked_job() {
    let f = fixture();
    f.service
        .sync_from_status(&printer(), &printing_update("cube.3mf", 50, 1_700_000_000))
        .await
        .unwrap();

    let mut errored = StatusUpdate::offline(PrinterId::new("p-1"), Utc::now());
    errored.phase = Phase::Error;
    let job = f.service.sync_from_status(&printer(), &errored).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
}

#[tokio::test]
async fn offline_telemetry_keeps_the_tracked_job_open() {
    let f = fixture();
    f.service
        .sync_from_status(&printer(), &printing_update("cube.3mf", 50, 1_700_000_000))
        .await
        .unwrap();

    let offline = StatusUpdate::offline(PrinterId::new("p-1"), Utc::now());
    assert!(f.service.sync_from_status(&printer(), &offline).await.unwrap().is_none());

    // The printer comes back mid-print; the same job resumes tracking.
    let job = f
        .service
        .sync_from_status(&printer(), &printing_update("cube.3mf", 60, 1_700_000_000))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Printing);
    assert_eq!(job.progress, 60);
    assert_eq!(f.repo.count(&printernizer_storage::JobFilter::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn auto_creation_can_be_disabled() {
    let repo = Arc::new(InMemoryJobRepository::new());
    let service = JobService::new(
        Arc::clone(&repo) as Arc<dyn JobRepository>,
        EventBus::new(),
        FakeClock::new(),
        SequentialIdGen::new("job"),
        false,
    );
    let result = service
        .sync_from_status(&printer(), &printing_update("cube.3mf", 10, 1_700_000_000))
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(repo.count(&printernizer_storage::JobFilter::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn bus_is_not_used_for_duplicate_creates() {
    let f = fixture();
    let seen = Arc::new(parking_lot::Mutex::new(0usize));
    {
        let seen = Arc::clone(&seen);
        f.bus.subscribe(
            "counter",
            Arc::new(move |event| {
                let seen = Arc::clone(&seen);
                Box::pin(async move {
                    if matches!(event, Event::JobCreated { .. }) {
                        *seen.lock() += 1;
                    }
                })
            }),
        );
    }

    let mut req = request("cube.3mf");
    req.started_at = chrono::DateTime::from_timestamp(1_700_000_000, 0);
    let first = f.service.create(req.clone()).await.unwrap();
    assert!(!first.is_duplicate());
    let second = f.service.create(req).await.unwrap();
    assert!(second.is_duplicate());

    f.bus.shutdown(std::time::Duration::from_secs(1)).await;
    assert_eq!(*seen.lock(), 1);
}
