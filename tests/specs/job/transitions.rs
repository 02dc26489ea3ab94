//! S2: the transition graph rejects invalid moves with the allowed targets
//! listed, and `force` is the only way around it.

use printernizer_core::job::{JobCreate, JobStatus};
use printernizer_core::{PrinterId, SupervisorError};

use crate::prelude::*;

fn manual_job(name: &str) -> JobCreate {
    JobCreate {
        printer_id: PrinterId::new(PRINTER_ID),
        printer_type: "bambu_lab".into(),
        job_name: name.into(),
        filename: Some(name.into()),
        status: JobStatus::Pending,
        started_at: None,
        is_business: false,
        customer_info: None,
    }
}

#[tokio::test]
async fn completed_to_running_is_rejected_and_leaves_the_row_unchanged() {
    let h = Harness::new();
    let jobs = h.supervisor.jobs();
    let job = jobs.create(manual_job("cube.3mf")).await.unwrap().into_inner();
    jobs.update_status(&job.id, JobStatus::Completed, false, None).await.unwrap();
    let before = h.jobs_repo.get(&job.id).await.unwrap().unwrap();

    let err = jobs
        .update_status(&job.id, JobStatus::Running, false, None)
        .await
        .unwrap_err();
    let SupervisorError::InvalidTransition { from, to, allowed } = err else {
        panic!("expected InvalidTransition");
    };
    assert_eq!((from.as_str(), to.as_str()), ("completed", "running"));
    assert_eq!(allowed, vec!["failed".to_string()]);

    let after = h.jobs_repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(after.status, before.status);
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(after.notes, before.notes);
}

#[tokio::test]
async fn the_same_move_succeeds_with_force_and_records_a_note() {
    let h = Harness::new();
    let jobs = h.supervisor.jobs();
    let job = jobs.create(manual_job("cube.3mf")).await.unwrap().into_inner();
    jobs.update_status(&job.id, JobStatus::Completed, false, None).await.unwrap();

    let updated = jobs
        .update_status(&job.id, JobStatus::Running, true, Some("mistaken completion"))
        .await
        .unwrap();
    assert_eq!(updated.status, JobStatus::Running);
    let notes = updated.notes.unwrap();
    assert!(
        notes.contains("Status changed: completed → running: mistaken completion"),
        "{notes}"
    );
}

#[tokio::test]
async fn repeating_a_transition_is_idempotent() {
    let h = Harness::new();
    let jobs = h.supervisor.jobs();
    let job = jobs.create(manual_job("cube.3mf")).await.unwrap().into_inner();

    let first = jobs
        .update_status(&job.id, JobStatus::Completed, false, Some("done"))
        .await
        .unwrap();
    h.clock.advance_ms(10_000);
    let second = jobs
        .update_status(&job.id, JobStatus::Completed, false, Some("done"))
        .await
        .unwrap();

    assert_eq!(second.ended_at, first.ended_at);
    assert_eq!(second.notes, first.notes);
    assert_eq!(second.updated_at, first.updated_at);
}

#[tokio::test]
async fn rare_recovery_edges_exist_between_the_terminal_states() {
    let h = Harness::new();
    let jobs = h.supervisor.jobs();

    let job = jobs.create(manual_job("a.3mf")).await.unwrap().into_inner();
    jobs.update_status(&job.id, JobStatus::Failed, false, None).await.unwrap();
    // failed -> completed: a retry that turned out to have succeeded.
    let recovered = jobs.update_status(&job.id, JobStatus::Completed, false, None).await.unwrap();
    assert_eq!(recovered.status, JobStatus::Completed);

    // completed -> failed: correcting a mistaken success.
    let corrected = jobs.update_status(&job.id, JobStatus::Failed, false, None).await.unwrap();
    assert_eq!(corrected.status, JobStatus::Failed);

    // cancelled is fully terminal.
    let other = jobs.create(manual_job("b.3mf")).await.unwrap().into_inner();
    jobs.update_status(&other.id, JobStatus::Cancelled, false, None).await.unwrap();
    for target in [JobStatus::Running, JobStatus::Completed, JobStatus::Failed] {
        let err = jobs.update_status(&other.id, target, false, None).await.unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidTransition { .. }));
    }
}
