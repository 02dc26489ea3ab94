// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use printernizer_core::job::JobCreate;
use printernizer_core::PrinterId;

fn job(id: &str, printer: &str, filename: &str, started_at: DateTime<Utc>) -> Job {
    let req = JobCreate {
        printer_id: PrinterId::new(printer),
        printer_type: "bambu_lab".into(),
        job_name: filename.into(),
        filename: Some(filename.into()),
        status: JobStatus::Printing,
        started_at: Some(started_at),
        is_business: false,
        customer_info: None,
    };
    Job::from_create(JobId::new(id), req, started_at).unwrap()
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let repo = InMemoryJobRepository::new();
    let now = Utc::now();
    let outcome = repo.create(job("j1", "p1", "a.3mf", now)).await.unwrap();
    assert!(!outcome.is_duplicate());

    let fetched = repo.get(&JobId::new("j1")).await.unwrap().unwrap();
    assert_eq!(fetched.job_name, "a.3mf");
}

#[tokio::test]
async fn duplicate_dedup_key_returns_duplicate_not_error() {
    let repo = InMemoryJobRepository::new();
    let now = Utc::now();
    repo.create(job("j1", "p1", "a.3mf", now)).await.unwrap();
    let outcome = repo.create(job("j2", "p1", "a.3mf", now)).await.unwrap();
    assert!(outcome.is_duplicate());
    assert_eq!(outcome.into_inner().id, JobId::new("j1"));

    // the second insert never actually landed
    assert!(repo.get(&JobId::new("j2")).await.unwrap().is_none());
}

#[tokio::test]
async fn jobs_without_a_dedup_key_never_collide() {
    let repo = InMemoryJobRepository::new();
    let req = JobCreate {
        printer_id: PrinterId::new("p1"),
        printer_type: "bambu_lab".into(),
        job_name: "pending".into(),
        filename: None,
        status: JobStatus::Pending,
        started_at: None,
        is_business: false,
        customer_info: None,
    };
    let now = Utc::now();
    let j1 = Job::from_create(JobId::new("j1"), req.clone(), now).unwrap();
    let j2 = Job::from_create(JobId::new("j2"), req, now).unwrap();

    repo.create(j1).await.unwrap();
    let outcome = repo.create(j2).await.unwrap();
    assert!(!outcome.is_duplicate());
}

#[tokio::test]
async fn list_filters_by_printer_and_status() {
    let repo = InMemoryJobRepository::new();
    let now = Utc::now();
    repo.create(job("j1", "p1", "a.3mf", now)).await.unwrap();
    repo.create(job("j2", "p2", "b.3mf", now)).await.unwrap();

    let filter = JobFilter {
        printer_id: Some(PrinterId::new("p1")),
        ..Default::default()
    };
    let results = repo.list(&filter, 10, 0).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, JobId::new("j1"));
}

#[tokio::test]
async fn update_applies_patch_fields_and_bumps_updated_at() {
    let repo = InMemoryJobRepository::new();
    let now = Utc::now();
    repo.create(job("j1", "p1", "a.3mf", now)).await.unwrap();

    let later = now + chrono::Duration::minutes(1);
    let patch = JobPatch {
        progress: Some(55),
        status: Some(JobStatus::Completed),
        ended_at: Some(Some(later)),
        ..Default::default()
    };
    let updated = repo.update(&JobId::new("j1"), patch, later).await.unwrap();
    assert_eq!(updated.progress, 55);
    assert_eq!(updated.status, JobStatus::Completed);
    assert_eq!(updated.updated_at, later);
}

#[tokio::test]
async fn update_unknown_job_is_not_found() {
    let repo = InMemoryJobRepository::new();
    let err = repo.update(&JobId::new("missing"), JobPatch::default(), Utc::now()).await.unwrap_err();
    assert!(matches!(err, SupervisorError::NotFound(_)));
}

#[tokio::test]
async fn delete_removes_job_and_frees_its_dedup_key() {
    let repo = InMemoryJobRepository::new();
    let now = Utc::now();
    repo.create(job("j1", "p1", "a.3mf", now)).await.unwrap();
    repo.delete(&JobId::new("j1")).await.unwrap();
    assert!(repo.get(&JobId::new("j1")).await.unwrap().is_none());

    // the dedup key is free again
    let outcome = repo.create(job("j2", "p1", "a.3mf", now)).await.unwrap();
    assert!(!outcome.is_duplicate());
}

#[tokio::test]
async fn statistics_tally_terminal_and_active_counts() {
    let repo = InMemoryJobRepository::new();
    let now = Utc::now();
    repo.create(job("j1", "p1", "a.3mf", now)).await.unwrap();
    repo.update(
        &JobId::new("j1"),
        JobPatch {
            status: Some(JobStatus::Completed),
            ..Default::default()
        },
        now,
    )
    .await
    .unwrap();
    repo.create(job("j2", "p1", "b.3mf", now)).await.unwrap();

    let stats = repo.get_statistics().await.unwrap();
    assert_eq!(stats.total_jobs, 2);
    assert_eq!(stats.completed_jobs, 1);
    assert_eq!(stats.active_jobs, 1);
    assert_eq!(stats.success_rate(), 1.0);
}
