// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job persistence contract (§6) and an in-memory implementation keyed by
//! the `(printer_id, filename, started_at)` dedup index from §3.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use printernizer_core::job::{DedupKey, JobStatus};
use printernizer_core::printer::PrinterId;
use printernizer_core::{Job, JobId, SupervisorError, WriteOutcome};

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub printer_id: Option<PrinterId>,
    pub status: Option<JobStatus>,
    pub is_business: Option<bool>,
}

impl JobFilter {
    fn matches(&self, job: &Job) -> bool {
        self.printer_id.as_ref().map(|p| *p == job.printer_id).unwrap_or(true)
            && self.status.map(|s| s == job.status).unwrap_or(true)
            && self.is_business.map(|b| b == job.is_business).unwrap_or(true)
    }
}

/// Sparse patch applied by `JobRepository::update`. `id`, `created_at`,
/// `printer_id`, and `printer_type` are immutable post-creation (§4.4) and
/// have no setter here.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub ended_at: Option<Option<DateTime<Utc>>>,
    pub estimated_duration_s: Option<Option<u64>>,
    pub actual_duration_s: Option<Option<u64>>,
    pub material_used_g: Option<Option<f64>>,
    pub material_cost: Option<Option<f64>>,
    pub power_cost: Option<Option<f64>>,
    pub is_business: Option<bool>,
    pub customer_info: Option<Option<printernizer_core::job::CustomerInfo>>,
    pub notes: Option<Option<String>>,
}

impl JobPatch {
    fn apply(self, job: &mut Job, now: DateTime<Utc>) {
        if let Some(v) = self.status {
            job.status = v;
        }
        if let Some(v) = self.progress {
            job.progress = v;
        }
        if let Some(v) = self.started_at {
            job.started_at = v;
        }
        if let Some(v) = self.ended_at {
            job.ended_at = v;
        }
        if let Some(v) = self.estimated_duration_s {
            job.estimated_duration_s = v;
        }
        if let Some(v) = self.actual_duration_s {
            job.actual_duration_s = v;
        }
        if let Some(v) = self.material_used_g {
            job.material_used_g = v;
        }
        if let Some(v) = self.material_cost {
            job.material_cost = v;
        }
        if let Some(v) = self.power_cost {
            job.power_cost = v;
        }
        if let Some(v) = self.is_business {
            job.is_business = v;
        }
        if let Some(v) = self.customer_info {
            job.customer_info = v;
        }
        if let Some(v) = self.notes {
            job.notes = v;
        }
        job.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct JobStatistics {
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub cancelled_jobs: usize,
    pub active_jobs: usize,
    pub total_material_used_g: f64,
    pub total_material_cost: f64,
}

impl JobStatistics {
    pub fn success_rate(&self) -> f64 {
        let finished = self.completed_jobs + self.failed_jobs;
        if finished == 0 {
            0.0
        } else {
            self.completed_jobs as f64 / finished as f64
        }
    }
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: Job) -> Result<WriteOutcome<Job>, SupervisorError>;
    async fn get(&self, id: &JobId) -> Result<Option<Job>, SupervisorError>;
    async fn list(&self, filter: &JobFilter, limit: usize, offset: usize) -> Result<Vec<Job>, SupervisorError>;
    async fn count(&self, filter: &JobFilter) -> Result<usize, SupervisorError>;
    async fn update(&self, id: &JobId, patch: JobPatch, now: DateTime<Utc>) -> Result<Job, SupervisorError>;
    async fn delete(&self, id: &JobId) -> Result<(), SupervisorError>;
    async fn get_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        filter: &JobFilter,
    ) -> Result<Vec<Job>, SupervisorError>;
    async fn get_statistics(&self) -> Result<JobStatistics, SupervisorError>;
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    dedup_index: HashMap<DedupKey, JobId>,
}

/// In-memory `JobRepository`, the only backend the core requires (§6
/// treats the relational persistence layer as an external collaborator).
#[derive(Default)]
pub struct InMemoryJobRepository {
    inner: Mutex<Inner>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: Job) -> Result<WriteOutcome<Job>, SupervisorError> {
        let mut inner = self.inner.lock();
        if let Some(key) = job.dedup_key() {
            if let Some(existing_id) = inner.dedup_index.get(&key).cloned() {
                let existing = inner
                    .jobs
                    .get(&existing_id)
                    .cloned()
                    .ok_or_else(|| SupervisorError::Internal("dedup index points at a missing job".into()))?;
                return Ok(WriteOutcome::Duplicate(existing));
            }
            inner.dedup_index.insert(key, job.id.clone());
        }
        inner.jobs.insert(job.id.clone(), job.clone());
        Ok(WriteOutcome::Created(job))
    }

    async fn get(&self, id: &JobId) -> Result<Option<Job>, SupervisorError> {
        Ok(self.inner.lock().jobs.get(id).cloned())
    }

    async fn list(&self, filter: &JobFilter, limit: usize, offset: usize) -> Result<Vec<Job>, SupervisorError> {
        let inner = self.inner.lock();
        let mut matches: Vec<Job> = inner.jobs.values().filter(|j| filter.matches(j)).cloned().collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &JobFilter) -> Result<usize, SupervisorError> {
        Ok(self.inner.lock().jobs.values().filter(|j| filter.matches(j)).count())
    }

    async fn update(&self, id: &JobId, patch: JobPatch, now: DateTime<Utc>) -> Result<Job, SupervisorError> {
        let mut inner = self.inner.lock();
        let job = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| SupervisorError::NotFound(format!("job {id}")))?;
        patch.apply(job, now);
        Ok(job.clone())
    }

    async fn delete(&self, id: &JobId) -> Result<(), SupervisorError> {
        let mut inner = self.inner.lock();
        let job = inner
            .jobs
            .remove(id)
            .ok_or_else(|| SupervisorError::NotFound(format!("job {id}")))?;
        if let Some(key) = job.dedup_key() {
            inner.dedup_index.remove(&key);
        }
        Ok(())
    }

    async fn get_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        filter: &JobFilter,
    ) -> Result<Vec<Job>, SupervisorError> {
        let inner = self.inner.lock();
        let mut matches: Vec<Job> = inner
            .jobs
            .values()
            .filter(|j| filter.matches(j) && j.created_at >= from && j.created_at <= to)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }

    async fn get_statistics(&self) -> Result<JobStatistics, SupervisorError> {
        let inner = self.inner.lock();
        let mut stats = JobStatistics::default();
        for job in inner.jobs.values() {
            stats.total_jobs += 1;
            match job.status {
                JobStatus::Completed => stats.completed_jobs += 1,
                JobStatus::Failed => stats.failed_jobs += 1,
                JobStatus::Cancelled => stats.cancelled_jobs += 1,
                _ if !job.status.is_terminal() => stats.active_jobs += 1,
                _ => {}
            }
            if let Some(g) = job.material_used_g {
                stats.total_material_used_g += g;
            }
            if let Some(c) = job.material_cost {
                stats.total_material_cost += c;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "job_repository_tests.rs"]
mod tests;
