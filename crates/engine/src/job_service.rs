// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job lifecycle engine (§4.4): transition validation, auto-creation from
//! observed telemetry, deduplication.
//!
//! Status writes go through a per-job async lock so two concurrent
//! transitions on the same job serialize (§5); the lock is in-memory only.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::SecondsFormat;
use parking_lot::Mutex;
use printernizer_core::job::JobStatus;
use printernizer_core::status::Phase;
use printernizer_core::{
    Clock, Event, IdGen, Job, JobCreate, JobId, Printer, PrinterId, StatusUpdate, SupervisorError, WriteOutcome,
};
use printernizer_storage::{JobPatch, JobRepository};

use crate::bus::EventBus;

pub struct JobService<C: Clock, G: IdGen> {
    repo: Arc<dyn JobRepository>,
    bus: EventBus,
    clock: C,
    ids: G,
    auto_create: bool,
    locks: Mutex<HashMap<JobId, Arc<tokio::sync::Mutex<()>>>>,
    /// Printer -> the job currently materialized from its telemetry.
    active: Mutex<HashMap<PrinterId, JobId>>,
}

impl<C: Clock, G: IdGen> JobService<C, G> {
    pub fn new(repo: Arc<dyn JobRepository>, bus: EventBus, clock: C, ids: G, auto_create: bool) -> Arc<Self> {
        Arc::new(Self {
            repo,
            bus,
            clock,
            ids,
            auto_create,
            locks: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
        })
    }

    fn lock_for(&self, id: &JobId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(id.clone()).or_default())
    }

    /// Create a job, manual or auto. A dedup hit is not an error: the
    /// existing row comes back as [`WriteOutcome::Duplicate`] and no
    /// `job_created` event fires (§4.4, S3).
    pub async fn create(&self, request: JobCreate) -> Result<WriteOutcome<Job>, SupervisorError> {
        let now = self.clock.now();
        let job = Job::from_create(JobId::new(self.ids.next()), request, now)
            .map_err(|e| SupervisorError::Invalid(e.to_string()))?;
        let outcome = self.repo.create(job).await?;
        match &outcome {
            WriteOutcome::Created(job) => {
                tracing::info!(job_id = %job.id, printer_id = %job.printer_id, job_name = %job.job_name, "job created");
                self.bus.emit(Event::JobCreated {
                    job_id: job.id.clone(),
                    printer_id: job.printer_id.clone(),
                    timestamp: now,
                });
            }
            WriteOutcome::Duplicate(existing) => {
                tracing::debug!(job_id = %existing.id, printer_id = %existing.printer_id, "duplicate job create suppressed");
            }
        }
        Ok(outcome)
    }

    pub async fn get(&self, id: &JobId) -> Result<Option<Job>, SupervisorError> {
        self.repo.get(id).await
    }

    /// Apply a status transition. Without `force` the transition must be an
    /// edge of the §4.4 graph; a repeat of the current status is a no-op
    /// (no duplicate timestamps, no duplicate notes).
    pub async fn update_status(
        &self,
        id: &JobId,
        new_status: JobStatus,
        force: bool,
        completion_notes: Option<&str>,
    ) -> Result<Job, SupervisorError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let job = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| SupervisorError::NotFound(format!("job {id}")))?;
        let old_status = job.status;
        if old_status == new_status && !force {
            return Ok(job);
        }
        if !force && !old_status.can_transition_to(new_status) {
            return Err(SupervisorError::InvalidTransition {
                from: old_status.to_string(),
                to: new_status.to_string(),
                allowed: old_status.allowed_next().iter().map(ToString::to_string).collect(),
            });
        }

        let now = self.clock.now();
        let mut patch = JobPatch {
            status: Some(new_status),
            ..Default::default()
        };
        let started_at = job.started_at;
        if new_status.is_started() && started_at.is_none() {
            patch.started_at = Some(Some(now));
        }
        if new_status.is_terminal() {
            patch.ended_at = Some(Some(now));
            let effective_start = started_at.or(if new_status.is_started() { Some(now) } else { None });
            if let Some(start) = effective_start {
                patch.actual_duration_s = Some(Some((now - start).num_seconds().max(0) as u64));
            }
        }
        if completion_notes.is_some() || force {
            let mut line = format!(
                "[{}] Status changed: {} → {}",
                now.to_rfc3339_opts(SecondsFormat::Secs, true),
                old_status,
                new_status
            );
            if let Some(text) = completion_notes {
                line.push_str(": ");
                line.push_str(text);
            }
            let notes = match &job.notes {
                Some(existing) => format!("{existing}\n{line}"),
                None => line,
            };
            patch.notes = Some(Some(notes));
        }

        let updated = self.repo.update(id, patch, now).await?;
        tracing::info!(job_id = %id, from = %old_status, to = %new_status, forced = force, "job status changed");
        self.bus.emit(Event::JobStatusChanged {
            job_id: id.clone(),
            printer_id: updated.printer_id.clone(),
            old_status,
            new_status,
            timestamp: now,
        });
        Ok(updated)
    }

    /// Progress writes are clamped to 0..=100, never rejected (§8).
    pub async fn update_progress(&self, id: &JobId, percent: i32) -> Result<Job, SupervisorError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let job = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| SupervisorError::NotFound(format!("job {id}")))?;
        let clamped = percent.clamp(0, 100) as u8;
        if job.progress == clamped {
            return Ok(job);
        }
        let now = self.clock.now();
        let updated = self
            .repo
            .update(
                id,
                JobPatch {
                    progress: Some(clamped),
                    ..Default::default()
                },
                now,
            )
            .await?;
        self.bus.emit(Event::JobProgressUpdated {
            job_id: id.clone(),
            progress: clamped,
            timestamp: now,
        });
        Ok(updated)
    }

    pub async fn delete(&self, id: &JobId) -> Result<(), SupervisorError> {
        self.repo.delete(id).await?;
        self.locks.lock().remove(id);
        self.active.lock().retain(|_, job_id| job_id != id);
        self.bus.emit(Event::JobDeleted {
            job_id: id.clone(),
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    /// Fold one observed status into the job table (§4.3 Task 1 hands the
    /// cached update here; §4.4 auto-creation). Returns the job the update
    /// applied to, if any.
    pub async fn sync_from_status(&self, printer: &Printer, update: &StatusUpdate) -> Result<Option<Job>, SupervisorError> {
        match update.phase {
            Phase::Printing | Phase::Paused => self.sync_active(printer, update).await,
            Phase::Online | Phase::Error => self.close_active(printer, update).await,
            // Offline/unknown printers keep their tracked job; the printer
            // may come back mid-print after a network blip.
            Phase::Offline | Phase::Unknown => Ok(None),
        }
    }

    fn active_job_id(&self, printer_id: &PrinterId) -> Option<JobId> {
        self.active.lock().get(printer_id).cloned()
    }

    async fn sync_active(&self, printer: &Printer, update: &StatusUpdate) -> Result<Option<Job>, SupervisorError> {
        let desired = if update.phase == Phase::Printing {
            JobStatus::Printing
        } else {
            JobStatus::Paused
        };

        let tracked = match self.active_job_id(&printer.id) {
            Some(id) => self.repo.get(&id).await?.filter(|job| !job.status.is_terminal()),
            None => None,
        };
        let job = match tracked {
            Some(job) => job,
            None => {
                if !self.auto_create {
                    return Ok(None);
                }
                let Some(name) = update.current_job_name.clone() else {
                    return Ok(None);
                };
                let request = JobCreate {
                    printer_id: printer.id.clone(),
                    printer_type: printer.printer_type.to_string(),
                    job_name: name.clone(),
                    filename: Some(name),
                    status: desired,
                    started_at: update.started_at,
                    is_business: false,
                    customer_info: None,
                };
                self.create(request).await?.into_inner()
            }
        };
        self.active.lock().insert(printer.id.clone(), job.id.clone());

        if job.status != desired && job.status.can_transition_to(desired) {
            self.update_status(&job.id, desired, false, None).await?;
        }
        if let Some(percent) = update.progress_percent {
            self.update_progress(&job.id, i32::from(percent)).await?;
        }
        self.repo.get(&job.id).await
    }

    async fn close_active(&self, printer: &Printer, update: &StatusUpdate) -> Result<Option<Job>, SupervisorError> {
        let Some(id) = self.active_job_id(&printer.id) else {
            return Ok(None);
        };
        let Some(job) = self.repo.get(&id).await? else {
            self.active.lock().remove(&printer.id);
            return Ok(None);
        };
        if job.status.is_terminal() {
            self.active.lock().remove(&printer.id);
            return Ok(Some(job));
        }

        let finished = update.progress_percent.map(|p| p >= 100).unwrap_or(false) || job.progress >= 100;
        let target = match update.phase {
            Phase::Error => JobStatus::Failed,
            _ if finished => JobStatus::Completed,
            _ => JobStatus::Cancelled,
        };
        if update.progress_percent == Some(100) && job.progress < 100 {
            self.update_progress(&id, 100).await?;
        }
        let updated = self.update_status(&id, target, false, None).await?;
        self.active.lock().remove(&printer.id);
        Ok(Some(updated))
    }
}

#[cfg(test)]
#[path = "job_service_tests.rs"]
mod tests;
