// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostic snapshot persistence (§3, §6). The supervisor core exposes
//! this contract only; it never produces a `Snapshot` itself.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use printernizer_core::job::JobId;
use printernizer_core::printer::PrinterId;
use printernizer_core::{Snapshot, SnapshotId, SupervisorError};

/// A `Snapshot` plus denormalized printer/job context (§6: "with context view").
#[derive(Debug, Clone)]
pub struct SnapshotView {
    pub snapshot: Snapshot,
    pub printer_name: Option<String>,
    pub job_name: Option<String>,
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn create(&self, snapshot: Snapshot) -> Result<Snapshot, SupervisorError>;
    async fn get(&self, id: &SnapshotId) -> Result<Option<SnapshotView>, SupervisorError>;
    async fn list(&self, printer: Option<&PrinterId>, job: Option<&JobId>, page: usize, limit: usize) -> Result<Vec<Snapshot>, SupervisorError>;
    async fn delete(&self, id: &SnapshotId) -> Result<(), SupervisorError>;
    async fn update_validation(&self, id: &SnapshotId, valid: bool, error: Option<String>) -> Result<(), SupervisorError>;
}

#[derive(Default)]
pub struct InMemorySnapshotRepository {
    snapshots: Mutex<HashMap<SnapshotId, Snapshot>>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn create(&self, snapshot: Snapshot) -> Result<Snapshot, SupervisorError> {
        let mut snapshots = self.snapshots.lock();
        if snapshots.contains_key(&snapshot.id) {
            return Err(SupervisorError::Conflict(format!("snapshot {} already exists", snapshot.id)));
        }
        snapshots.insert(snapshot.id.clone(), snapshot.clone());
        Ok(snapshot)
    }

    async fn get(&self, id: &SnapshotId) -> Result<Option<SnapshotView>, SupervisorError> {
        Ok(self.snapshots.lock().get(id).cloned().map(|snapshot| SnapshotView {
            snapshot,
            printer_name: None,
            job_name: None,
        }))
    }

    async fn list(&self, printer: Option<&PrinterId>, job: Option<&JobId>, page: usize, limit: usize) -> Result<Vec<Snapshot>, SupervisorError> {
        let snapshots = self.snapshots.lock();
        let mut matches: Vec<Snapshot> = snapshots
            .values()
            .filter(|s| printer.map(|p| s.printer_id.as_ref() == Some(p)).unwrap_or(true))
            .filter(|s| job.map(|j| s.job_id.as_ref() == Some(j)).unwrap_or(true))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
        Ok(matches.into_iter().skip(page * limit).take(limit).collect())
    }

    async fn delete(&self, id: &SnapshotId) -> Result<(), SupervisorError> {
        self.snapshots
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SupervisorError::NotFound(format!("snapshot {id}")))
    }

    async fn update_validation(&self, id: &SnapshotId, valid: bool, error: Option<String>) -> Result<(), SupervisorError> {
        let mut snapshots = self.snapshots.lock();
        let snapshot = snapshots
            .get_mut(id)
            .ok_or_else(|| SupervisorError::NotFound(format!("snapshot {id}")))?;
        snapshot.valid = valid;
        snapshot.validation_error = error;
        Ok(())
    }
}

#[cfg(test)]
#[path = "snapshot_repository_tests.rs"]
mod tests;
