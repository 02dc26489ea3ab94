// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job entity, its transition graph, and creation/update requests (§3, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::printer::PrinterId;

crate::define_id! {
    /// Unique, immutable identifier for a print job.
    #[derive(Default)]
    pub struct JobId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Preparing,
    Running,
    Printing,
    Paused,
    Completed,
    Failed,
    Cancelled,
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    pub fn is_started(&self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Printing | JobStatus::Paused)
    }

    /// The transition graph of §4.4. `force=true` bypasses this entirely at
    /// the call site; this function only describes the unforced graph.
    pub fn allowed_next(&self) -> &'static [JobStatus] {
        use JobStatus::*;
        match self {
            Pending => &[Running, Printing, Completed, Failed, Cancelled],
            Queued => &[Running, Printing, Preparing, Completed, Failed, Cancelled],
            Preparing => &[Printing, Running, Completed, Failed, Cancelled],
            Running => &[Completed, Failed, Cancelled, Paused],
            Printing => &[Completed, Failed, Cancelled, Paused],
            Paused => &[Running, Printing, Completed, Failed, Cancelled],
            Completed => &[Failed],
            Failed => &[Completed],
            Cancelled => &[],
            Unknown => &[],
        }
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        *self == next || self.allowed_next().contains(&next)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Queued => "queued",
            JobStatus::Preparing => "preparing",
            JobStatus::Running => "running",
            JobStatus::Printing => "printing",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Opaque, business-mode-only metadata. `customer_name` is required
/// whenever `is_business` is true (§3 invariant).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub customer_name: String,
    #[serde(flatten)]
    pub extra: Value,
}

/// A print job tracked by the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub printer_id: PrinterId,
    pub printer_type: String,
    pub job_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration_s: Option<u64>,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_used_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_cost: Option<f64>,
    #[serde(default)]
    pub is_business: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Request to create a job, either manually (API-originated) or
/// auto-synthesized by the supervisor from observed telemetry (§4.4).
#[derive(Debug, Clone)]
pub struct JobCreate {
    pub printer_id: PrinterId,
    pub printer_type: String,
    pub job_name: String,
    pub filename: Option<String>,
    pub status: JobStatus,
    /// Carried through from the printer's own `started_at` so auto-created
    /// jobs are dedup-keyed (§4.4).
    pub started_at: Option<DateTime<Utc>>,
    pub is_business: bool,
    pub customer_info: Option<CustomerInfo>,
}

/// The `(printer_id, filename, started_at)` uniqueness key from §3. Only
/// meaningful when all three fields are set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub printer_id: PrinterId,
    pub filename: String,
    pub started_at: DateTime<Utc>,
}

impl JobCreate {
    pub fn dedup_key(&self) -> Option<DedupKey> {
        let filename = self.filename.clone()?;
        let started_at = self.started_at?;
        Some(DedupKey {
            printer_id: self.printer_id.clone(),
            filename,
            started_at,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobValidationError {
    #[error("job_name must not be empty")]
    EmptyJobName,
    #[error("is_business requires customer_info.customer_name")]
    MissingCustomerName,
}

impl Job {
    pub fn from_create(id: JobId, req: JobCreate, now: DateTime<Utc>) -> Result<Self, JobValidationError> {
        if req.job_name.trim().is_empty() {
            return Err(JobValidationError::EmptyJobName);
        }
        if req.is_business {
            let has_name = req
                .customer_info
                .as_ref()
                .map(|c| !c.customer_name.trim().is_empty())
                .unwrap_or(false);
            if !has_name {
                return Err(JobValidationError::MissingCustomerName);
            }
        }
        let started_at = if req.status.is_started() {
            req.started_at.or(Some(now))
        } else {
            req.started_at
        };
        let ended_at = if req.status.is_terminal() { Some(now) } else { None };
        Ok(Self {
            id,
            printer_id: req.printer_id,
            printer_type: req.printer_type,
            job_name: req.job_name,
            filename: req.filename,
            status: req.status,
            started_at,
            ended_at,
            estimated_duration_s: None,
            actual_duration_s: None,
            progress: 0,
            material_used_g: None,
            material_cost: None,
            power_cost: None,
            is_business: req.is_business,
            customer_info: req.customer_info,
            created_at: now,
            updated_at: now,
            notes: None,
        })
    }

    pub fn dedup_key(&self) -> Option<DedupKey> {
        let filename = self.filename.clone()?;
        let started_at = self.started_at?;
        Some(DedupKey {
            printer_id: self.printer_id.clone(),
            filename,
            started_at,
        })
    }

    /// Clamp to `0..=100` rather than reject (§8 boundary behavior).
    pub fn set_progress(&mut self, percent: i32, now: DateTime<Utc>) {
        self.progress = percent.clamp(0, 100) as u8;
        self.updated_at = now;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
