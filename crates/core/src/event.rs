// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bus event envelope (§4.3, §6). Every variant carries its own
//! `timestamp`; the tag matches the wire event-type string exactly so a
//! subscriber's notification-channel subscription set can be compared
//! against [`Event::event_type`] without a separate lookup table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::job::{JobId, JobStatus};
use crate::printer::PrinterId;
use crate::status::Phase;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum Event {
    PrinterStatus {
        printer_id: PrinterId,
        phase: Phase,
        timestamp: DateTime<Utc>,
    },
    PrinterConnected {
        printer_id: PrinterId,
        timestamp: DateTime<Utc>,
    },
    PrinterDisconnected {
        printer_id: PrinterId,
        timestamp: DateTime<Utc>,
    },
    JobCreated {
        job_id: JobId,
        printer_id: PrinterId,
        timestamp: DateTime<Utc>,
    },
    JobStarted {
        job_id: JobId,
        printer_id: PrinterId,
        timestamp: DateTime<Utc>,
    },
    JobCompleted {
        job_id: JobId,
        printer_id: PrinterId,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    JobStatusChanged {
        job_id: JobId,
        printer_id: PrinterId,
        old_status: JobStatus,
        new_status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    JobUpdate {
        job_id: JobId,
        printer_id: PrinterId,
        progress: u8,
        progress_delta: i16,
        timestamp: DateTime<Utc>,
    },
    JobProgressUpdated {
        job_id: JobId,
        progress: u8,
        timestamp: DateTime<Utc>,
    },
    JobDeleted {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
    FilesDiscovered {
        printer_id: Option<PrinterId>,
        count: usize,
        timestamp: DateTime<Utc>,
    },
    NewFilesFound {
        printer_id: Option<PrinterId>,
        checksums: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    FileDownloadComplete {
        printer_id: PrinterId,
        filename: String,
        timestamp: DateTime<Utc>,
    },
    MaterialLowStock {
        printer_id: PrinterId,
        slot: u32,
        material_type: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// The wire event-type string used for notification-channel
    /// subscriptions and usage-event `event_type` values.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::PrinterStatus { .. } => "printer_status",
            Event::PrinterConnected { .. } => "printer_connected",
            Event::PrinterDisconnected { .. } => "printer_disconnected",
            Event::JobCreated { .. } => "job_created",
            Event::JobStarted { .. } => "job_started",
            Event::JobCompleted { .. } => "job_completed",
            Event::JobStatusChanged { .. } => "job_status_changed",
            Event::JobUpdate { .. } => "job_update",
            Event::JobProgressUpdated { .. } => "job_progress_updated",
            Event::JobDeleted { .. } => "job_deleted",
            Event::FilesDiscovered { .. } => "files_discovered",
            Event::NewFilesFound { .. } => "new_files_found",
            Event::FileDownloadComplete { .. } => "file_download_complete",
            Event::MaterialLowStock { .. } => "material_low_stock",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::PrinterStatus { timestamp, .. }
            | Event::PrinterConnected { timestamp, .. }
            | Event::PrinterDisconnected { timestamp, .. }
            | Event::JobCreated { timestamp, .. }
            | Event::JobStarted { timestamp, .. }
            | Event::JobCompleted { timestamp, .. }
            | Event::JobStatusChanged { timestamp, .. }
            | Event::JobUpdate { timestamp, .. }
            | Event::JobProgressUpdated { timestamp, .. }
            | Event::JobDeleted { timestamp, .. }
            | Event::FilesDiscovered { timestamp, .. }
            | Event::NewFilesFound { timestamp, .. }
            | Event::FileDownloadComplete { timestamp, .. }
            | Event::MaterialLowStock { timestamp, .. } => *timestamp,
        }
    }

    /// §4.6: `job_status_changed` maps to a notification event only when the
    /// new status matches `job_failed` or `job_paused`; everything else maps
    /// 1:1 to its own event type. Returns `None` when no notification should
    /// fire for this bus event.
    pub fn notification_event_type(&self) -> Option<&'static str> {
        match self {
            Event::JobStatusChanged { new_status, .. } => match new_status {
                JobStatus::Failed => Some("job_failed"),
                JobStatus::Paused => Some("job_paused"),
                _ => None,
            },
            other => match other.event_type() {
                "job_started" | "job_completed" | "printer_connected" | "printer_disconnected"
                | "material_low_stock" | "file_download_complete" => Some(other.event_type()),
                _ => None,
            },
        }
    }

    /// A JSON payload suitable for a notification adapter or usage event,
    /// always carrying the ISO-8601 `timestamp` field (§6).
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
