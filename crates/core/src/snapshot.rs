// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostic camera snapshots (§3 ambient addition). The supervisor core
//! never produces these itself — that belongs to an out-of-scope preview
//! renderer — but must expose the repository contract so it can persist
//! and query what that renderer produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobId;
use crate::printer::PrinterId;

crate::define_id! {
    pub struct SnapshotId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer_id: Option<PrinterId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub taken_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_bytes: Option<Vec<u8>>,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

impl Snapshot {
    pub fn pending(id: SnapshotId, printer_id: Option<PrinterId>, job_id: Option<JobId>, taken_at: DateTime<Utc>) -> Self {
        Self {
            id,
            printer_id,
            job_id,
            taken_at,
            image_bytes: None,
            valid: false,
            validation_error: None,
        }
    }

    pub fn mark_valid(&mut self, image_bytes: Vec<u8>) {
        self.image_bytes = Some(image_bytes);
        self.valid = true;
        self.validation_error = None;
    }

    pub fn mark_invalid(&mut self, reason: impl Into<String>) {
        self.valid = false;
        self.validation_error = Some(reason.into());
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
