// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized printer telemetry (§3). Transient — never persisted directly,
//! only folded into [`crate::printer::Printer`] liveness and
//! [`crate::job::Job`] state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::printer::PrinterId;

/// Normalized printer phase, distinct from any vendor's state string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Offline,
    Online,
    Printing,
    Paused,
    Error,
    Unknown,
}

impl Phase {
    pub fn is_online(&self) -> bool {
        !matches!(self, Phase::Offline)
    }
}

/// Slot index reserved for a filament loaded outside the AMS (§9 glossary).
pub const EXTERNAL_SPOOL_SLOT: u32 = 254;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Temperatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nozzle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chamber: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filament {
    pub slot: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,
    pub is_active: bool,
}

impl Filament {
    pub fn is_external_spool(&self) -> bool {
        self.slot == EXTERNAL_SPOOL_SLOT
    }
}

/// One normalized telemetry snapshot emitted by a driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub printer_id: PrinterId,
    pub at: DateTime<Utc>,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub temperatures: Temperatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub filaments: Vec<Filament>,
    #[serde(default)]
    pub raw: Value,
}

impl StatusUpdate {
    pub fn offline(printer_id: PrinterId, at: DateTime<Utc>) -> Self {
        Self {
            printer_id,
            at,
            phase: Phase::Offline,
            message: None,
            temperatures: Temperatures::default(),
            progress_percent: None,
            current_job_name: None,
            remaining_minutes: None,
            elapsed_minutes: None,
            started_at: None,
            estimated_end_at: None,
            filaments: Vec::new(),
            raw: Value::Null,
        }
    }

    /// Clamp `progress_percent` to `0..=100` (§8 boundary behavior).
    pub fn clamp_progress(&mut self) {
        if let Some(p) = self.progress_percent {
            self.progress_percent = Some(p.min(100));
        }
    }

    /// §3 invariant: `phase=printing` requires a job label, real or
    /// synthesized. Drivers must call this (or supply a name) before
    /// publishing; violating it is a driver bug, not a runtime error.
    pub fn has_required_job_label(&self) -> bool {
        self.phase != Phase::Printing || self.current_job_name.is_some()
    }

    /// Synthesize a label when the printer reports no job name, per §4.3's
    /// auto-creation path needing *some* name to key a job on.
    pub fn with_synthesized_job_name_if_missing(mut self, fallback: impl FnOnce() -> String) -> Self {
        if self.phase == Phase::Printing && self.current_job_name.is_none() {
            self.current_job_name = Some(fallback());
        }
        self
    }

    pub fn external_spool(&self) -> Option<&Filament> {
        self.filaments.iter().find(|f| f.is_external_spool())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
