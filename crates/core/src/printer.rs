// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Printer configuration and last-known-liveness record (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::Phase;

crate::define_id! {
    /// Unique, immutable identifier for a configured printer.
    pub struct PrinterId;
}

/// Vendor family a printer belongs to. Prusa follows the OctoPrint shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterType {
    BambuLab,
    Prusa,
    OctoPrint,
}

impl std::fmt::Display for PrinterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrinterType::BambuLab => "bambu_lab",
            PrinterType::Prusa => "prusa",
            PrinterType::OctoPrint => "octoprint",
        };
        write!(f, "{s}")
    }
}

/// Connection details for a printer. Field presence varies by vendor:
/// Bambu needs `access_code` + `serial`; OctoPrint/Prusa need `api_key`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterEndpoint {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
}

/// A configured printer and its last-observed liveness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Printer {
    pub id: PrinterId,
    pub printer_type: PrinterType,
    pub endpoint: PrinterEndpoint,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Printer {
    pub fn new(id: impl Into<String>, printer_type: PrinterType, endpoint: PrinterEndpoint) -> Self {
        Self {
            id: PrinterId::new(id),
            printer_type,
            endpoint,
            is_active: true,
            last_phase: None,
            last_seen_at: None,
        }
    }

    /// Record a liveness observation (monitor writeback, §4.3 step 4).
    pub fn record_seen(&mut self, phase: Phase, at: DateTime<Utc>) {
        self.last_phase = Some(phase);
        self.last_seen_at = Some(at);
    }
}

/// Filter for `PrinterRepository::list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrinterFilter {
    pub active_only: bool,
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
