// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only usage telemetry (§3 ambient addition). Inserted by the usage
//! recorder on selected bus events; never mutated except for the
//! `submitted` flag once an out-of-scope external path reports them sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    pub struct UsageEventId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub id: UsageEventId,
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub submitted: bool,
}

impl UsageEvent {
    pub fn new(id: UsageEventId, event_type: impl Into<String>, payload: Value, at: DateTime<Utc>) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            payload,
            at,
            submitted: false,
        }
    }
}

/// Filter accepted by `UsageStatisticsRepository::get_events`.
#[derive(Debug, Clone, Default)]
pub struct UsageEventFilter {
    pub event_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub submitted: Option<bool>,
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
