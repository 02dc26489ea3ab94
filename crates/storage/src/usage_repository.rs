// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage telemetry persistence (§3, §6).

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use printernizer_core::usage::UsageEventFilter;
use printernizer_core::{SupervisorError, UsageEvent, UsageEventId};

#[async_trait]
pub trait UsageStatisticsRepository: Send + Sync {
    async fn insert_event(&self, event: UsageEvent) -> Result<(), SupervisorError>;
    async fn get_events(&self, filter: &UsageEventFilter) -> Result<Vec<UsageEvent>, SupervisorError>;
    async fn get_event_counts_by_type(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<BTreeMap<String, usize>, SupervisorError>;
    async fn get_setting(&self, key: &str) -> Result<Option<String>, SupervisorError>;
    async fn set_setting(&self, key: &str, value: String) -> Result<(), SupervisorError>;
    async fn mark_events_submitted(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<usize, SupervisorError>;
}

#[derive(Default)]
struct Inner {
    events: HashMap<UsageEventId, UsageEvent>,
    settings: HashMap<String, String>,
}

#[derive(Default)]
pub struct InMemoryUsageStatisticsRepository {
    inner: Mutex<Inner>,
}

impl InMemoryUsageStatisticsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(event: &UsageEvent, filter: &UsageEventFilter) -> bool {
    filter.event_type.as_deref().map(|t| t == event.event_type).unwrap_or(true)
        && filter.from.map(|f| event.at >= f).unwrap_or(true)
        && filter.to.map(|t| event.at <= t).unwrap_or(true)
        && filter.submitted.map(|s| s == event.submitted).unwrap_or(true)
}

#[async_trait]
impl UsageStatisticsRepository for InMemoryUsageStatisticsRepository {
    async fn insert_event(&self, event: UsageEvent) -> Result<(), SupervisorError> {
        self.inner.lock().events.insert(event.id.clone(), event);
        Ok(())
    }

    async fn get_events(&self, filter: &UsageEventFilter) -> Result<Vec<UsageEvent>, SupervisorError> {
        let inner = self.inner.lock();
        let mut matched: Vec<UsageEvent> = inner.events.values().filter(|e| matches(e, filter)).cloned().collect();
        matched.sort_by(|a, b| a.at.cmp(&b.at));
        Ok(matched)
    }

    async fn get_event_counts_by_type(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<BTreeMap<String, usize>, SupervisorError> {
        let inner = self.inner.lock();
        let mut counts = BTreeMap::new();
        for event in inner.events.values().filter(|e| e.at >= from && e.at <= to) {
            *counts.entry(event.event_type.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, SupervisorError> {
        Ok(self.inner.lock().settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: String) -> Result<(), SupervisorError> {
        self.inner.lock().settings.insert(key.to_string(), value);
        Ok(())
    }

    async fn mark_events_submitted(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<usize, SupervisorError> {
        let mut inner = self.inner.lock();
        let mut count = 0;
        for event in inner.events.values_mut() {
            if event.at >= from && event.at <= to && !event.submitted {
                event.submitted = true;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
#[path = "usage_repository_tests.rs"]
mod tests;
