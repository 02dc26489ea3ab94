// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification channel and history persistence (§4.6, §6).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use printernizer_core::{ChannelId, NotificationHistoryEntry, SupervisorError};
use printernizer_core::notification::NotificationChannel;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_channel(&self, channel: NotificationChannel) -> Result<NotificationChannel, SupervisorError>;
    async fn get_channel(&self, id: &ChannelId) -> Result<Option<NotificationChannel>, SupervisorError>;
    async fn list_channels(&self) -> Result<Vec<NotificationChannel>, SupervisorError>;
    async fn list_enabled_subscribers(&self, event_type: &str) -> Result<Vec<NotificationChannel>, SupervisorError>;
    async fn set_subscriptions(&self, id: &ChannelId, event_types: Vec<String>) -> Result<(), SupervisorError>;
    async fn delete_channel(&self, id: &ChannelId) -> Result<(), SupervisorError>;
    async fn record(&self, entry: NotificationHistoryEntry) -> Result<(), SupervisorError>;
    async fn history(&self, channel: Option<&ChannelId>, limit: usize, offset: usize) -> Result<Vec<NotificationHistoryEntry>, SupervisorError>;
    async fn count(&self, channel: Option<&ChannelId>) -> Result<usize, SupervisorError>;
    /// Deletes history entries older than `now - days`; returns the count removed (§4.6).
    async fn cleanup(&self, days: u32, now: DateTime<Utc>) -> Result<usize, SupervisorError>;
}

#[derive(Default)]
struct Inner {
    channels: HashMap<ChannelId, NotificationChannel>,
    history: Vec<NotificationHistoryEntry>,
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    inner: Mutex<Inner>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create_channel(&self, channel: NotificationChannel) -> Result<NotificationChannel, SupervisorError> {
        let mut inner = self.inner.lock();
        if inner.channels.contains_key(&channel.id) {
            return Err(SupervisorError::Conflict(format!("channel {} already exists", channel.id)));
        }
        inner.channels.insert(channel.id.clone(), channel.clone());
        Ok(channel)
    }

    async fn get_channel(&self, id: &ChannelId) -> Result<Option<NotificationChannel>, SupervisorError> {
        Ok(self.inner.lock().channels.get(id).cloned())
    }

    async fn list_channels(&self) -> Result<Vec<NotificationChannel>, SupervisorError> {
        Ok(self.inner.lock().channels.values().cloned().collect())
    }

    async fn list_enabled_subscribers(&self, event_type: &str) -> Result<Vec<NotificationChannel>, SupervisorError> {
        Ok(self
            .inner
            .lock()
            .channels
            .values()
            .filter(|c| c.is_subscribed(event_type))
            .cloned()
            .collect())
    }

    async fn set_subscriptions(&self, id: &ChannelId, event_types: Vec<String>) -> Result<(), SupervisorError> {
        let mut inner = self.inner.lock();
        let channel = inner
            .channels
            .get_mut(id)
            .ok_or_else(|| SupervisorError::NotFound(format!("channel {id}")))?;
        channel.subscriptions = event_types.into_iter().collect();
        Ok(())
    }

    async fn delete_channel(&self, id: &ChannelId) -> Result<(), SupervisorError> {
        self.inner
            .lock()
            .channels
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SupervisorError::NotFound(format!("channel {id}")))
    }

    async fn record(&self, entry: NotificationHistoryEntry) -> Result<(), SupervisorError> {
        self.inner.lock().history.push(entry);
        Ok(())
    }

    async fn history(
        &self,
        channel: Option<&ChannelId>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<NotificationHistoryEntry>, SupervisorError> {
        let inner = self.inner.lock();
        let mut matches: Vec<NotificationHistoryEntry> = inner
            .history
            .iter()
            .filter(|e| channel.map(|c| c == &e.channel_id).unwrap_or(true))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.at.cmp(&a.at));
        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, channel: Option<&ChannelId>) -> Result<usize, SupervisorError> {
        Ok(self
            .inner
            .lock()
            .history
            .iter()
            .filter(|e| channel.map(|c| c == &e.channel_id).unwrap_or(true))
            .count())
    }

    async fn cleanup(&self, days: u32, now: DateTime<Utc>) -> Result<usize, SupervisorError> {
        let cutoff = now - chrono::Duration::days(days as i64);
        let mut inner = self.inner.lock();
        let before = inner.history.len();
        inner.history.retain(|e| e.at >= cutoff);
        Ok(before - inner.history.len())
    }
}

#[cfg(test)]
#[path = "notification_repository_tests.rs"]
mod tests;
