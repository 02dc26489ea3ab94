// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification channel configuration and delivery history (§3, §4.6).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    pub struct ChannelId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Discord,
    Slack,
    Ntfy,
}

/// A configured notification destination and the event types it receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: ChannelId,
    pub name: String,
    pub channel_type: ChannelType,
    pub webhook_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub is_enabled: bool,
    #[serde(default)]
    pub subscriptions: BTreeSet<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelValidationError {
    #[error("ntfy channels require a topic")]
    MissingNtfyTopic,
}

impl NotificationChannel {
    pub fn new(
        id: ChannelId,
        name: impl Into<String>,
        channel_type: ChannelType,
        webhook_url: impl Into<String>,
        topic: Option<String>,
    ) -> Result<Self, ChannelValidationError> {
        if channel_type == ChannelType::Ntfy && topic.as_deref().unwrap_or("").trim().is_empty() {
            return Err(ChannelValidationError::MissingNtfyTopic);
        }
        Ok(Self {
            id,
            name: name.into(),
            channel_type,
            webhook_url: webhook_url.into(),
            topic,
            is_enabled: true,
            subscriptions: BTreeSet::new(),
        })
    }

    pub fn is_subscribed(&self, event_type: &str) -> bool {
        self.is_enabled && self.subscriptions.contains(event_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Pending,
}

/// One append-only delivery attempt record (§3, §4.6). Cleaned up by age,
/// never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationHistoryEntry {
    pub channel_id: ChannelId,
    pub event_type: String,
    pub event_data: Value,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl NotificationHistoryEntry {
    pub fn sent(channel_id: ChannelId, event_type: impl Into<String>, event_data: Value, at: DateTime<Utc>) -> Self {
        Self {
            channel_id,
            event_type: event_type.into(),
            event_data,
            status: DeliveryStatus::Sent,
            error: None,
            at,
        }
    }

    pub fn failed(
        channel_id: ChannelId,
        event_type: impl Into<String>,
        event_data: Value,
        error: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            channel_id,
            event_type: event_type.into(),
            event_data,
            status: DeliveryStatus::Failed,
            error: Some(error.into()),
            at,
        }
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
