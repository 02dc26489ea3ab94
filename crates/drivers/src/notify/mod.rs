// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification channel adapters (§4.6): one per `ChannelType`, plus a fake
//! for tests. Each formats an event payload per-service, POSTs it, and
//! returns a bool — retries are the dispatcher's decision, never the
//! adapter's.

mod discord;
mod ntfy;
mod slack;

pub use discord::DiscordNotifyAdapter;
pub use ntfy::NtfyNotifyAdapter;
pub use slack::SlackNotifyAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Sends one formatted event to one channel. Implementations never retry —
/// §4.6 makes retry an operator decision driven off `NotificationHistory`.
#[async_trait]
pub trait NotifyAdapter: Send + Sync {
    async fn send(&self, event_type: &str, payload: &Value) -> Result<(), NotifyError>;

    /// The explicit "send test message" operation per channel (§4.6),
    /// returning `(success, message)` rather than propagating an error.
    async fn send_test(&self) -> (bool, String) {
        match self.send("test", &serde_json::json!({"message": "test notification"})).await {
            Ok(()) => (true, "sent".to_string()),
            Err(e) => (false, e.to_string()),
        }
    }
}
