// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use serde_json::Value;

use super::{NotifyAdapter, NotifyError};

/// Publishes to an ntfy.sh (or self-hosted ntfy) topic. Title and body go in
/// headers per ntfy's publish API; the body itself is plain text, not JSON.
pub struct NtfyNotifyAdapter {
    server_url: String,
    topic: String,
    client: reqwest::Client,
}

impl NtfyNotifyAdapter {
    pub fn new(server_url: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            topic: topic.into(),
            client: reqwest::Client::new(),
        }
    }

    fn topic_url(&self) -> String {
        format!("{}/{}", self.server_url.trim_end_matches('/'), self.topic)
    }

    fn body(payload: &Value) -> String {
        serde_json::to_string(payload).unwrap_or_default()
    }
}

#[async_trait]
impl NotifyAdapter for NtfyNotifyAdapter {
    async fn send(&self, event_type: &str, payload: &Value) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.topic_url())
            .header("Title", event_type)
            .body(Self::body(payload))
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::SendFailed(format!("ntfy returned {}", response.status())))
        }
    }
}

#[cfg(test)]
#[path = "ntfy_tests.rs"]
mod tests;
