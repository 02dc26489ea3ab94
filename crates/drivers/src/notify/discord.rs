// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use serde_json::Value;

use super::{NotifyAdapter, NotifyError};

pub struct DiscordNotifyAdapter {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifyAdapter {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn format(event_type: &str, payload: &Value) -> Value {
        serde_json::json!({
            "content": format!("**{event_type}**\n```{}```", payload),
        })
    }
}

#[async_trait]
impl NotifyAdapter for DiscordNotifyAdapter {
    async fn send(&self, event_type: &str, payload: &Value) -> Result<(), NotifyError> {
        let body = Self::format(event_type, payload);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::SendFailed(format!("discord webhook returned {}", response.status())))
        }
    }
}

#[cfg(test)]
#[path = "discord_tests.rs"]
mod tests;
