// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for testing.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{NotifyAdapter, NotifyError};

/// Recorded notification.
#[derive(Debug, Clone)]
pub struct NotifyCall {
    pub event_type: String,
    pub payload: Value,
}

struct FakeNotifyState {
    calls: Vec<NotifyCall>,
    fail_next: bool,
}

/// Fake notification adapter for testing.
#[derive(Clone)]
pub struct FakeNotifyAdapter {
    inner: Arc<Mutex<FakeNotifyState>>,
}

impl Default for FakeNotifyAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeNotifyState { calls: Vec::new(), fail_next: false })),
        }
    }
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded notifications.
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.inner.lock().calls.clone()
    }

    /// Makes the next `send()` call return an error, then resets.
    pub fn fail_next(&self) {
        self.inner.lock().fail_next = true;
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn send(&self, event_type: &str, payload: &Value) -> Result<(), NotifyError> {
        let mut state = self.inner.lock();
        if state.fail_next {
            state.fail_next = false;
            return Err(NotifyError::SendFailed("fake failure".to_string()));
        }
        state.calls.push(NotifyCall {
            event_type: event_type.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
