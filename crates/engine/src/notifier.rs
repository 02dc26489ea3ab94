// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification dispatcher (§4.6).
//!
//! Subscribes to the bus, filters events down to the channels subscribed to
//! them, and fires one detached task per channel so a hanging webhook never
//! delays the others. Every attempt lands in `NotificationHistory`; the
//! dispatcher itself never retries — operators replay from history.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use printernizer_core::notification::NotificationChannel;
use printernizer_core::{ChannelId, Clock, Event, NotificationHistoryEntry, SupervisorConfig, SupervisorError};
use printernizer_drivers::notify::{DiscordNotifyAdapter, NotifyAdapter, NtfyNotifyAdapter, SlackNotifyAdapter};
use printernizer_storage::NotificationRepository;
use serde_json::Value;
use tokio::sync::Notify;

use crate::bus::EventBus;

/// Builds the adapter for a channel. Swapped for a fake-producing factory in
/// tests; production uses [`WebhookAdapterFactory`].
pub trait AdapterFactory: Send + Sync {
    fn adapter_for(&self, channel: &NotificationChannel) -> Arc<dyn NotifyAdapter>;
}

/// Production factory: one webhook adapter per channel type.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookAdapterFactory;

impl AdapterFactory for WebhookAdapterFactory {
    fn adapter_for(&self, channel: &NotificationChannel) -> Arc<dyn NotifyAdapter> {
        use printernizer_core::notification::ChannelType;
        match channel.channel_type {
            ChannelType::Discord => Arc::new(DiscordNotifyAdapter::new(&channel.webhook_url)),
            ChannelType::Slack => Arc::new(SlackNotifyAdapter::new(&channel.webhook_url)),
            ChannelType::Ntfy => Arc::new(NtfyNotifyAdapter::new(
                &channel.webhook_url,
                channel.topic.clone().unwrap_or_default(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Upper bound on one adapter send; a hung webhook records `failed`
    /// after this long (S6).
    pub send_timeout: Duration,
    pub retention_days: u32,
}

impl DispatcherSettings {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            send_timeout: config.connection_timeout(),
            retention_days: config.notification_history_retention_days,
        }
    }
}

struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

pub struct NotificationDispatcher<C: Clock> {
    repo: Arc<dyn NotificationRepository>,
    factory: Arc<dyn AdapterFactory>,
    clock: C,
    settings: DispatcherSettings,
    in_flight: Arc<InFlight>,
}

impl<C: Clock> NotificationDispatcher<C> {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        factory: Arc<dyn AdapterFactory>,
        clock: C,
        settings: DispatcherSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            repo,
            factory,
            clock,
            settings,
            in_flight: Arc::new(InFlight {
                count: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        })
    }

    /// Subscribe to the bus. Registered once at startup (§4.3).
    pub fn register(self: Arc<Self>, bus: &EventBus) {
        let dispatcher = self;
        bus.subscribe(
            "notification_dispatcher",
            Arc::new(move |event| {
                let dispatcher = Arc::clone(&dispatcher);
                Box::pin(async move {
                    dispatcher.dispatch(&event).await;
                })
            }),
        );
    }

    /// Fan one bus event out to its subscribed channels without awaiting any
    /// of the sends.
    pub async fn dispatch(&self, event: &Event) {
        let Some(event_type) = event.notification_event_type() else {
            return;
        };
        let channels = match self.repo.list_enabled_subscribers(event_type).await {
            Ok(channels) => channels,
            Err(e) => {
                tracing::warn!(event_type, error = %e, "failed to resolve notification subscribers");
                return;
            }
        };
        if channels.is_empty() {
            return;
        }
        let payload = event.to_payload();
        for channel in channels {
            self.spawn_send(channel, event_type, payload.clone());
        }
    }

    fn spawn_send(&self, channel: NotificationChannel, event_type: &'static str, payload: Value) {
        let adapter = self.factory.adapter_for(&channel);
        let repo = Arc::clone(&self.repo);
        let clock = self.clock.clone();
        let timeout = self.settings.send_timeout;
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, adapter.send(event_type, &payload)).await;
            let now = clock.now();
            let entry = match result {
                Ok(Ok(())) => NotificationHistoryEntry::sent(channel.id.clone(), event_type, payload, now),
                Ok(Err(e)) => {
                    tracing::warn!(channel = %channel.name, event_type, error = %e, "notification delivery failed");
                    NotificationHistoryEntry::failed(channel.id.clone(), event_type, payload, e.to_string(), now)
                }
                Err(_) => {
                    tracing::warn!(channel = %channel.name, event_type, timeout_s = timeout.as_secs(), "notification delivery timed out");
                    NotificationHistoryEntry::failed(
                        channel.id.clone(),
                        event_type,
                        payload,
                        format!("timed out after {}s", timeout.as_secs()),
                        now,
                    )
                }
            };
            if let Err(e) = repo.record(entry).await {
                tracing::warn!(channel = %channel.name, error = %e, "failed to record notification history");
            }
            if in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
                in_flight.idle.notify_waiters();
            }
        });
    }

    /// The explicit per-channel test operation (§4.6).
    pub async fn send_test(&self, channel_id: &ChannelId) -> (bool, String) {
        match self.repo.get_channel(channel_id).await {
            Ok(Some(channel)) => self.factory.adapter_for(&channel).send_test().await,
            Ok(None) => (false, format!("channel {channel_id} not found")),
            Err(e) => (false, e.to_string()),
        }
    }

    /// Delete history older than the retention window; returns rows removed.
    pub async fn cleanup_history(&self) -> Result<usize, SupervisorError> {
        self.repo.cleanup(self.settings.retention_days, self.clock.now()).await
    }

    /// Best-effort wait for in-flight sends to finish (§5 shutdown step 4).
    /// Returns whether everything drained inside the window.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let idle = self.in_flight.idle.notified();
            if self.in_flight.count.load(Ordering::SeqCst) == 0 {
                return true;
            }
            if tokio::time::timeout_at(deadline, idle).await.is_err() {
                return false;
            }
        }
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
