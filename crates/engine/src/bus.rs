// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed pub/sub fan-out (§4.3, §5).
//!
//! `emit` enqueues the event onto every subscriber's own bounded queue
//! before returning, so delivery is per-event ordered: all subscribers see
//! event N enqueued before any sees N+1. Each subscriber drains its queue on
//! a dedicated task, so a slow handler delays only itself. Past the
//! high-water mark the oldest queued event is dropped with a warning rather
//! than blocking the emitter.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use printernizer_core::Event;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One subscriber callback. Handlers log their own failures; nothing they do
/// propagates back to the emitter (§4.3).
pub type EventHandler = Arc<dyn Fn(Event) -> BoxFuture + Send + Sync>;

/// Default per-subscriber queue bound before the oldest event is dropped.
pub const DEFAULT_HIGH_WATER: usize = 256;

struct SubscriberQueue {
    name: String,
    queue: Mutex<VecDeque<Event>>,
    wake: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
}

/// Depth and drop count for one subscriber, surfaced by health checks.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriberStats {
    pub name: String,
    pub queued: usize,
    pub dropped: u64,
}

struct BusInner {
    subscribers: Mutex<Vec<Arc<SubscriberQueue>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    high_water: usize,
}

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_high_water(DEFAULT_HIGH_WATER)
    }

    pub fn with_high_water(high_water: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(Vec::new()),
                workers: Mutex::new(Vec::new()),
                high_water: high_water.max(1),
            }),
        }
    }

    /// Register a handler. Handlers registered earlier are enqueued-to
    /// earlier on each emit, but drain independently.
    pub fn subscribe(&self, name: impl Into<String>, handler: EventHandler) {
        let sub = Arc::new(SubscriberQueue {
            name: name.into(),
            queue: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        });
        self.inner.subscribers.lock().push(Arc::clone(&sub));

        let worker = tokio::spawn(async move {
            loop {
                let next = sub.queue.lock().pop_front();
                match next {
                    Some(event) => handler(event).await,
                    None => {
                        if sub.closed.load(Ordering::SeqCst) {
                            break;
                        }
                        sub.wake.notified().await;
                    }
                }
            }
        });
        self.inner.workers.lock().push(worker);
    }

    /// Enqueue `event` for every current subscriber. Never blocks and never
    /// fails; overflowing subscribers lose their oldest queued event.
    pub fn emit(&self, event: Event) {
        let subscribers = self.inner.subscribers.lock().clone();
        for sub in subscribers {
            {
                let mut queue = sub.queue.lock();
                if queue.len() >= self.inner.high_water {
                    queue.pop_front();
                    let dropped = sub.dropped.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::warn!(
                        subscriber = %sub.name,
                        dropped_total = dropped,
                        "subscriber queue over high-water mark, dropping oldest event"
                    );
                }
                queue.push_back(event.clone());
            }
            sub.wake.notify_one();
        }
    }

    pub fn stats(&self) -> Vec<SubscriberStats> {
        self.inner
            .subscribers
            .lock()
            .iter()
            .map(|sub| SubscriberStats {
                name: sub.name.clone(),
                queued: sub.queue.lock().len(),
                dropped: sub.dropped.load(Ordering::SeqCst),
            })
            .collect()
    }

    /// Stop all subscriber workers after letting them drain, waiting at most
    /// `drain_timeout` overall. Workers still running at the deadline are
    /// aborted.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        for sub in self.inner.subscribers.lock().iter() {
            sub.closed.store(true, Ordering::SeqCst);
            sub.wake.notify_one();
        }
        let workers = std::mem::take(&mut *self.inner.workers.lock());
        let deadline = tokio::time::Instant::now() + drain_timeout;
        for mut worker in workers {
            if tokio::time::timeout_at(deadline, &mut worker).await.is_err() {
                worker.abort();
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
