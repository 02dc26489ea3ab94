// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-printer polling loop with adaptive backoff (§4.2).
//!
//! One monitor owns one driver for its whole lifetime. Each poll either
//! refreshes the last-seen cache (resetting the interval to base) or grows
//! the interval by the backoff formula in [`printernizer_core::backoff`].
//! Failures also overwrite the cache with an `offline` status so the
//! supervisor's status task sees the degradation on its next pass instead
//! of a stale phase.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use printernizer_core::{backoff, Clock, DriverError, PrinterId, StatusUpdate, SupervisorConfig};
use printernizer_drivers::PrinterDriver;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bus::BoxFuture;

/// Awaited sequentially per printer after every poll; implementations log
/// their own failures and never propagate them.
pub type StatusCallback = Arc<dyn Fn(StatusUpdate) -> BoxFuture + Send + Sync>;

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub base_interval: Duration,
    pub backoff_factor: f64,
    pub max_interval: Duration,
    /// Per-poll deadline on `get_status` (§5's `connection_timeout`).
    pub deadline: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            base_interval: config.printer_polling_interval(),
            backoff_factor: config.monitor_backoff_factor,
            max_interval: config.monitor_max_interval(),
            deadline: config.connection_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MonitorMetrics {
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub last_duration: Option<Duration>,
    pub last_error: Option<String>,
}

pub struct PrinterMonitor<C: Clock> {
    printer_id: PrinterId,
    driver: Arc<dyn PrinterDriver>,
    clock: C,
    settings: MonitorSettings,
    callbacks: Mutex<Vec<StatusCallback>>,
    last_status: Mutex<Option<StatusUpdate>>,
    metrics: Mutex<MonitorMetrics>,
    interval: Mutex<Duration>,
}

/// Cancellation handle for a spawned monitor loop. The cancel signal wins
/// against the in-progress interval wait, so `stop` returns promptly.
pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl MonitorHandle {
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.join.await;
    }
}

impl<C: Clock> PrinterMonitor<C> {
    pub fn new(printer_id: PrinterId, driver: Arc<dyn PrinterDriver>, clock: C, settings: MonitorSettings) -> Arc<Self> {
        let base = settings.base_interval;
        Arc::new(Self {
            printer_id,
            driver,
            clock,
            settings,
            callbacks: Mutex::new(Vec::new()),
            last_status: Mutex::new(None),
            metrics: Mutex::new(MonitorMetrics::default()),
            interval: Mutex::new(base),
        })
    }

    pub fn printer_id(&self) -> &PrinterId {
        &self.printer_id
    }

    pub fn on_status(&self, callback: StatusCallback) {
        self.callbacks.lock().push(callback);
    }

    /// Last observed status, also read by the supervisor's status task in
    /// place of re-invoking the driver (§4.3 Task 1).
    pub fn last_status(&self) -> Option<StatusUpdate> {
        self.last_status.lock().clone()
    }

    pub fn metrics(&self) -> MonitorMetrics {
        self.metrics.lock().clone()
    }

    pub fn current_interval(&self) -> Duration {
        *self.interval.lock()
    }

    /// One poll of the driver. Returns whether the poll succeeded.
    pub async fn poll_once(&self) -> bool {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.settings.deadline, self.driver.get_status(self.settings.deadline)).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout(self.settings.deadline)),
        };

        let (update, success) = match outcome {
            Ok(mut update) => {
                update.clamp_progress();
                self.record_success(started.elapsed());
                *self.last_status.lock() = Some(update.clone());
                (update, true)
            }
            Err(error) => {
                self.record_failure(&error, started.elapsed());
                let offline = StatusUpdate::offline(self.printer_id.clone(), self.clock.now());
                *self.last_status.lock() = Some(offline.clone());
                (offline, false)
            }
        };

        let callbacks = self.callbacks.lock().clone();
        for callback in callbacks {
            callback(update.clone()).await;
        }
        success
    }

    fn record_success(&self, duration: Duration) {
        {
            let mut metrics = self.metrics.lock();
            metrics.consecutive_failures = 0;
            metrics.last_duration = Some(duration);
            metrics.last_error = None;
        }
        let mut interval = self.interval.lock();
        if *interval != self.settings.base_interval {
            tracing::info!(
                printer_id = %self.printer_id,
                interval_ms = self.settings.base_interval.as_millis() as u64,
                "monitoring.backoff.reset"
            );
        }
        *interval = backoff::reset(self.settings.base_interval);
    }

    fn record_failure(&self, error: &DriverError, duration: Duration) {
        let consecutive = {
            let mut metrics = self.metrics.lock();
            metrics.consecutive_failures += 1;
            metrics.total_failures += 1;
            metrics.last_duration = Some(duration);
            metrics.last_error = Some(error.to_string());
            metrics.consecutive_failures
        };
        // §4.2: next = min(current * factor, max), i.e. factor^consecutive
        // over the base once the interval has been reset by a success.
        let next = backoff::next_delay(
            self.settings.base_interval,
            self.settings.backoff_factor,
            self.settings.max_interval,
            consecutive,
            self.jitter_unit(consecutive),
        );
        *self.interval.lock() = next;
        if error.is_retryable() {
            tracing::warn!(
                printer_id = %self.printer_id,
                error = %error,
                consecutive_failures = consecutive,
                next_interval_ms = next.as_millis() as u64,
                "monitoring.backoff"
            );
        } else {
            tracing::error!(
                printer_id = %self.printer_id,
                error = %error,
                "printer poll failed with a non-retryable error; check credentials"
            );
        }
    }

    /// Uniform-ish jitter in [-1, 1] without a dedicated RNG dependency:
    /// the printer id, attempt counter, and wall clock hashed together.
    fn jitter_unit(&self, attempt: u32) -> f64 {
        let mut hasher = DefaultHasher::new();
        self.printer_id.as_str().hash(&mut hasher);
        attempt.hash(&mut hasher);
        self.clock.epoch_ms().hash(&mut hasher);
        let unit = (hasher.finish() % 10_000) as f64 / 10_000.0;
        unit * 2.0 - 1.0
    }

    /// Run the adaptive loop until the handle's cancel signal fires.
    pub fn spawn(self: Arc<Self>) -> MonitorHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let monitor = self;
        let join = tokio::spawn(async move {
            loop {
                let interval = monitor.current_interval();
                tokio::select! {
                    _ = stop_rx.changed() => {}
                    _ = tokio::time::sleep(interval) => {}
                }
                if *stop_rx.borrow() {
                    break;
                }
                monitor.poll_once().await;
            }
            tracing::debug!(printer_id = %monitor.printer_id, "monitor stopped");
        });
        MonitorHandle { stop_tx, join }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
