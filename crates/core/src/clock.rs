// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time source abstraction.
//!
//! Every timestamp the supervisor produces goes through a [`Clock`] so that
//! backoff timing, reconnect cooldowns, and job timestamps are deterministic
//! under test.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Abstracts "now" so monitors, drivers, and services never call
/// `Utc::now()` directly.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as Unix epoch milliseconds.
    fn epoch_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock holding an explicit, advanceable instant.
///
/// Starts at the Unix epoch unless constructed with [`FakeClock::at`].
#[derive(Debug, Clone)]
pub struct FakeClock {
    epoch_ms: std::sync::Arc<AtomicI64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            epoch_ms: std::sync::Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn at(epoch_ms: i64) -> Self {
        Self {
            epoch_ms: std::sync::Arc::new(AtomicI64::new(epoch_ms)),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance_ms(&self, delta_ms: i64) {
        self.epoch_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.advance_ms(delta.num_milliseconds());
    }

    pub fn set(&self, epoch_ms: i64) {
        self.epoch_ms.store(epoch_ms, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.epoch_ms.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }

    fn epoch_ms(&self) -> i64 {
        self.epoch_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
