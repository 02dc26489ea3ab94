// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared backoff formula (§5), reused by the per-printer monitor and the
//! Bambu MQTT reconnect logic.
//!
//! `delay = min(base * factor^attempt, max) * (1 + U(-0.1, +0.1))`, floored
//! to 500ms.

use std::time::Duration;

const JITTER_FRACTION: f64 = 0.1;
const FLOOR_MS: u64 = 500;

/// Compute the next backoff delay for a given failed-attempt count
/// (0-indexed: the first failure passes `attempt = 0`).
///
/// `jitter_unit` is expected in `[-1.0, 1.0]`; callers pass a value drawn
/// from a uniform distribution (production) or a fixed value (tests) so the
/// formula itself stays deterministic and unit-testable.
pub fn next_delay(base: Duration, factor: f64, max: Duration, attempt: u32, jitter_unit: f64) -> Duration {
    let base_ms = base.as_secs_f64() * 1000.0;
    let max_ms = max.as_secs_f64() * 1000.0;
    let grown = base_ms * factor.powi(attempt as i32);
    let capped = grown.min(max_ms);
    let jittered = capped * (1.0 + jitter_unit.clamp(-1.0, 1.0) * JITTER_FRACTION);
    let floored = jittered.max(FLOOR_MS as f64);
    Duration::from_millis(floored.round() as u64)
}

/// Reset interval after a success: always the configured base.
pub fn reset(base: Duration) -> Duration {
    base
}

/// Number of consecutive failures needed before `next_delay` first reaches
/// (and stays at) `max`, given zero jitter. Used by monitor progress tests.
pub fn failures_to_reach_max(base: Duration, factor: f64, max: Duration) -> u32 {
    let base_ms = base.as_secs_f64();
    let max_ms = max.as_secs_f64();
    if base_ms <= 0.0 || factor <= 1.0 {
        return 0;
    }
    let mut attempt = 0u32;
    loop {
        let grown = base_ms * factor.powi(attempt as i32);
        if grown >= max_ms {
            return attempt + 1;
        }
        attempt += 1;
        if attempt > 1000 {
            return attempt;
        }
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
