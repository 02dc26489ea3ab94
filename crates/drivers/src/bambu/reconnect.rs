// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-reconnect state machine for the MQTT link (§4.1, §5).
//!
//! The connection walks `disconnected → connecting → connected`, dropping
//! into `reconnecting` on an unexpected broker loss. Two pieces of extra
//! state prevent reconnect storms when a broker flaps: `should_reconnect`
//! (cleared by [`ReconnectState::begin_disconnect`] *before* the transport
//! closes, so an intentional disconnect never races a reconnect) and
//! `last_attempt_at` (a wall-clock cooldown between attempts).
//!
//! The machine is pure: every method takes `now` explicitly, so the driver's
//! event loop feeds it real time while tests feed it scripted instants.

use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Disconnecting,
}

/// What the event loop should do after an unexpected connection loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Sleep `delay`, then call [`ReconnectState::on_attempt`] and retry.
    Schedule { delay: Duration },
    /// A recent attempt is still inside the cooldown window. Sleep the
    /// remainder, then attempt without the extra scheduling delay.
    CooldownActive { remaining: Duration },
    /// `disconnect()` was requested; stop the loop and release the transport.
    Suppressed,
}

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Pause between noticing a drop and the reconnect attempt
    /// (`mqtt_auto_reconnect_delay`, default 5s).
    pub auto_reconnect_delay: Duration,
    /// Minimum wall-clock gap between attempts (`mqtt_reconnect_cooldown`,
    /// default 10s).
    pub cooldown: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            auto_reconnect_delay: Duration::from_secs(5),
            cooldown: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
pub struct ReconnectState {
    policy: ReconnectPolicy,
    state: ConnectionState,
    should_reconnect: bool,
    last_attempt_at: Option<DateTime<Utc>>,
}

impl ReconnectState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            should_reconnect: false,
            last_attempt_at: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn on_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// Broker acknowledged the connection; from here on, unexpected drops
    /// trigger reconnects until `begin_disconnect` clears the flag.
    pub fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.should_reconnect = true;
    }

    /// Must be called *before* closing the transport (§5 shutdown sequence),
    /// so the event loop's next error is read as intentional.
    pub fn begin_disconnect(&mut self) {
        self.should_reconnect = false;
        self.state = ConnectionState::Disconnecting;
    }

    pub fn on_closed(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// The transport dropped without a `begin_disconnect`. Decides whether a
    /// reconnect is scheduled, deferred behind the cooldown, or suppressed.
    pub fn on_connection_lost(&mut self, now: DateTime<Utc>) -> ReconnectDecision {
        if !self.should_reconnect {
            self.state = ConnectionState::Disconnected;
            return ReconnectDecision::Suppressed;
        }
        self.state = ConnectionState::Reconnecting;
        if let Some(last) = self.last_attempt_at {
            let since = (now - last).to_std().unwrap_or(Duration::ZERO);
            if since < self.policy.cooldown {
                return ReconnectDecision::CooldownActive {
                    remaining: self.policy.cooldown - since,
                };
            }
        }
        ReconnectDecision::Schedule {
            delay: self.policy.auto_reconnect_delay,
        }
    }

    /// A reconnect attempt is actually starting now. Stamps the cooldown
    /// clock — only real attempts count, never the initial `connect()`.
    pub fn on_attempt(&mut self, now: DateTime<Utc>) {
        self.last_attempt_at = Some(now);
        self.state = ConnectionState::Connecting;
    }
}

#[cfg(test)]
#[path = "reconnect_tests.rs"]
mod tests;
