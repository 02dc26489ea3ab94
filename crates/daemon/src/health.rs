// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health reporting for the running daemon: fleet state per printer plus
//! bus subscriber depths. Serialized as JSON into the periodic health log
//! line (and by whatever API surface fronts this daemon).

use printernizer_engine::bus::SubscriberStats;
use printernizer_engine::FleetHealth;

use crate::lifecycle::Daemon;

#[derive(Debug, Clone, serde::Serialize)]
pub struct DaemonHealth {
    pub uptime_s: u64,
    pub fleet: FleetHealth,
    pub bus: Vec<SubscriberStats>,
}

pub fn collect(daemon: &Daemon) -> DaemonHealth {
    DaemonHealth {
        uptime_s: daemon.started_at.elapsed().as_secs(),
        fleet: daemon.supervisor.health(),
        bus: daemon.bus.stats(),
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
