// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recognized configuration keys (§6) and their defaults.
//!
//! Loading this struct from a file or environment is an external
//! collaborator's job; this module only owns the shape and the defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_polling_interval_s() -> u64 {
    30
}
fn default_backoff_factor() -> f64 {
    2.0
}
fn default_max_interval_s() -> u64 {
    600
}
fn default_connection_timeout_s() -> u64 {
    30
}
fn default_max_concurrent_downloads() -> usize {
    5
}
fn default_mqtt_retry_count() -> u32 {
    5
}
fn default_mqtt_retry_delay_s() -> u64 {
    1
}
fn default_mqtt_retry_max_delay_s() -> u64 {
    60
}
fn default_mqtt_auto_reconnect_delay_s() -> u64 {
    5
}
fn default_mqtt_reconnect_cooldown_s() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_checksum_algorithm() -> String {
    "sha256".to_string()
}
fn default_library_path() -> PathBuf {
    PathBuf::from("./library")
}
fn default_notification_history_retention_days() -> u32 {
    30
}

/// Minimum allowed `printer_polling_interval`, per §6.
pub const MIN_POLLING_INTERVAL_S: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_polling_interval_s")]
    pub printer_polling_interval_s: u64,
    #[serde(default = "default_backoff_factor")]
    pub monitor_backoff_factor: f64,
    #[serde(default = "default_max_interval_s")]
    pub monitor_max_interval_s: u64,
    #[serde(default = "default_connection_timeout_s")]
    pub connection_timeout_s: u64,
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
    #[serde(default = "default_mqtt_retry_count")]
    pub mqtt_retry_count: u32,
    #[serde(default = "default_mqtt_retry_delay_s")]
    pub mqtt_retry_delay_s: u64,
    #[serde(default = "default_mqtt_retry_max_delay_s")]
    pub mqtt_retry_max_delay_s: u64,
    #[serde(default = "default_mqtt_auto_reconnect_delay_s")]
    pub mqtt_auto_reconnect_delay_s: u64,
    #[serde(default = "default_mqtt_reconnect_cooldown_s")]
    pub mqtt_reconnect_cooldown_s: u64,
    #[serde(default = "default_true")]
    pub job_creation_auto_create: bool,
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,
    #[serde(default = "default_checksum_algorithm")]
    pub library_checksum_algorithm: String,
    #[serde(default = "default_true")]
    pub library_auto_deduplicate: bool,
    #[serde(default = "default_true")]
    pub library_preserve_originals: bool,
    #[serde(default = "default_notification_history_retention_days")]
    pub notification_history_retention_days: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            printer_polling_interval_s: default_polling_interval_s(),
            monitor_backoff_factor: default_backoff_factor(),
            monitor_max_interval_s: default_max_interval_s(),
            connection_timeout_s: default_connection_timeout_s(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            mqtt_retry_count: default_mqtt_retry_count(),
            mqtt_retry_delay_s: default_mqtt_retry_delay_s(),
            mqtt_retry_max_delay_s: default_mqtt_retry_max_delay_s(),
            mqtt_auto_reconnect_delay_s: default_mqtt_auto_reconnect_delay_s(),
            mqtt_reconnect_cooldown_s: default_mqtt_reconnect_cooldown_s(),
            job_creation_auto_create: true,
            library_path: PathBuf::from("./library"),
            library_checksum_algorithm: default_checksum_algorithm(),
            library_auto_deduplicate: true,
            library_preserve_originals: true,
            notification_history_retention_days: default_notification_history_retention_days(),
        }
    }
}

impl SupervisorConfig {
    /// `printer_polling_interval`, clamped to the §6 minimum of 5s.
    pub fn printer_polling_interval(&self) -> Duration {
        Duration::from_secs(self.printer_polling_interval_s.max(MIN_POLLING_INTERVAL_S))
    }

    pub fn monitor_max_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_max_interval_s)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_s)
    }

    pub fn mqtt_retry_delay(&self) -> Duration {
        Duration::from_secs(self.mqtt_retry_delay_s)
    }

    pub fn mqtt_retry_max_delay(&self) -> Duration {
        Duration::from_secs(self.mqtt_retry_max_delay_s)
    }

    pub fn mqtt_auto_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.mqtt_auto_reconnect_delay_s)
    }

    pub fn mqtt_reconnect_cooldown(&self) -> Duration {
        Duration::from_secs(self.mqtt_reconnect_cooldown_s)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
