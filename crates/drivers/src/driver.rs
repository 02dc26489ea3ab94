// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uniform driver capability set every vendor protocol hides behind
//! (§4.1). The core never inspects raw MQTT/HTTP; it only calls these
//! methods.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use printernizer_core::DriverError;
use printernizer_core::StatusUpdate;

/// A file as reported by `list_files()`, before it's handed to the library
/// service for content-addressed ingest (§4.5).
#[derive(Debug, Clone, PartialEq)]
pub struct PrinterFile {
    pub name: String,
    pub path: String,
    pub size_bytes: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// The printer's own view of its current job, independent of anything the
/// job service has recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct JobInfo {
    pub name: String,
    pub progress_percent: Option<u8>,
    pub started_at: Option<DateTime<Utc>>,
}

/// A vendor protocol wrapped behind a uniform capability set. One instance
/// is owned by exactly one [monitor](crate) for its whole lifetime — no
/// external concurrent access (§5).
#[async_trait]
pub trait PrinterDriver: Send + Sync {
    /// Idempotent: calling on an already-connected driver returns `Ok`
    /// without side effects.
    async fn connect(&self) -> Result<(), DriverError>;

    /// Must suppress auto-reconnect and release resources on all exit
    /// paths, even ones reached through an error (§5 shutdown sequence).
    async fn disconnect(&self);

    /// Never blocks longer than `deadline`; returns the last-known state if
    /// a refresh is already in flight rather than waiting for it.
    async fn get_status(&self, deadline: Duration) -> Result<StatusUpdate, DriverError>;

    /// The printer's own idea of its current job, if any.
    async fn get_job(&self) -> Result<Option<JobInfo>, DriverError>;

    /// Tries listing strategies in priority order; first success wins, all
    /// failures are aggregated into one `AllStrategiesFailed` (§4.1).
    async fn list_files(&self) -> Result<Vec<PrinterFile>, DriverError>;

    async fn download_file(&self, remote_name: &str, local_path: &std::path::Path) -> Result<(), DriverError>;

    async fn pause(&self) -> Result<(), DriverError>;
    async fn resume(&self) -> Result<(), DriverError>;
    async fn stop(&self) -> Result<(), DriverError>;

    fn has_camera(&self) -> bool;
    async fn snapshot(&self) -> Result<Option<Vec<u8>>, DriverError>;
}

pub type Strategy<'a, T> = (&'static str, std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, DriverError>> + Send + 'a>>);

/// Runs listing/download strategies in priority order; the first `Ok` wins.
/// All failures are aggregated so the caller sees every attempted path.
pub async fn first_success<T>(strategies: Vec<Strategy<'_, T>>) -> Result<T, DriverError> {
    let mut failures = Vec::new();
    for (name, strategy) in strategies {
        match strategy.await {
            Ok(value) => return Ok(value),
            Err(e) => failures.push(format!("{name}: {e}")),
        }
    }
    Err(DriverError::AllStrategiesFailed(failures))
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
