// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake [`PrinterDriver`] for monitor/supervisor tests: scripted status
//! sequence, no network, every call recorded.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use printernizer_core::{DriverError, StatusUpdate};

use crate::driver::{JobInfo, PrinterDriver, PrinterFile};

struct FakeDriverState {
    connected: bool,
    statuses: Vec<StatusUpdate>,
    status_index: usize,
    job: Option<JobInfo>,
    files: Vec<PrinterFile>,
    calls: Vec<&'static str>,
    fail_connect: bool,
    fail_status: bool,
}

/// Scripted driver: `statuses` is replayed in order, repeating the last
/// entry once exhausted so a monitor loop never runs out of telemetry.
#[derive(Clone)]
pub struct FakePrinterDriver {
    inner: Arc<Mutex<FakeDriverState>>,
    has_camera: bool,
}

impl FakePrinterDriver {
    pub fn new(statuses: Vec<StatusUpdate>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeDriverState {
                connected: false,
                statuses,
                status_index: 0,
                job: None,
                files: Vec::new(),
                calls: Vec::new(),
                fail_connect: false,
                fail_status: false,
            })),
            has_camera: false,
        }
    }

    pub fn with_camera(mut self) -> Self {
        self.has_camera = true;
        self
    }

    pub fn set_job(&self, job: Option<JobInfo>) {
        self.inner.lock().job = job;
    }

    pub fn set_files(&self, files: Vec<PrinterFile>) {
        self.inner.lock().files = files;
    }

    pub fn fail_connect_next(&self) {
        self.inner.lock().fail_connect = true;
    }

    pub fn fail_status_next(&self) {
        self.inner.lock().fail_status = true;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.inner.lock().calls.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }
}

#[async_trait]
impl PrinterDriver for FakePrinterDriver {
    async fn connect(&self) -> Result<(), DriverError> {
        let mut state = self.inner.lock();
        state.calls.push("connect");
        if state.fail_connect {
            state.fail_connect = false;
            return Err(DriverError::Connection("fake connect failure".to_string()));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = self.inner.lock();
        state.calls.push("disconnect");
        state.connected = false;
    }

    async fn get_status(&self, _deadline: Duration) -> Result<StatusUpdate, DriverError> {
        let mut state = self.inner.lock();
        state.calls.push("get_status");
        if state.fail_status {
            state.fail_status = false;
            return Err(DriverError::Timeout(Duration::from_secs(1)));
        }
        if state.statuses.is_empty() {
            return Err(DriverError::Connection("no scripted status".to_string()));
        }
        let idx = state.status_index.min(state.statuses.len() - 1);
        let status = state.statuses[idx].clone();
        if state.status_index < state.statuses.len() - 1 {
            state.status_index += 1;
        }
        Ok(status)
    }

    async fn get_job(&self) -> Result<Option<JobInfo>, DriverError> {
        let mut state = self.inner.lock();
        state.calls.push("get_job");
        Ok(state.job.clone())
    }

    async fn list_files(&self) -> Result<Vec<PrinterFile>, DriverError> {
        let mut state = self.inner.lock();
        state.calls.push("list_files");
        Ok(state.files.clone())
    }

    async fn download_file(&self, _remote_name: &str, _local_path: &Path) -> Result<(), DriverError> {
        self.inner.lock().calls.push("download_file");
        Ok(())
    }

    async fn pause(&self) -> Result<(), DriverError> {
        self.inner.lock().calls.push("pause");
        Ok(())
    }

    async fn resume(&self) -> Result<(), DriverError> {
        self.inner.lock().calls.push("resume");
        Ok(())
    }

    async fn stop(&self) -> Result<(), DriverError> {
        self.inner.lock().calls.push("stop");
        Ok(())
    }

    fn has_camera(&self) -> bool {
        self.has_camera
    }

    async fn snapshot(&self) -> Result<Option<Vec<u8>>, DriverError> {
        self.inner.lock().calls.push("snapshot");
        if self.has_camera {
            Ok(Some(vec![0xFF, 0xD8, 0xFF]))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
