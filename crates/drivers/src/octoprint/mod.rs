// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OctoPrint driver (§4.1): a REST client over `/api/*` for commands and
//! polling, plus an optional SockJS push channel layered on top (non-fatal
//! if it never connects — REST polling alone is a complete driver).

mod rest;
mod sockjs;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use printernizer_core::{DriverError, PrinterId, StatusUpdate};
use reqwest::Client;
use serde_json::Value;

use crate::driver::{JobInfo, PrinterDriver, PrinterFile};

const API_KEY_HEADER: &str = "X-Api-Key";

/// One OctoPrint instance, addressed by its base URL (`http(s)://host[:port]`)
/// and API key (Settings → API in the OctoPrint UI).
pub struct OctoprintDriver {
    printer_id: PrinterId,
    base_url: String,
    api_key: String,
    client: Client,
    sockjs: sockjs::SockJsHandle,
}

impl OctoprintDriver {
    pub fn new(printer_id: PrinterId, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            printer_id,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
            sockjs: sockjs::SockJsHandle::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, DriverError> {
        let response = self
            .client
            .get(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DriverError::Connection(format!("{} returned {}", path, response.status())));
        }
        response.json::<Value>().await.map_err(|e| DriverError::Other(e.to_string()))
    }

    async fn post_job_command(&self, command: &str, action: Option<&str>) -> Result<(), DriverError> {
        let mut body = serde_json::json!({"command": command});
        if let Some(action) = action {
            body["action"] = Value::String(action.to_string());
        }
        let response = self
            .client
            .post(self.url("/api/job"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DriverError::Other(format!("/api/job {command} returned {}", response.status())))
        }
    }
}

#[async_trait]
impl PrinterDriver for OctoprintDriver {
    async fn connect(&self) -> Result<(), DriverError> {
        self.get_json("/api/version").await?;
        self.sockjs.connect(self.base_url.clone()).await;
        Ok(())
    }

    async fn disconnect(&self) {
        self.sockjs.disconnect().await;
    }

    async fn get_status(&self, deadline: Duration) -> Result<StatusUpdate, DriverError> {
        if let Some(cached) = self.sockjs.cached_status(self.printer_id.clone()).await {
            return Ok(cached);
        }
        let fetch = async {
            let printer = self.get_json("/api/printer").await?;
            let job_body = self.get_json("/api/job").await.unwrap_or(Value::Null);
            let state = printer.get("state").cloned().unwrap_or(Value::Null);
            let temps = printer.get("temperature").cloned().unwrap_or(Value::Null);
            let job = job_body.get("job").cloned().unwrap_or(Value::Null);
            let progress = job_body.get("progress").cloned().unwrap_or(Value::Null);
            Ok(rest::build_status_update(self.printer_id.clone(), Utc::now(), &state, &temps, &job, &progress))
        };
        tokio::time::timeout(deadline, fetch).await.unwrap_or(Err(DriverError::Timeout(deadline)))
    }

    async fn get_job(&self) -> Result<Option<JobInfo>, DriverError> {
        let body = self.get_json("/api/job").await?;
        Ok(rest::parse_job_info(&body))
    }

    async fn list_files(&self) -> Result<Vec<PrinterFile>, DriverError> {
        let body = self.get_json("/api/files?recursive=true").await?;
        let mut files = Vec::new();
        if let Some(entries) = body.get("files").and_then(Value::as_array) {
            for entry in entries {
                files.extend(rest::extract_files(entry, "local"));
            }
        }
        Ok(files)
    }

    async fn download_file(&self, remote_name: &str, local_path: &Path) -> Result<(), DriverError> {
        // `remote_name` arrives origin-prefixed from `list_files`
        // ("local/benchy.gcode"), exactly the file-info path shape. The
        // actual bytes live wherever that response's `refs.download` points.
        let info = self.get_json(&format!("/api/files/{remote_name}")).await?;
        let download_url = rest::download_ref(&info)
            .ok_or_else(|| DriverError::Other(format!("{remote_name} has no download ref")))?;
        let url = if download_url.starts_with("http://") || download_url.starts_with("https://") {
            download_url.to_string()
        } else {
            format!("{}{}", self.base_url, download_url)
        };

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DriverError::Other(format!("download returned {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| DriverError::Other(e.to_string()))?;
        tokio::fs::write(local_path, &bytes).await.map_err(|e| DriverError::Other(e.to_string()))
    }

    async fn pause(&self) -> Result<(), DriverError> {
        self.post_job_command("pause", Some("pause")).await
    }

    async fn resume(&self) -> Result<(), DriverError> {
        self.post_job_command("pause", Some("resume")).await
    }

    async fn stop(&self) -> Result<(), DriverError> {
        self.post_job_command("cancel", None).await
    }

    fn has_camera(&self) -> bool {
        // OctoPrint's webcam is an MJPEG stream the supervisor would have to
        // poll separately; no snapshot endpoint exists on the core API.
        false
    }

    async fn snapshot(&self) -> Result<Option<Vec<u8>>, DriverError> {
        Ok(None)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
