// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bambu Lab driver (§4.1): MQTT over TLS for telemetry and commands,
//! FTP over implicit TLS for the `/cache` file listing fallback.

mod ftp;
mod parsing;
pub mod reconnect;
mod tls;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use printernizer_core::{DriverError, PrinterId, StatusUpdate};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, Transport};
use serde_json::Value;
use tokio::sync::Notify;

use crate::driver::{first_success, JobInfo, PrinterDriver, PrinterFile, Strategy};
use reconnect::{ReconnectDecision, ReconnectPolicy, ReconnectState};

const MQTT_PORT: u16 = 8883;
const KEEPALIVE_SECS: u64 = 60;

/// Listing entries and telemetry job names are bare filenames; the FTP
/// endpoint wants them rooted under `/cache`.
fn cache_path(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/cache/{name}")
    }
}

struct Shared {
    latest: Mutex<Option<StatusUpdate>>,
    notify: Notify,
    reconnect: Mutex<ReconnectState>,
}

/// One Bambu Lab printer, addressed by its LAN IP, access code (printed on
/// the printer's screen), and serial number used in the MQTT topic names.
pub struct BambuDriver {
    printer_id: PrinterId,
    host: String,
    access_code: String,
    serial: String,
    client: Mutex<Option<AsyncClient>>,
    shared: Arc<Shared>,
}

impl BambuDriver {
    pub fn new(printer_id: PrinterId, host: impl Into<String>, access_code: impl Into<String>, serial: impl Into<String>) -> Self {
        Self::with_reconnect_policy(printer_id, host, access_code, serial, ReconnectPolicy::default())
    }

    pub fn with_reconnect_policy(
        printer_id: PrinterId,
        host: impl Into<String>,
        access_code: impl Into<String>,
        serial: impl Into<String>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            printer_id,
            host: host.into(),
            access_code: access_code.into(),
            serial: serial.into(),
            client: Mutex::new(None),
            shared: Arc::new(Shared {
                latest: Mutex::new(None),
                notify: Notify::new(),
                reconnect: Mutex::new(ReconnectState::new(policy)),
            }),
        }
    }

    fn request_topic(&self) -> String {
        format!("device/{}/request", self.serial)
    }

    fn report_topic(&self) -> String {
        format!("device/{}/report", self.serial)
    }

    async fn publish_command(&self, payload: Value) -> Result<(), DriverError> {
        let guard = self.client.lock();
        let client = guard.as_ref().ok_or_else(|| DriverError::Connection("not connected".to_string()))?.clone();
        drop(guard);
        client
            .publish(self.request_topic(), QoS::AtMostOnce, false, payload.to_string())
            .await
            .map_err(|e| DriverError::Connection(format!("mqtt publish: {e}")))
    }
}

#[async_trait]
impl PrinterDriver for BambuDriver {
    async fn connect(&self) -> Result<(), DriverError> {
        if self.client.lock().is_some() {
            return Ok(());
        }

        let mut opts = MqttOptions::new(format!("printernizer-{}", self.serial), self.host.clone(), MQTT_PORT);
        opts.set_credentials("bblp", &self.access_code);
        opts.set_keep_alive(Duration::from_secs(KEEPALIVE_SECS));
        opts.set_transport(Transport::Tls(rumqttc::TlsConfiguration::Rustls(Arc::new(tls::client_config()))));

        let (client, mut eventloop) = AsyncClient::new(opts, 16);
        let report_topic = self.report_topic();
        let printer_id = self.printer_id.clone();
        let shared = Arc::clone(&self.shared);
        let sub_topic = report_topic.clone();
        let sub_client = client.clone();

        shared.reconnect.lock().on_connecting();

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        shared.reconnect.lock().on_connected();
                        let _ = sub_client.subscribe(&sub_topic, QoS::AtMostOnce).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        if let Ok(report) = serde_json::from_slice::<Value>(&publish.payload) {
                            if let Some(update) = parsing::parse_report(printer_id.clone(), &report) {
                                *shared.latest.lock() = Some(update);
                                shared.notify.notify_waiters();
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let decision = shared.reconnect.lock().on_connection_lost(Utc::now());
                        match decision {
                            ReconnectDecision::Suppressed => {
                                shared.reconnect.lock().on_closed();
                                break;
                            }
                            ReconnectDecision::Schedule { delay } => {
                                tracing::warn!(printer_id = %printer_id, error = %e, delay_s = delay.as_secs(), "mqtt connection lost, reconnect scheduled");
                                tokio::time::sleep(delay).await;
                                shared.reconnect.lock().on_attempt(Utc::now());
                            }
                            ReconnectDecision::CooldownActive { remaining } => {
                                tracing::info!(printer_id = %printer_id, remaining_ms = remaining.as_millis() as u64, "reconnect cooldown active");
                                tokio::time::sleep(remaining).await;
                                shared.reconnect.lock().on_attempt(Utc::now());
                            }
                        }
                    }
                }
            }
        });

        *self.client.lock() = Some(client);
        Ok(())
    }

    async fn disconnect(&self) {
        // Clear the reconnect flag before touching the transport so the event
        // loop reads the resulting error as intentional and exits.
        self.shared.reconnect.lock().begin_disconnect();
        if let Some(client) = self.client.lock().take() {
            let _ = client.disconnect().await;
        }
        *self.shared.latest.lock() = None;
    }

    async fn get_status(&self, deadline: Duration) -> Result<StatusUpdate, DriverError> {
        if let Some(update) = self.shared.latest.lock().clone() {
            return Ok(update);
        }
        let notified = self.shared.notify.notified();
        tokio::select! {
            _ = notified => {}
            _ = tokio::time::sleep(deadline) => {}
        }
        self.shared
            .latest
            .lock()
            .clone()
            .ok_or_else(|| DriverError::Timeout(deadline))
    }

    async fn get_job(&self) -> Result<Option<JobInfo>, DriverError> {
        let update = self.shared.latest.lock().clone();
        Ok(update.and_then(|u| {
            u.current_job_name.map(|name| JobInfo {
                name,
                progress_percent: u.progress_percent,
                started_at: u.started_at,
            })
        }))
    }

    async fn list_files(&self) -> Result<Vec<PrinterFile>, DriverError> {
        let host = self.host.clone();
        let access_code = self.access_code.clone();
        let latest = self.shared.latest.lock().clone();
        let strategies: Vec<Strategy<'_, Vec<PrinterFile>>> = vec![
            (
                "direct_ftp",
                Box::pin(async move { ftp::list_cache_dir(&host, &access_code).await }),
            ),
            (
                // With FTP unreachable, the report telemetry still names the
                // file currently printing.
                "mqtt_inferred",
                Box::pin(async move {
                    let name = latest.and_then(|update| update.current_job_name).ok_or_else(|| {
                        DriverError::Other("no current job in mqtt telemetry to infer files from".to_string())
                    })?;
                    Ok(vec![PrinterFile {
                        path: cache_path(&name),
                        name,
                        size_bytes: None,
                        modified_at: None,
                    }])
                }),
            ),
        ];
        first_success(strategies).await
    }

    async fn download_file(&self, remote_name: &str, local_path: &std::path::Path) -> Result<(), DriverError> {
        let host = self.host.clone();
        let access_code = self.access_code.clone();
        let remote = cache_path(remote_name);
        let strategies: Vec<Strategy<'_, ()>> = vec![(
            "direct_ftp",
            Box::pin(async move { ftp::download(&host, &access_code, &remote, local_path).await }),
        )];
        first_success(strategies).await
    }

    async fn pause(&self) -> Result<(), DriverError> {
        self.publish_command(serde_json::json!({"print": {"sequence_id": "0", "command": "pause"}})).await
    }

    async fn resume(&self) -> Result<(), DriverError> {
        self.publish_command(serde_json::json!({"print": {"sequence_id": "0", "command": "resume"}})).await
    }

    async fn stop(&self) -> Result<(), DriverError> {
        self.publish_command(serde_json::json!({"print": {"sequence_id": "0", "command": "stop"}})).await
    }

    fn has_camera(&self) -> bool {
        true
    }

    async fn snapshot(&self) -> Result<Option<Vec<u8>>, DriverError> {
        // Bambu's camera feed is a proprietary TCP/TLS stream on port 6000,
        // not the report MQTT channel this driver otherwise uses.
        Ok(None)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
