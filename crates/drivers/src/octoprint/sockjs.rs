// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OctoPrint's `/sockjs/websocket` push channel. A failed or dropped
//! connection here is never fatal — [`super::OctoprintDriver`] falls back
//! to REST polling whenever no cached push update is available.

use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use printernizer_core::{PrinterId, StatusUpdate};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::octoprint::rest;

struct State {
    cached: Option<StatusUpdate>,
    connected: bool,
}

/// Shared handle to a background task streaming `current` messages off
/// OctoPrint's SockJS websocket.
pub(super) struct SockJsHandle {
    state: Arc<Mutex<State>>,
}

impl SockJsHandle {
    pub(super) fn new() -> Self {
        Self { state: Arc::new(Mutex::new(State { cached: None, connected: false })) }
    }

    /// Starts the push listener; swallows connection failures since REST
    /// polling is a fully adequate fallback (§4.1).
    pub(super) async fn connect(&self, base_url: String) {
        let ws_url = base_url.replacen("http", "ws", 1) + "/sockjs/websocket";
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let Ok((ws_stream, _)) = connect_async(ws_url).await else { return };
            state.lock().connected = true;
            let (_, mut read) = ws_stream.split();
            while let Some(Ok(message)) = read.next().await {
                if let Message::Text(text) = message {
                    if let Ok(payload) = serde_json::from_str::<serde_json::Value>(&text) {
                        if let Some(current) = payload.get("current") {
                            let status = current.get("state").cloned().unwrap_or_default();
                            let temps = current.get("temps").and_then(|t| t.as_array()).and_then(|a| a.last()).cloned().unwrap_or_default();
                            let job = current.get("job").cloned().unwrap_or_default();
                            let progress = current.get("progress").cloned().unwrap_or_default();
                            let printer_id = PrinterId::new("sockjs-pending");
                            let update = rest::build_status_update(printer_id, chrono::Utc::now(), &status, &temps, &job, &progress);
                            state.lock().cached = Some(update);
                        }
                    }
                }
            }
            state.lock().connected = false;
        });
    }

    pub(super) async fn disconnect(&self) {
        let mut state = self.state.lock();
        state.connected = false;
        state.cached = None;
    }

    pub(super) async fn cached_status(&self, printer_id: PrinterId) -> Option<StatusUpdate> {
        let state = self.state.lock();
        if !state.connected {
            return None;
        }
        state.cached.clone().map(|mut update| {
            update.printer_id = printer_id;
            update
        })
    }
}

#[cfg(test)]
#[path = "sockjs_tests.rs"]
mod tests;
