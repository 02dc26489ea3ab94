// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage event recorder: an append-only local record of selected bus events.
//!
//! Insert failures are logged at debug and dropped — telemetry must never
//! affect a foreground path. Submission of recorded events elsewhere is an
//! external collaborator's job; this module only appends.

use std::sync::Arc;

use printernizer_core::job::JobStatus;
use printernizer_core::{Clock, Event, IdGen, UsageEvent, UsageEventId};
use printernizer_storage::UsageStatisticsRepository;

use crate::bus::EventBus;

pub struct UsageRecorder<C: Clock, G: IdGen> {
    repo: Arc<dyn UsageStatisticsRepository>,
    clock: C,
    ids: G,
}

impl<C: Clock, G: IdGen> UsageRecorder<C, G> {
    pub fn new(repo: Arc<dyn UsageStatisticsRepository>, clock: C, ids: G) -> Arc<Self> {
        Arc::new(Self { repo, clock, ids })
    }

    pub fn register(self: Arc<Self>, bus: &EventBus) {
        let recorder = self;
        bus.subscribe(
            "usage_recorder",
            Arc::new(move |event| {
                let recorder = Arc::clone(&recorder);
                Box::pin(async move {
                    recorder.record(&event).await;
                })
            }),
        );
    }

    /// Which bus events are recorded, and under which usage event type.
    fn recorded_event_type(event: &Event) -> Option<&'static str> {
        match event {
            Event::JobCompleted { .. } => Some("job_completed"),
            Event::JobStatusChanged { new_status: JobStatus::Failed, .. } => Some("job_failed"),
            Event::PrinterConnected { .. } => Some("printer_connected"),
            Event::PrinterDisconnected { .. } => Some("printer_disconnected"),
            _ => None,
        }
    }

    pub async fn record(&self, event: &Event) {
        let Some(event_type) = Self::recorded_event_type(event) else {
            return;
        };
        let usage = UsageEvent::new(
            UsageEventId::new(self.ids.next()),
            event_type,
            event.to_payload(),
            self.clock.now(),
        );
        if let Err(e) = self.repo.insert_event(usage).await {
            tracing::debug!(event_type, error = %e, "usage event dropped");
        }
    }
}

#[cfg(test)]
#[path = "usage_recorder_tests.rs"]
mod tests;
