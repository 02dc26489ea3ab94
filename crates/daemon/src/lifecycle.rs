// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: build the repository set, services, and supervisor;
//! start everything in dependency order; tear it down in reverse (§5
//! shutdown sequence).

use std::sync::Arc;
use std::time::{Duration, Instant};

use printernizer_core::printer::PrinterType;
use printernizer_core::{Printer, SupervisorConfig, SupervisorError, SystemClock, UuidIdGen};
use printernizer_drivers::bambu::reconnect::ReconnectPolicy;
use printernizer_drivers::{BambuDriver, OctoprintDriver, PrinterDriver};
use printernizer_engine::{
    DispatcherSettings, EventBus, FleetSupervisor, JobService, LibraryService, NotificationDispatcher, UsageRecorder,
    WebhookAdapterFactory,
};
use printernizer_storage::{
    InMemoryJobRepository, InMemoryLibraryRepository, InMemoryNotificationRepository, InMemoryPrinterRepository,
    InMemoryUsageStatisticsRepository, JobRepository, LibraryRepository, NotificationRepository, PrinterRepository,
    UsageStatisticsRepository,
};
use tracing::{info, warn};

use crate::fleet::FleetConfig;

/// How long shutdown waits for in-flight notification sends (§5 step 4).
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
/// How long shutdown waits for bus subscribers to drain their queues.
const BUS_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// The running daemon: the supervisor plus everything shutdown needs to
/// reach directly.
pub struct Daemon {
    pub supervisor: Arc<FleetSupervisor<SystemClock, UuidIdGen>>,
    pub dispatcher: Arc<NotificationDispatcher<SystemClock>>,
    pub bus: EventBus,
    pub started_at: Instant,
}

/// Construct the vendor driver for one configured printer (§4.1).
pub fn build_driver(printer: &Printer, config: &SupervisorConfig) -> Result<Arc<dyn PrinterDriver>, SupervisorError> {
    let endpoint = &printer.endpoint;
    match printer.printer_type {
        PrinterType::BambuLab => {
            let access_code = endpoint
                .access_code
                .clone()
                .ok_or_else(|| SupervisorError::Config(format!("printer {} requires access_code", printer.id)))?;
            let serial = endpoint
                .serial
                .clone()
                .ok_or_else(|| SupervisorError::Config(format!("printer {} requires serial", printer.id)))?;
            let policy = ReconnectPolicy {
                auto_reconnect_delay: config.mqtt_auto_reconnect_delay(),
                cooldown: config.mqtt_reconnect_cooldown(),
            };
            Ok(Arc::new(BambuDriver::with_reconnect_policy(
                printer.id.clone(),
                endpoint.host.clone(),
                access_code,
                serial,
                policy,
            )))
        }
        // Prusa's bundled web stack exposes the OctoPrint-compatible API.
        PrinterType::OctoPrint | PrinterType::Prusa => {
            let api_key = endpoint
                .api_key
                .clone()
                .ok_or_else(|| SupervisorError::Config(format!("printer {} requires api_key", printer.id)))?;
            let base_url = match endpoint.port {
                Some(port) => format!("http://{}:{port}", endpoint.host),
                None => format!("http://{}", endpoint.host),
            };
            Ok(Arc::new(OctoprintDriver::new(printer.id.clone(), base_url, api_key)))
        }
    }
}

/// Bring the whole supervisor up: repositories, bus, services, handler
/// registrations, drivers, monitors, background tasks.
pub async fn startup(fleet: FleetConfig) -> Result<Daemon, SupervisorError> {
    let clock = SystemClock;
    let config = fleet.supervisor.clone();
    let bus = EventBus::new();

    let printers_repo: Arc<dyn PrinterRepository> = Arc::new(InMemoryPrinterRepository::new());
    let jobs_repo: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let library_repo: Arc<dyn LibraryRepository> = Arc::new(InMemoryLibraryRepository::new());
    let notification_repo: Arc<dyn NotificationRepository> = Arc::new(InMemoryNotificationRepository::new());
    let usage_repo: Arc<dyn UsageStatisticsRepository> = Arc::new(InMemoryUsageStatisticsRepository::new());

    let jobs = JobService::new(
        Arc::clone(&jobs_repo),
        bus.clone(),
        clock,
        UuidIdGen,
        config.job_creation_auto_create,
    );
    let library = LibraryService::new(library_repo, clock, &config);

    // Bus consumers register before any driver can produce an event.
    let dispatcher = NotificationDispatcher::new(
        notification_repo,
        Arc::new(WebhookAdapterFactory),
        clock,
        DispatcherSettings::from_config(&config),
    );
    Arc::clone(&dispatcher).register(&bus);
    let usage = UsageRecorder::new(usage_repo, clock, UuidIdGen);
    usage.register(&bus);

    let supervisor = FleetSupervisor::new(
        config.clone(),
        clock,
        bus.clone(),
        printers_repo,
        jobs_repo,
        jobs,
        library,
        fleet.watch_folders.clone(),
    );
    for decl in &fleet.printers {
        let printer = decl.to_printer();
        let driver = build_driver(&printer, &config)?;
        info!(printer_id = %printer.id, printer_type = %printer.printer_type, "registering printer");
        supervisor.add_printer(printer, driver).await?;
    }
    Arc::clone(&supervisor).start().await;

    Ok(Daemon {
        supervisor,
        dispatcher,
        bus,
        started_at: Instant::now(),
    })
}

/// §5 shutdown sequence: supervisor tasks and monitors, driver disconnects,
/// notification drain, then the bus workers.
pub async fn shutdown(daemon: &Daemon) {
    daemon.supervisor.shutdown().await;
    if !daemon.dispatcher.drain(NOTIFICATION_DRAIN_TIMEOUT).await {
        warn!("notification dispatcher did not drain before the deadline");
    }
    daemon.bus.shutdown(BUS_DRAIN_TIMEOUT).await;
    info!("daemon stopped");
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
