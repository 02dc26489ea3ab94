// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet supervisor (§4.3): owns the driver set and the three long-lived
//! background tasks (printer status fan-out, job tracking, file discovery).
//!
//! Each task body is a public `*_tick` method so tests drive cycles
//! directly; the spawned loops only add pacing, failure backoff, and the
//! shutdown signal. Shutdown ordering follows §5: tasks, then monitors,
//! then driver disconnects.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use printernizer_core::job::JobStatus;
use printernizer_core::printer::PrinterFilter;
use printernizer_core::status::Phase;
use printernizer_core::{Clock, Event, IdGen, JobId, Printer, PrinterId, StatusUpdate, SupervisorConfig, SupervisorError};
use printernizer_drivers::PrinterDriver;
use printernizer_storage::{JobFilter, JobRepository, PrinterRepository};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bus::EventBus;
use crate::job_service::JobService;
use crate::library_service::LibraryService;
use crate::monitor::{MonitorHandle, MonitorSettings, PrinterMonitor};

pub const PRINTER_STATUS_INTERVAL: Duration = Duration::from_secs(30);
pub const PRINTER_STATUS_FAILURE_BACKOFF: Duration = Duration::from_secs(60);
pub const JOB_STATUS_INTERVAL: Duration = Duration::from_secs(10);
pub const FILE_DISCOVERY_INTERVAL: Duration = Duration::from_secs(300);
pub const FILE_DISCOVERY_FAILURE_BACKOFF: Duration = Duration::from_secs(600);

/// Upper bound on jobs examined per tracking pass.
const JOB_SCAN_LIMIT: usize = 10_000;

struct FleetEntry<C: Clock> {
    driver: Arc<dyn PrinterDriver>,
    monitor: Arc<PrinterMonitor<C>>,
    handle: Option<MonitorHandle>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PrinterHealth {
    pub printer_id: PrinterId,
    pub phase: Option<Phase>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FleetHealth {
    pub printers: Vec<PrinterHealth>,
    pub tracked_jobs: usize,
    pub background_tasks: usize,
}

pub struct FleetSupervisor<C: Clock, G: IdGen> {
    config: SupervisorConfig,
    clock: C,
    bus: EventBus,
    printers: Arc<dyn PrinterRepository>,
    jobs_repo: Arc<dyn JobRepository>,
    jobs: Arc<JobService<C, G>>,
    library: Arc<LibraryService<C>>,
    watch_folders: Vec<PathBuf>,
    fleet: Mutex<HashMap<PrinterId, FleetEntry<C>>>,
    last_phase: Mutex<HashMap<PrinterId, Phase>>,
    tracked: Mutex<HashMap<JobId, (JobStatus, u8)>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock, G: IdGen + 'static> FleetSupervisor<C, G> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SupervisorConfig,
        clock: C,
        bus: EventBus,
        printers: Arc<dyn PrinterRepository>,
        jobs_repo: Arc<dyn JobRepository>,
        jobs: Arc<JobService<C, G>>,
        library: Arc<LibraryService<C>>,
        watch_folders: Vec<PathBuf>,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            config,
            clock,
            bus,
            printers,
            jobs_repo,
            jobs,
            library,
            watch_folders,
            fleet: Mutex::new(HashMap::new()),
            last_phase: Mutex::new(HashMap::new()),
            tracked: Mutex::new(HashMap::new()),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn jobs(&self) -> &Arc<JobService<C, G>> {
        &self.jobs
    }

    pub fn library(&self) -> &Arc<LibraryService<C>> {
        &self.library
    }

    /// Register a printer and its driver. The repository row is created if
    /// missing; the driver is owned by this supervisor from here on.
    pub async fn add_printer(&self, printer: Printer, driver: Arc<dyn PrinterDriver>) -> Result<(), SupervisorError> {
        if !self.printers.exists(&printer.id).await? {
            self.printers.create(printer.clone()).await?;
        }
        if let Some(phase) = printer.last_phase {
            self.last_phase.lock().insert(printer.id.clone(), phase);
        }
        let monitor = PrinterMonitor::new(
            printer.id.clone(),
            Arc::clone(&driver),
            self.clock.clone(),
            MonitorSettings::from_config(&self.config),
        );
        self.fleet.lock().insert(
            printer.id.clone(),
            FleetEntry {
                driver,
                monitor,
                handle: None,
            },
        );
        Ok(())
    }

    pub fn monitor(&self, printer_id: &PrinterId) -> Option<Arc<PrinterMonitor<C>>> {
        self.fleet.lock().get(printer_id).map(|entry| Arc::clone(&entry.monitor))
    }

    fn driver(&self, printer_id: &PrinterId) -> Option<Arc<dyn PrinterDriver>> {
        self.fleet.lock().get(printer_id).map(|entry| Arc::clone(&entry.driver))
    }

    /// Connect drivers, start the per-printer monitors, and spawn the three
    /// background tasks. Connect failures are logged, not fatal — the
    /// monitor's backoff recovers the printer when it comes back.
    pub async fn start(self: Arc<Self>) {
        let drivers: Vec<(PrinterId, Arc<dyn PrinterDriver>)> = self
            .fleet
            .lock()
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(&entry.driver)))
            .collect();
        for (printer_id, driver) in drivers {
            if let Err(e) = driver.connect().await {
                tracing::warn!(printer_id = %printer_id, error = %e, "initial printer connect failed");
            }
        }

        for entry in self.fleet.lock().values_mut() {
            if entry.handle.is_none() {
                entry.handle = Some(Arc::clone(&entry.monitor).spawn());
            }
        }

        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(Self::run_status_loop(Arc::clone(&self), self.shutdown_tx.subscribe())));
        tasks.push(tokio::spawn(Self::run_job_loop(Arc::clone(&self), self.shutdown_tx.subscribe())));
        tasks.push(tokio::spawn(Self::run_discovery_loop(Arc::clone(&self), self.shutdown_tx.subscribe())));
        tracing::info!(printers = self.fleet.lock().len(), "fleet supervisor started");
    }

    async fn run_status_loop(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        let mut interval = PRINTER_STATUS_INTERVAL;
        loop {
            tokio::select! {
                _ = stop.changed() => {}
                _ = tokio::time::sleep(interval) => {}
            }
            if *stop.borrow() {
                break;
            }
            interval = match self.status_tick().await {
                Ok(()) => PRINTER_STATUS_INTERVAL,
                Err(e) => {
                    tracing::error!(error = %e, "task.printer_status.error");
                    PRINTER_STATUS_FAILURE_BACKOFF
                }
            };
        }
    }

    async fn run_job_loop(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = stop.changed() => {}
                _ = tokio::time::sleep(JOB_STATUS_INTERVAL) => {}
            }
            if *stop.borrow() {
                break;
            }
            if let Err(e) = self.job_tick().await {
                tracing::error!(error = %e, "task.job_tracking.error");
            }
        }
    }

    async fn run_discovery_loop(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        let mut interval = FILE_DISCOVERY_INTERVAL;
        loop {
            tokio::select! {
                _ = stop.changed() => {}
                _ = tokio::time::sleep(interval) => {}
            }
            if *stop.borrow() {
                break;
            }
            interval = match self.discovery_tick().await {
                Ok(()) => FILE_DISCOVERY_INTERVAL,
                Err(e) => {
                    tracing::error!(error = %e, "task.file_discovery.error");
                    FILE_DISCOVERY_FAILURE_BACKOFF
                }
            };
        }
    }

    /// Task 1: read each monitor's cached status, emit phase-edge events,
    /// write liveness back, and feed the job service (§4.3).
    pub async fn status_tick(&self) -> Result<(), SupervisorError> {
        let printers = self.printers.list(PrinterFilter { active_only: true }).await?;
        for printer in printers {
            let Some(monitor) = self.monitor(&printer.id) else {
                continue;
            };
            let now = self.clock.now();
            let update = monitor
                .last_status()
                .unwrap_or_else(|| StatusUpdate::offline(printer.id.clone(), now));
            let phase = update.phase;

            let previous = self
                .last_phase
                .lock()
                .insert(printer.id.clone(), phase)
                .or(printer.last_phase);
            match (previous.map(|p| p.is_online()), phase.is_online()) {
                (Some(false) | None, true) => {
                    tracing::info!(printer_id = %printer.id, "printer connected");
                    self.bus.emit(Event::PrinterConnected {
                        printer_id: printer.id.clone(),
                        timestamp: now,
                    });
                }
                (Some(true), false) => {
                    tracing::info!(printer_id = %printer.id, "printer disconnected");
                    self.bus.emit(Event::PrinterDisconnected {
                        printer_id: printer.id.clone(),
                        timestamp: now,
                    });
                }
                _ => {}
            }
            self.bus.emit(Event::PrinterStatus {
                printer_id: printer.id.clone(),
                phase,
                timestamp: now,
            });
            self.printers.update_status(&printer.id, phase, now).await?;

            if let Err(e) = self.jobs.sync_from_status(&printer, &update).await {
                if e.is_expected() {
                    tracing::debug!(printer_id = %printer.id, error = %e, "telemetry job sync skipped");
                } else {
                    tracing::warn!(printer_id = %printer.id, error = %e, "telemetry job sync failed");
                }
            }
        }
        Ok(())
    }

    /// Task 2: diff active jobs against the last tracked `(status,
    /// progress)` pair, emitting `job_started`, `job_update` (>= 10 points),
    /// and `job_completed`; terminal jobs leave the tracking map (§4.3).
    pub async fn job_tick(&self) -> Result<(), SupervisorError> {
        let all = self.jobs_repo.list(&JobFilter::default(), JOB_SCAN_LIMIT, 0).await?;
        let now = self.clock.now();
        let mut seen = HashSet::new();

        {
            let mut tracked = self.tracked.lock();
            for job in all.iter().filter(|job| {
                matches!(
                    job.status,
                    JobStatus::Pending | JobStatus::Running | JobStatus::Printing | JobStatus::Paused
                )
            }) {
                seen.insert(job.id.clone());
                let is_running = matches!(job.status, JobStatus::Running | JobStatus::Printing);
                match tracked.insert(job.id.clone(), (job.status, job.progress)) {
                    None => {
                        if is_running {
                            self.bus.emit(Event::JobStarted {
                                job_id: job.id.clone(),
                                printer_id: job.printer_id.clone(),
                                timestamp: now,
                            });
                        }
                    }
                    Some((old_status, old_progress)) => {
                        let was_running = matches!(old_status, JobStatus::Running | JobStatus::Printing);
                        if !was_running && is_running {
                            self.bus.emit(Event::JobStarted {
                                job_id: job.id.clone(),
                                printer_id: job.printer_id.clone(),
                                timestamp: now,
                            });
                        }
                        let delta = i16::from(job.progress) - i16::from(old_progress);
                        if delta.abs() >= 10 {
                            self.bus.emit(Event::JobUpdate {
                                job_id: job.id.clone(),
                                printer_id: job.printer_id.clone(),
                                progress: job.progress,
                                progress_delta: delta,
                                timestamp: now,
                            });
                        }
                    }
                }
            }
        }

        // Jobs that left the active set: emit completion for the terminal
        // ones, then drop them all from tracking.
        let departed: Vec<JobId> = self
            .tracked
            .lock()
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in departed {
            if let Some(job) = self.jobs_repo.get(&id).await? {
                if job.status.is_terminal() {
                    self.bus.emit(Event::JobCompleted {
                        job_id: job.id.clone(),
                        printer_id: job.printer_id.clone(),
                        status: job.status,
                        timestamp: now,
                    });
                }
            }
            self.tracked.lock().remove(&id);
        }
        Ok(())
    }

    /// Task 3: list files on every active printer and scan watch folders,
    /// handing everything to the library service. Per-printer failures are
    /// isolated (§4.3).
    pub async fn discovery_tick(&self) -> Result<(), SupervisorError> {
        let printers = self.printers.list(PrinterFilter { active_only: true }).await?;
        let mut discovered_total = 0usize;
        let mut new_checksums = Vec::new();

        for printer in printers {
            let Some(driver) = self.driver(&printer.id) else {
                continue;
            };
            match driver.list_files().await {
                Ok(files) => {
                    let (discovered, new) = self.library.discover_printer_files(&printer, driver.as_ref(), files).await;
                    discovered_total += discovered;
                    new_checksums.extend(new);
                }
                Err(e) => {
                    tracing::warn!(printer_id = %printer.id, error = %e, "printer file listing failed");
                }
            }
        }

        for folder in &self.watch_folders {
            match self.library.scan_watch_folder(folder).await {
                Ok((discovered, new)) => {
                    discovered_total += discovered;
                    new_checksums.extend(new);
                }
                Err(e) => {
                    tracing::warn!(folder = %folder.display(), error = %e, "watch folder scan failed");
                }
            }
        }

        let now = self.clock.now();
        self.bus.emit(Event::FilesDiscovered {
            printer_id: None,
            count: discovered_total,
            timestamp: now,
        });
        if !new_checksums.is_empty() {
            tracing::info!(count = new_checksums.len(), "new files found");
            self.bus.emit(Event::NewFilesFound {
                printer_id: None,
                checksums: new_checksums,
                timestamp: now,
            });
        }
        Ok(())
    }

    /// Out-of-band discovery trigger for tests and the admin surface.
    pub async fn force_discovery(&self) -> Result<(), SupervisorError> {
        self.discovery_tick().await
    }

    pub fn health(&self) -> FleetHealth {
        let printers = self
            .fleet
            .lock()
            .values()
            .map(|entry| {
                let metrics = entry.monitor.metrics();
                PrinterHealth {
                    printer_id: entry.monitor.printer_id().clone(),
                    phase: entry.monitor.last_status().map(|s| s.phase),
                    consecutive_failures: metrics.consecutive_failures,
                    last_error: metrics.last_error,
                }
            })
            .collect();
        FleetHealth {
            printers,
            tracked_jobs: self.tracked.lock().len(),
            background_tasks: self.tasks.lock().len(),
        }
    }

    /// §5 shutdown steps 1-3: stop the background tasks, stop each monitor,
    /// then disconnect each driver (drivers clear their auto-reconnect flag
    /// before closing the transport).
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }

        let entries: Vec<(Arc<dyn PrinterDriver>, Option<MonitorHandle>)> = self
            .fleet
            .lock()
            .values_mut()
            .map(|entry| (Arc::clone(&entry.driver), entry.handle.take()))
            .collect();
        for (driver, handle) in entries {
            if let Some(handle) = handle {
                handle.stop().await;
            }
            driver.disconnect().await;
        }
        tracing::info!("fleet supervisor stopped");
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
