//! Shared harness for the supervisor specs: one fake-driven printer fleet
//! wired exactly the way the daemon wires production, minus the network.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use printernizer_core::printer::{PrinterEndpoint, PrinterType};
use printernizer_core::status::Phase;
use printernizer_core::{Event, FakeClock, Printer, PrinterId, SequentialIdGen, StatusUpdate, SupervisorConfig};
use printernizer_drivers::FakePrinterDriver;
use printernizer_engine::{EventBus, FleetSupervisor, JobService, LibraryService};
use printernizer_storage::{
    InMemoryJobRepository, InMemoryLibraryRepository, InMemoryPrinterRepository, JobRepository, LibraryRepository,
    PrinterRepository,
};

pub const PRINTER_ID: &str = "bambu-1";

pub struct Harness {
    pub supervisor: Arc<FleetSupervisor<FakeClock, SequentialIdGen>>,
    pub jobs_repo: Arc<InMemoryJobRepository>,
    pub clock: FakeClock,
    pub events: Arc<Mutex<Vec<Event>>>,
    pub _library_root: tempfile::TempDir,
}

impl Harness {
    /// A fresh supervisor over fresh repositories.
    pub fn new() -> Self {
        Self::over_repo(Arc::new(InMemoryJobRepository::new()))
    }

    /// A supervisor over an existing job repository — how the specs model a
    /// daemon restart: all in-memory supervisor state is lost, rows survive.
    pub fn over_repo(jobs_repo: Arc<InMemoryJobRepository>) -> Self {
        let library_root = tempfile::tempdir().unwrap();
        let config = SupervisorConfig {
            library_path: library_root.path().to_path_buf(),
            ..Default::default()
        };
        let clock = FakeClock::at(1_700_000_000_000);
        let bus = EventBus::new();
        let printers_repo = Arc::new(InMemoryPrinterRepository::new());
        let library_repo = Arc::new(InMemoryLibraryRepository::new());
        let jobs = JobService::new(
            Arc::clone(&jobs_repo) as Arc<dyn JobRepository>,
            bus.clone(),
            clock.clone(),
            SequentialIdGen::new("job"),
            true,
        );
        let library = LibraryService::new(library_repo as Arc<dyn LibraryRepository>, clock.clone(), &config);
        let supervisor = FleetSupervisor::new(
            config,
            clock.clone(),
            bus.clone(),
            printers_repo as Arc<dyn PrinterRepository>,
            Arc::clone(&jobs_repo) as Arc<dyn JobRepository>,
            jobs,
            library,
            Vec::new(),
        );

        let events = Arc::new(Mutex::new(Vec::new()));
        {
            let events = Arc::clone(&events);
            bus.subscribe(
                "spec_recorder",
                Arc::new(move |event| {
                    let events = Arc::clone(&events);
                    Box::pin(async move {
                        events.lock().push(event);
                    })
                }),
            );
        }

        Self {
            supervisor,
            jobs_repo,
            clock,
            events,
            _library_root: library_root,
        }
    }

    /// Register the harness printer backed by a scripted driver.
    pub async fn add_bambu(&self, driver: FakePrinterDriver) {
        let printer = Printer::new(PRINTER_ID, PrinterType::BambuLab, PrinterEndpoint::default());
        self.supervisor.add_printer(printer, Arc::new(driver)).await.unwrap();
    }

    /// One full observation cycle: the monitor polls the driver, then the
    /// supervisor's status and job tasks each run once.
    pub async fn observe(&self) {
        let monitor = self.supervisor.monitor(&PrinterId::new(PRINTER_ID)).unwrap();
        monitor.poll_once().await;
        self.supervisor.status_tick().await.unwrap();
        self.supervisor.job_tick().await.unwrap();
    }

    /// Wait for the bus recorder to catch up, then return the event types
    /// seen so far.
    pub async fn event_types(&self) -> Vec<String> {
        for _ in 0..1_000 {
            tokio::task::yield_now().await;
        }
        self.events.lock().iter().map(|e| e.event_type().to_string()).collect()
    }

    pub async fn events(&self) -> Vec<Event> {
        for _ in 0..1_000 {
            tokio::task::yield_now().await;
        }
        self.events.lock().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }
}

/// The S1 telemetry shape: a Bambu report mid-print, as the driver
/// normalizes it.
pub fn printing_update(job_name: &str, percent: u8, started_epoch: i64) -> StatusUpdate {
    let mut update = StatusUpdate::offline(PrinterId::new(PRINTER_ID), Utc::now());
    update.phase = Phase::Printing;
    update.current_job_name = Some(job_name.to_string());
    update.progress_percent = Some(percent);
    update.started_at = chrono::DateTime::from_timestamp(started_epoch, 0);
    update
}

/// Telemetry after `gcode_state=FINISH`: back to idle with 100% progress.
pub fn finished_update() -> StatusUpdate {
    let mut update = StatusUpdate::offline(PrinterId::new(PRINTER_ID), Utc::now());
    update.phase = Phase::Online;
    update.progress_percent = Some(100);
    update
}

pub fn online_update() -> StatusUpdate {
    let mut update = StatusUpdate::offline(PrinterId::new(PRINTER_ID), Utc::now());
    update.phase = Phase::Online;
    update
}
