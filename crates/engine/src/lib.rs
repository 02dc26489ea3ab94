// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The supervisor core proper: the fleet-wide event bus (§4.3), the
//! per-printer monitor (§4.2), the job lifecycle engine (§4.4), the
//! content-addressed library service (§4.5), the notification dispatcher
//! (§4.6), and the usage recorder, all multiplexed by
//! [`supervisor::FleetSupervisor`].

pub mod bus;
pub mod job_service;
pub mod library_service;
pub mod monitor;
pub mod notifier;
pub mod supervisor;
pub mod usage_recorder;

pub use bus::{EventBus, EventHandler};
pub use job_service::JobService;
pub use library_service::{IngestOutcome, LibraryService, SourceRef};
pub use monitor::{MonitorHandle, MonitorMetrics, MonitorSettings, PrinterMonitor};
pub use notifier::{AdapterFactory, DispatcherSettings, NotificationDispatcher, WebhookAdapterFactory};
pub use supervisor::{FleetHealth, FleetSupervisor, PrinterHealth};
pub use usage_recorder::UsageRecorder;
