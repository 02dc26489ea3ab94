// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Domain model shared by every crate in the supervisor: printers, jobs,
//! the content-addressed library, notification channels, the bus event
//! envelope, and the ambient clock/error/config/backoff primitives they're
//! all built on.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
#[macro_use]
pub mod id;
pub mod job;
pub mod library;
pub mod notification;
pub mod printer;
pub mod snapshot;
pub mod status;
pub mod usage;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::SupervisorConfig;
pub use error::{DriverError, SupervisorError, WriteOutcome};
pub use event::Event;
pub use id::{IdGen, SequentialIdGen, ShortId, UuidIdGen};
pub use job::{CustomerInfo, DedupKey, Job, JobCreate, JobId, JobStatus, JobValidationError};
pub use library::{FileType, LibraryFile, LibraryFileSource, LibraryFileStatus, LibraryFilter, SortKey, SourceType};
pub use notification::{ChannelId, ChannelType, DeliveryStatus, NotificationChannel, NotificationHistoryEntry};
pub use printer::{Printer, PrinterEndpoint, PrinterFilter, PrinterId, PrinterType};
pub use snapshot::{Snapshot, SnapshotId};
pub use status::{Filament, Phase, StatusUpdate, Temperatures, EXTERNAL_SPOOL_SLOT};
pub use usage::{UsageEvent, UsageEventFilter, UsageEventId};
