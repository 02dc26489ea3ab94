//! Behavioral specifications for the fleet supervisor core.
//!
//! These tests drive the supervisor through its public surface with fake
//! drivers, fake notification adapters, in-memory repositories, and a fake
//! clock — no network, no real printers. See tests/specs/prelude.rs for the
//! shared harness.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// job/
#[path = "specs/job/auto_creation.rs"]
mod job_auto_creation;
#[path = "specs/job/dedup.rs"]
mod job_dedup;
#[path = "specs/job/transitions.rs"]
mod job_transitions;

// printer/
#[path = "specs/printer/monitor_backoff.rs"]
mod printer_monitor_backoff;
#[path = "specs/printer/reconnect_cooldown.rs"]
mod printer_reconnect_cooldown;
#[path = "specs/printer/status_edges.rs"]
mod printer_status_edges;

// library/
#[path = "specs/library/content_dedup.rs"]
mod library_content_dedup;

// notify/
#[path = "specs/notify/fanout.rs"]
mod notify_fanout;

// bus/
#[path = "specs/bus/fairness.rs"]
mod bus_fairness;
