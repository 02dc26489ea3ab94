// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Vendor protocol adapters behind the uniform [`driver::PrinterDriver`]
//! capability set (§4.1), plus per-channel [`notify::NotifyAdapter`]
//! implementations (§4.6).

pub mod bambu;
pub mod driver;
pub mod notify;
pub mod octoprint;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use bambu::BambuDriver;
pub use driver::{first_success, JobInfo, PrinterDriver, PrinterFile, Strategy};
pub use octoprint::OctoprintDriver;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePrinterDriver;
