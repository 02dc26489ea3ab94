// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet inventory file: the printers this daemon supervises, their
//! connection details, plus the supervisor settings and watch folders.
//!
//! ```toml
//! [supervisor]
//! printer_polling_interval_s = 30
//! library_path = "/var/lib/printernizer/library"
//!
//! watch_folders = ["/srv/models/incoming"]
//!
//! [[printers]]
//! id = "x1c-workshop"
//! type = "bambu_lab"
//! host = "192.168.1.42"
//! access_code = "12345678"
//! serial = "01S00C123456789"
//!
//! [[printers]]
//! id = "mk4-desk"
//! type = "octoprint"
//! host = "octopi.local"
//! api_key = "ABCDEF0123456789"
//! ```

use std::path::{Path, PathBuf};

use printernizer_core::printer::{PrinterEndpoint, PrinterType};
use printernizer_core::{Printer, SupervisorConfig, SupervisorError};
use serde::Deserialize;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrinterDecl {
    pub id: String,
    #[serde(rename = "type")]
    pub printer_type: PrinterType,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub access_code: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PrinterDecl {
    pub fn to_printer(&self) -> Printer {
        let mut printer = Printer::new(
            self.id.clone(),
            self.printer_type,
            PrinterEndpoint {
                host: self.host.clone(),
                port: self.port,
                api_key: self.api_key.clone(),
                access_code: self.access_code.clone(),
                serial: self.serial.clone(),
            },
        );
        printer.is_active = self.is_active;
        printer
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub watch_folders: Vec<PathBuf>,
    #[serde(default)]
    pub printers: Vec<PrinterDecl>,
}

impl FleetConfig {
    pub fn load(path: &Path) -> Result<Self, SupervisorError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SupervisorError::Config(format!("read {}: {e}", path.display())))?;
        Self::parse(&text).map_err(|e| SupervisorError::Config(format!("parse {}: {e}", path.display())))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
