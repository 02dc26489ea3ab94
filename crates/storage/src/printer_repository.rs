// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Printer configuration persistence (§6).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use printernizer_core::printer::PrinterFilter;
use printernizer_core::status::Phase;
use printernizer_core::{Printer, PrinterId, SupervisorError};

#[derive(Debug, Clone, Default)]
pub struct PrinterPatch {
    pub endpoint: Option<printernizer_core::PrinterEndpoint>,
    pub is_active: Option<bool>,
}

#[async_trait]
pub trait PrinterRepository: Send + Sync {
    async fn create(&self, printer: Printer) -> Result<Printer, SupervisorError>;
    async fn get(&self, id: &PrinterId) -> Result<Option<Printer>, SupervisorError>;
    async fn list(&self, filter: PrinterFilter) -> Result<Vec<Printer>, SupervisorError>;
    async fn update(&self, id: &PrinterId, patch: PrinterPatch) -> Result<Printer, SupervisorError>;
    async fn update_status(&self, id: &PrinterId, phase: Phase, last_seen: DateTime<Utc>) -> Result<(), SupervisorError>;
    async fn delete(&self, id: &PrinterId) -> Result<(), SupervisorError>;
    async fn exists(&self, id: &PrinterId) -> Result<bool, SupervisorError>;
}

#[derive(Default)]
pub struct InMemoryPrinterRepository {
    printers: Mutex<HashMap<PrinterId, Printer>>,
}

impl InMemoryPrinterRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrinterRepository for InMemoryPrinterRepository {
    async fn create(&self, printer: Printer) -> Result<Printer, SupervisorError> {
        let mut printers = self.printers.lock();
        if printers.contains_key(&printer.id) {
            return Err(SupervisorError::Conflict(format!("printer {} already exists", printer.id)));
        }
        printers.insert(printer.id.clone(), printer.clone());
        Ok(printer)
    }

    async fn get(&self, id: &PrinterId) -> Result<Option<Printer>, SupervisorError> {
        Ok(self.printers.lock().get(id).cloned())
    }

    async fn list(&self, filter: PrinterFilter) -> Result<Vec<Printer>, SupervisorError> {
        let printers = self.printers.lock();
        Ok(printers
            .values()
            .filter(|p| !filter.active_only || p.is_active)
            .cloned()
            .collect())
    }

    async fn update(&self, id: &PrinterId, patch: PrinterPatch) -> Result<Printer, SupervisorError> {
        let mut printers = self.printers.lock();
        let printer = printers
            .get_mut(id)
            .ok_or_else(|| SupervisorError::NotFound(format!("printer {id}")))?;
        if let Some(endpoint) = patch.endpoint {
            printer.endpoint = endpoint;
        }
        if let Some(active) = patch.is_active {
            printer.is_active = active;
        }
        Ok(printer.clone())
    }

    async fn update_status(&self, id: &PrinterId, phase: Phase, last_seen: DateTime<Utc>) -> Result<(), SupervisorError> {
        let mut printers = self.printers.lock();
        let printer = printers
            .get_mut(id)
            .ok_or_else(|| SupervisorError::NotFound(format!("printer {id}")))?;
        printer.record_seen(phase, last_seen);
        Ok(())
    }

    async fn delete(&self, id: &PrinterId) -> Result<(), SupervisorError> {
        self.printers
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SupervisorError::NotFound(format!("printer {id}")))
    }

    async fn exists(&self, id: &PrinterId) -> Result<bool, SupervisorError> {
        Ok(self.printers.lock().contains_key(id))
    }
}

#[cfg(test)]
#[path = "printer_repository_tests.rs"]
mod tests;
