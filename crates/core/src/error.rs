// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy.
//!
//! Driver-facing failures ([`DriverError`]) are mapped into the broader
//! [`SupervisorError`] taxonomy used by services and repositories. Kinds are
//! conceptual, not exhaustive Rust types: the distinction that matters is
//! whether a failure is retried (by the monitor's backoff), surfaced to a
//! caller unchanged, or logged and swallowed.

use thiserror::Error;

/// Errors a printer driver can return from any protocol operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("all strategies failed: {0:?}")]
    AllStrategiesFailed(Vec<String>),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Whether the monitor should retry (grow backoff) after this error,
    /// as opposed to treating it as a hard auth failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DriverError::Auth(_) | DriverError::Unsupported(_))
    }
}

/// Errors surfaced above the driver boundary: services, repositories, bus.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("invalid transition from {from} to {to}; allowed: {allowed:?}")]
    InvalidTransition {
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("operation timed out")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),
}

impl SupervisorError {
    /// Never log these at error level — expected, caller-facing outcomes.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            SupervisorError::NotFound(_)
                | SupervisorError::Invalid(_)
                | SupervisorError::InvalidTransition { .. }
                | SupervisorError::Conflict(_)
        )
    }
}

/// Result a repository write can return: a genuine new row, or a
/// pre-existing row surfaced as a non-error "duplicate" signal (§4.4).
#[derive(Debug, Clone)]
pub enum WriteOutcome<T> {
    Created(T),
    Duplicate(T),
}

impl<T> WriteOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            WriteOutcome::Created(v) | WriteOutcome::Duplicate(v) => v,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, WriteOutcome::Duplicate(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
