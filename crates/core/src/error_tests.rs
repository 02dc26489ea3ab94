// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn auth_errors_are_not_retryable() {
    assert!(!DriverError::Auth("bad access code".into()).is_retryable());
}

#[test]
fn connection_errors_are_retryable() {
    assert!(DriverError::Connection("refused".into()).is_retryable());
}

#[test]
fn not_found_and_invalid_transition_are_expected() {
    assert!(SupervisorError::NotFound("job".into()).is_expected());
    assert!(SupervisorError::InvalidTransition {
        from: "completed".into(),
        to: "running".into(),
        allowed: vec!["failed".into()],
    }
    .is_expected());
    assert!(!SupervisorError::Internal("boom".into()).is_expected());
}

#[test]
fn write_outcome_unwraps_either_variant() {
    let created: WriteOutcome<u32> = WriteOutcome::Created(1);
    let dup: WriteOutcome<u32> = WriteOutcome::Duplicate(1);
    assert_eq!(created.into_inner(), 1);
    assert!(dup.is_duplicate());
}
