// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn endpoint() -> PrinterEndpoint {
    PrinterEndpoint {
        host: "10.0.0.5".into(),
        ..Default::default()
    }
}

#[test]
fn new_printer_is_active_with_no_liveness() {
    let p = Printer::new("printer-1", PrinterType::BambuLab, endpoint());
    assert!(p.is_active);
    assert!(p.last_phase.is_none());
    assert!(p.last_seen_at.is_none());
}

#[test]
fn record_seen_updates_phase_and_timestamp() {
    let mut p = Printer::new("printer-1", PrinterType::OctoPrint, endpoint());
    let now = Utc::now();
    p.record_seen(Phase::Printing, now);
    assert_eq!(p.last_phase, Some(Phase::Printing));
    assert_eq!(p.last_seen_at, Some(now));
}

#[test]
fn printer_type_display_matches_spec_strings() {
    assert_eq!(PrinterType::BambuLab.to_string(), "bambu_lab");
    assert_eq!(PrinterType::Prusa.to_string(), "prusa");
    assert_eq!(PrinterType::OctoPrint.to_string(), "octoprint");
}
