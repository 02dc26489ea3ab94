// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure parsing of Bambu's `device/{serial}/report` MQTT payload into a
//! normalized [`StatusUpdate`]. No network, no mutable state — this is the
//! part of the driver that's worth unit-testing on its own.

use chrono::{DateTime, Utc};
use printernizer_core::{Filament, Phase, PrinterId, StatusUpdate, Temperatures};
use serde_json::Value;

/// Above this nozzle/bed combination the printer is actively extruding,
/// not just preheating.
const NOZZLE_PRINTING_THRESHOLD_C: f64 = 170.0;
const BED_PRINTING_THRESHOLD_C: f64 = 45.0;
/// Below this the print is finished and has cooled; above it the printer
/// is still hot enough to be considered "online" rather than idle-cold.
const NOZZLE_COOLING_THRESHOLD_C: f64 = 50.0;
const BED_COOLING_THRESHOLD_C: f64 = 40.0;

fn print_section(report: &Value) -> &Value {
    report.get("print").unwrap_or(&Value::Null)
}

fn f64_field(obj: &Value, key: &str) -> f64 {
    obj.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Bambu reports progress under any of these keys depending on firmware
/// version; the first present wins.
fn progress_percent(print: &Value) -> Option<u8> {
    for key in ["mc_percent", "print_percent", "percent", "progress"] {
        if let Some(v) = print.get(key).and_then(Value::as_u64) {
            return Some(v.min(100) as u8);
        }
    }
    None
}

/// `gcode_start_time` arrives as a number or a decimal string depending on
/// firmware version.
fn start_time(print: &Value) -> Option<DateTime<Utc>> {
    let epoch = match print.get("gcode_start_time") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse::<i64>().ok(),
        _ => None,
    }?;
    DateTime::from_timestamp(epoch, 0)
}

fn job_name(print: &Value) -> Option<String> {
    print
        .get("subtask_name")
        .or_else(|| print.get("gcode_file"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// `gcode_state` is Bambu's own state string ("RUNNING", "PRINTING",
/// "PAUSE", "FINISH", "FAILED", "IDLE", ...). Trust it when present and a
/// print is genuinely in progress; otherwise fall back to temperature
/// thresholds, since idle printers sometimes omit `gcode_state` entirely.
/// "PRINTING" specifically is only trusted while progress sits strictly
/// between 0 and 100 — some firmwares leave it behind on stale reports.
fn infer_phase(print: &Value, progress: Option<u8>, nozzle: f64, bed: f64) -> Phase {
    let gcode_state = print.get("gcode_state").and_then(Value::as_str).unwrap_or("");
    match gcode_state {
        "RUNNING" | "PREPARE" => return Phase::Printing,
        "PRINTING" => {
            if matches!(progress, Some(p) if p > 0 && p < 100) {
                return Phase::Printing;
            }
        }
        "PAUSE" => return Phase::Paused,
        "FAILED" => return Phase::Error,
        _ => {}
    }
    if let Some(p) = progress {
        if p > 0 && p < 100 && nozzle > NOZZLE_PRINTING_THRESHOLD_C && bed > BED_PRINTING_THRESHOLD_C {
            return Phase::Printing;
        }
    }
    if nozzle > NOZZLE_COOLING_THRESHOLD_C || bed > BED_COOLING_THRESHOLD_C {
        return Phase::Online;
    }
    Phase::Online
}

/// RRGGBBAA (Bambu's tray color format) to `#RRGGBB`, skipping an all-zero
/// color — Bambu uses `00000000` to mean "no filament configured".
fn convert_tray_color(raw: &str) -> Option<String> {
    if raw.len() < 6 {
        return None;
    }
    let rgb = &raw[..6];
    if rgb.eq_ignore_ascii_case("000000") {
        return None;
    }
    Some(format!("#{rgb}"))
}

fn non_blank(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_uppercase())
    }
}

/// Extracts AMS-slotted and external-spool (`vt_tray`) filaments (§4.1's
/// `slot = 4 * ams_index + tray_index`, `vt_tray` pinned to slot 254).
fn extract_filaments(print: &Value) -> Vec<Filament> {
    let mut filaments = Vec::new();

    let ams_data = print.get("ams").cloned().unwrap_or(Value::Null);
    let active_tray = ams_data.get("tray_now").and_then(Value::as_str).unwrap_or("");

    if let Some(units) = ams_data.get("ams").and_then(Value::as_array) {
        for (ams_idx, unit) in units.iter().enumerate() {
            let Some(trays) = unit.get("tray").and_then(Value::as_array) else { continue };
            for (tray_idx, tray) in trays.iter().enumerate() {
                let slot = (ams_idx * 4 + tray_idx) as u32;
                let material_type = tray.get("tray_type").and_then(Value::as_str).and_then(non_blank);
                let color = tray
                    .get("tray_color")
                    .and_then(Value::as_str)
                    .and_then(convert_tray_color);
                if material_type.is_none() && color.is_none() {
                    continue;
                }
                filaments.push(Filament {
                    slot,
                    color,
                    material_type,
                    is_active: active_tray == slot.to_string(),
                });
            }
        }
    }

    match print.get("vt_tray").and_then(Value::as_object) {
        Some(vt) if !vt.is_empty() => {
            let material_type = vt.get("tray_type").and_then(Value::as_str).and_then(non_blank);
            let color = vt.get("tray_color").and_then(Value::as_str).and_then(convert_tray_color);
            if material_type.is_some() || color.is_some() {
                filaments.push(Filament {
                    slot: 254,
                    color,
                    material_type,
                    is_active: active_tray == "254",
                });
            }
        }
        _ => {
            if active_tray == "254" {
                filaments.push(Filament { slot: 254, color: None, material_type: Some("EXTERNAL".to_string()), is_active: true });
            }
        }
    }

    filaments
}

/// Parses one `device/{serial}/report` MQTT payload into a [`StatusUpdate`].
/// Returns `None` if `report` carries no recognizable `print` section at all
/// (e.g. a bare version/info reply rather than a status push).
pub fn parse_report(printer_id: PrinterId, report: &Value) -> Option<StatusUpdate> {
    let print = print_section(report);
    if print.is_null() {
        return None;
    }

    let nozzle = f64_field(print, "nozzle_temper");
    let bed = f64_field(print, "bed_temper");
    let chamber = print.get("chamber_temper").and_then(Value::as_f64);
    let progress = progress_percent(print);
    let phase = infer_phase(print, progress, nozzle, bed);

    let now = Utc::now();
    let started_at = start_time(print);
    let mut update = StatusUpdate::offline(printer_id, now);
    update.phase = phase;
    update.temperatures = Temperatures { nozzle: Some(nozzle), bed: Some(bed), chamber };
    update.progress_percent = progress;
    update.current_job_name = job_name(print);
    update.remaining_minutes = print.get("mc_remaining_time").and_then(Value::as_u64).map(|v| v as u32);
    update.started_at = started_at;
    // mc_print_time is elapsed seconds; when absent, derive from the start time.
    update.elapsed_minutes = print
        .get("mc_print_time")
        .and_then(Value::as_u64)
        .map(|secs| (secs / 60) as u32)
        .or_else(|| started_at.map(|s| ((now - s).num_minutes().max(0)) as u32));
    update.estimated_end_at = update
        .remaining_minutes
        .map(|m| now + chrono::Duration::minutes(i64::from(m)));
    update.filaments = extract_filaments(print);
    update.raw = report.clone();
    update.clamp_progress();
    Some(update)
}

#[cfg(test)]
#[path = "parsing_tests.rs"]
mod tests;
