// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure parsing of OctoPrint's `/api/printer`, `/api/job`, and
//! `/api/files` JSON bodies. No network — kept separate from
//! [`super::OctoprintDriver`] so the flag-mapping and recursive file-tree
//! walk are unit-testable on their own.

use printernizer_core::{Filament, Phase, PrinterId, StatusUpdate, Temperatures};
use serde_json::Value;

use crate::driver::{JobInfo, PrinterFile};

fn flag(state: &Value, name: &str) -> bool {
    state.get("flags").and_then(|f| f.get(name)).and_then(Value::as_bool).unwrap_or(false)
}

/// OctoPrint exposes printer state as a bag of boolean flags rather than an
/// enum; `error` and `printing` take priority over the merely-operational
/// flags so a printer mid-job that also reports `operational: true` still
/// maps to `Printing`.
pub(super) fn map_phase(state: &Value) -> Phase {
    if flag(state, "error") {
        Phase::Error
    } else if flag(state, "printing") {
        Phase::Printing
    } else if flag(state, "paused") || flag(state, "pausing") {
        Phase::Paused
    } else if flag(state, "operational") || flag(state, "ready") {
        Phase::Online
    } else if flag(state, "closedOrError") || flag(state, "closed") {
        Phase::Offline
    } else {
        Phase::Unknown
    }
}

/// Builds a [`StatusUpdate`] from a merged `/api/printer` + `/api/job`
/// response. `job` and `progress` may be `Value::Null` when only printer
/// state was fetched.
pub(super) fn build_status_update(printer_id: PrinterId, at: chrono::DateTime<chrono::Utc>, state: &Value, temps: &Value, job: &Value, progress: &Value) -> StatusUpdate {
    let phase = map_phase(state);

    let bed = temps.get("bed").and_then(|b| b.get("actual")).and_then(Value::as_f64);
    let nozzle = temps.get("tool0").and_then(|t| t.get("actual")).and_then(Value::as_f64);

    let current_job_name = job
        .get("file")
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .map(ToString::to_string);

    let progress_percent = progress.get("completion").and_then(Value::as_f64).map(|p| p.clamp(0.0, 100.0) as u8);
    let remaining_minutes = progress.get("printTimeLeft").and_then(Value::as_u64).map(|s| (s / 60) as u32);
    let elapsed_minutes = progress.get("printTime").and_then(Value::as_u64).map(|s| (s / 60) as u32);

    let filaments = extract_filaments(job);

    let mut update = StatusUpdate::offline(printer_id, at);
    update.phase = phase;
    update.message = state.get("text").and_then(Value::as_str).map(ToString::to_string);
    update.temperatures = Temperatures { bed, nozzle, chamber: None };
    update.progress_percent = progress_percent;
    update.current_job_name = current_job_name;
    update.remaining_minutes = remaining_minutes;
    update.elapsed_minutes = elapsed_minutes;
    update.filaments = filaments;
    update.raw = serde_json::json!({"state": state, "job": job, "progress": progress});
    update.clamp_progress();
    update
}

/// OctoPrint reports filament by tool key (`tool0`, `tool1`, ...) with no
/// color/type of its own — that would come from slicer metadata this
/// endpoint doesn't carry, so only slot and active-tool are populated.
fn extract_filaments(job: &Value) -> Vec<Filament> {
    let Some(filament) = job.get("filament").and_then(Value::as_object) else { return Vec::new() };
    let mut filaments = Vec::new();
    for (tool_key, _) in filament {
        let Some(slot_str) = tool_key.strip_prefix("tool") else { continue };
        let slot: u32 = slot_str.parse().unwrap_or(0);
        filaments.push(Filament { slot, color: None, material_type: None, is_active: slot == 0 });
    }
    filaments.sort_by_key(|f| f.slot);
    filaments
}

pub(super) fn parse_job_info(body: &Value) -> Option<JobInfo> {
    let file_name = body.get("job").and_then(|j| j.get("file")).and_then(|f| f.get("display").or_else(|| f.get("name"))).and_then(Value::as_str)?;
    let progress = body.get("progress").and_then(|p| p.get("completion")).and_then(Value::as_f64).map(|p| p.clamp(0.0, 100.0) as u8);
    Some(JobInfo { name: file_name.to_string(), progress_percent: progress, started_at: None })
}

/// The `refs.download` URL from a `/api/files/{origin}/{path}` file-info
/// response. Downloads follow this rather than guessing at the
/// `/downloads/...` layout, which varies with the storage origin.
pub(super) fn download_ref(info: &Value) -> Option<&str> {
    info.get("refs").and_then(|r| r.get("download")).and_then(Value::as_str)
}

/// OctoPrint's `/api/files?recursive=true` returns a tree of `folder`
/// entries nested around `machinecode`/`model` leaves; walk it depth-first,
/// prefixing each leaf's path with its storage `origin` (`local`/`sdcard`).
pub(super) fn extract_files(node: &Value, origin: &str) -> Vec<PrinterFile> {
    let mut files = Vec::new();
    let node_type = node.get("type").and_then(Value::as_str).unwrap_or("");
    match node_type {
        "folder" => {
            if let Some(children) = node.get("children").and_then(Value::as_array) {
                for child in children {
                    files.extend(extract_files(child, origin));
                }
            }
        }
        "machinecode" | "model" => {
            let Some(name) = node.get("name").and_then(Value::as_str) else { return files };
            let path = node.get("path").and_then(Value::as_str).unwrap_or(name);
            files.push(PrinterFile {
                name: name.to_string(),
                path: format!("{origin}/{path}"),
                size_bytes: node.get("size").and_then(Value::as_u64),
                modified_at: node.get("date").and_then(Value::as_i64).and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            });
        }
        _ => {}
    }
    files
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
