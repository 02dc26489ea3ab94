// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bambu's FTP-over-implicit-TLS file access (§4.1 fallback chains): the
//! `/cache` listing and single-file downloads. The printer only speaks Unix
//! `ls -l` lines over `/cache` — no structured listing API — so we parse
//! that format by hand.

use std::path::Path;

use printernizer_core::DriverError;
use suppaftp::{AsyncFtpsStream, types::FileType as FtpFileType};

use crate::driver::PrinterFile;

const BAMBU_PRINTABLE_EXTENSIONS: &[&str] = &[".3mf", ".gcode", ".bgcode", ".stl"];

/// Parses one `ls -l`-style line from Bambu's `/cache` FTP listing:
/// `-rw-rw-rw-   1 root  root   3081365 Sep 28 03:57 filename.3mf`.
/// Non-printable files and malformed lines are silently skipped.
fn parse_listing_line(line: &str) -> Option<PrinterFile> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 9 {
        return None;
    }
    let size_bytes = parts[4].parse::<u64>().ok();
    let name = parts[8..].join(" ");
    if !BAMBU_PRINTABLE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        return None;
    }
    Some(PrinterFile {
        name: name.clone(),
        path: format!("/cache/{name}"),
        size_bytes,
        modified_at: None,
    })
}

pub(super) fn parse_cache_listing(lines: &[String]) -> Vec<PrinterFile> {
    lines.iter().filter_map(|line| parse_listing_line(line)).collect()
}

/// Implicit-TLS connect + `bblp`/access-code login + binary transfer mode,
/// shared by the listing and download paths.
async fn connect(host: &str, access_code: &str) -> Result<AsyncFtpsStream, DriverError> {
    let addr = format!("{host}:990");
    let mut stream = AsyncFtpsStream::connect(addr)
        .await
        .map_err(|e| DriverError::Connection(format!("ftp connect: {e}")))?
        .into_secure(Default::default())
        .await
        .map_err(|e| DriverError::Connection(format!("ftp tls handshake: {e}")))?;

    stream
        .login("bblp", access_code)
        .await
        .map_err(|e| DriverError::Connection(format!("ftp login: {e}")))?;
    stream
        .transfer_type(FtpFileType::Binary)
        .await
        .map_err(|e| DriverError::Connection(format!("ftp type: {e}")))?;
    Ok(stream)
}

/// Lists `/cache`, Bambu's directory for files transferred from the SD card
/// / network share.
pub(super) async fn list_cache_dir(host: &str, access_code: &str) -> Result<Vec<PrinterFile>, DriverError> {
    let mut stream = connect(host, access_code).await?;
    let lines = stream
        .list(Some("/cache"))
        .await
        .map_err(|e| DriverError::Connection(format!("ftp list: {e}")))?;

    let _ = stream.quit().await;
    Ok(parse_cache_listing(&lines))
}

/// Retrieves one remote file (e.g. `/cache/benchy.3mf`) to `local_path`.
pub(super) async fn download(
    host: &str,
    access_code: &str,
    remote_path: &str,
    local_path: &Path,
) -> Result<(), DriverError> {
    let mut stream = connect(host, access_code).await?;
    let buffer = stream
        .retr_as_buffer(remote_path)
        .await
        .map_err(|e| DriverError::Connection(format!("ftp retr {remote_path}: {e}")))?;
    let _ = stream.quit().await;

    tokio::fs::write(local_path, buffer.into_inner())
        .await
        .map_err(|e| DriverError::Other(format!("write {}: {e}", local_path.display())))
}

#[cfg(test)]
#[path = "ftp_tests.rs"]
mod tests;
