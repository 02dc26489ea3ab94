// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed library entities (§3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A file extension recognized by the library service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    #[serde(rename = "3mf")]
    ThreeMf,
    Stl,
    Gcode,
    Bgcode,
    Obj,
    Ply,
    Other,
}

impl FileType {
    /// Classify by extension, lowercase and without the leading dot.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "3mf" => FileType::ThreeMf,
            "stl" => FileType::Stl,
            "gcode" => FileType::Gcode,
            "bgcode" => FileType::Bgcode,
            "obj" => FileType::Obj,
            "ply" => FileType::Ply,
            _ => FileType::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryFileStatus {
    Available,
    Processing,
    Error,
    Deleted,
}

impl LibraryFileStatus {
    /// §3 invariant: `library_path` exists on disk iff the file is in one of
    /// these two statuses.
    pub fn on_disk(&self) -> bool {
        matches!(self, LibraryFileStatus::Available | LibraryFileStatus::Processing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Printer,
    WatchFolder,
    Upload,
    Url,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A single observation location for a given checksum (§3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryFileSource {
    pub checksum: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub original_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer_model: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

impl LibraryFileSource {
    /// The `(checksum, source_type, source_id, original_path)` natural key.
    pub fn key(&self) -> (String, SourceType, String, String) {
        (
            self.checksum.clone(),
            self.source_type,
            self.source_id.clone(),
            self.original_path.clone(),
        )
    }
}

/// A content-addressed file in the library, keyed by its SHA-256 checksum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryFile {
    pub checksum: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub library_path: String,
    pub size_bytes: u64,
    pub file_type: FileType,
    pub status: LibraryFileStatus,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analyzed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of_checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
    #[serde(default)]
    pub metadata: Value,
}

impl LibraryFile {
    /// `<root>/<checksum[:2]>/<checksum>.<ext>`, the canonical on-disk layout
    /// for new ingests (§4.5 step 4).
    pub fn sharded_path(root: &str, checksum: &str, extension: &str) -> String {
        let prefix = &checksum[..checksum.len().min(2)];
        format!("{root}/{prefix}/{checksum}.{extension}")
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail.is_some()
    }

    pub fn has_metadata(&self) -> bool {
        !self.metadata.is_null()
    }
}

/// Filters accepted by `LibraryRepository::list_files` (§4.5 Listing & search).
#[derive(Debug, Clone, Default)]
pub struct LibraryFilter {
    pub source_type: Option<SourceType>,
    pub file_type: Option<FileType>,
    pub status: Option<LibraryFileStatus>,
    pub search: Option<String>,
    pub has_thumbnail: Option<bool>,
    pub has_metadata: Option<bool>,
    pub manufacturer: Option<String>,
    pub printer_model: Option<String>,
    pub show_duplicates: bool,
    pub only_duplicates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    Filename,
    FileSize,
    LastModified,
}

impl SortKey {
    /// Unknown keys fall back to `created_at DESC` (§4.5).
    pub fn parse(key: &str) -> Self {
        match key {
            "filename" => SortKey::Filename,
            "file_size" => SortKey::FileSize,
            "last_modified" => SortKey::LastModified,
            _ => SortKey::CreatedAt,
        }
    }
}

#[cfg(test)]
#[path = "library_tests.rs"]
mod tests;
