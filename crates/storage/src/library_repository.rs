// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed library persistence (§4.5, §6).

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use printernizer_core::library::{LibraryFilter, LibraryFileStatus, SortKey};
use printernizer_core::{LibraryFile, LibraryFileSource, SupervisorError};

#[derive(Debug, Clone, Default)]
pub struct LibraryFilePatch {
    pub display_name: Option<Option<String>>,
    pub status: Option<LibraryFileStatus>,
    pub is_duplicate: Option<bool>,
    pub duplicate_of_checksum: Option<Option<String>>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LibraryStats {
    pub total_files: usize,
    pub total_bytes: u64,
    pub duplicate_files: usize,
}

#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn create_file(&self, file: LibraryFile) -> Result<LibraryFile, SupervisorError>;
    async fn get_file_by_checksum(&self, checksum: &str) -> Result<Option<LibraryFile>, SupervisorError>;
    async fn update_file(&self, checksum: &str, patch: LibraryFilePatch) -> Result<LibraryFile, SupervisorError>;
    async fn delete_file(&self, checksum: &str) -> Result<(), SupervisorError>;
    async fn list_files(
        &self,
        filter: &LibraryFilter,
        sort: SortKey,
        page: usize,
        limit: usize,
    ) -> Result<Page<LibraryFile>, SupervisorError>;
    async fn create_file_source(&self, source: LibraryFileSource) -> Result<(), SupervisorError>;
    /// Removes one observation location; the file itself is never touched
    /// (§4.5 deletion semantics). Returns whether a row was removed.
    async fn delete_file_source(&self, source: &LibraryFileSource) -> Result<bool, SupervisorError>;
    async fn delete_file_sources(&self, checksum: &str) -> Result<usize, SupervisorError>;
    async fn list_file_sources(&self, checksum: &str) -> Result<Vec<LibraryFileSource>, SupervisorError>;
    async fn get_stats(&self) -> Result<LibraryStats, SupervisorError>;
}

#[derive(Default)]
struct Inner {
    files: HashMap<String, LibraryFile>,
    sources: HashMap<String, Vec<LibraryFileSource>>,
}

#[derive(Default)]
pub struct InMemoryLibraryRepository {
    inner: Mutex<Inner>,
}

impl InMemoryLibraryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(file: &LibraryFile, sources: &[LibraryFileSource], filter: &LibraryFilter) -> bool {
    if let Some(ft) = filter.file_type {
        if file.file_type != ft {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if file.status != status {
            return false;
        }
    }
    if let Some(has_thumb) = filter.has_thumbnail {
        if file.has_thumbnail() != has_thumb {
            return false;
        }
    }
    if let Some(has_meta) = filter.has_metadata {
        if file.has_metadata() != has_meta {
            return false;
        }
    }
    if filter.only_duplicates && !file.is_duplicate {
        return false;
    }
    if !filter.show_duplicates && !filter.only_duplicates && file.is_duplicate {
        return false;
    }
    if let Some(search) = &filter.search {
        let needle = search.to_ascii_lowercase();
        let haystack = format!("{} {}", file.filename, file.display_name.clone().unwrap_or_default()).to_ascii_lowercase();
        if !haystack.contains(&needle) {
            return false;
        }
    }
    if filter.source_type.is_some() || filter.manufacturer.is_some() || filter.printer_model.is_some() {
        let source_match = sources.iter().any(|s| {
            filter.source_type.map(|t| t == s.source_type).unwrap_or(true)
                && filter
                    .manufacturer
                    .as_ref()
                    .map(|m| s.manufacturer.as_deref() == Some(m.as_str()))
                    .unwrap_or(true)
                && filter
                    .printer_model
                    .as_ref()
                    .map(|m| s.printer_model.as_deref() == Some(m.as_str()))
                    .unwrap_or(true)
        });
        if !source_match {
            return false;
        }
    }
    true
}

fn sort_key_value(file: &LibraryFile, key: SortKey) -> String {
    match key {
        SortKey::CreatedAt => file.added_at.to_rfc3339(),
        SortKey::Filename => file.filename.clone(),
        SortKey::FileSize => format!("{:020}", file.size_bytes),
        SortKey::LastModified => file.last_modified.map(|t| t.to_rfc3339()).unwrap_or_default(),
    }
}

#[async_trait]
impl LibraryRepository for InMemoryLibraryRepository {
    async fn create_file(&self, file: LibraryFile) -> Result<LibraryFile, SupervisorError> {
        let mut inner = self.inner.lock();
        if inner.files.contains_key(&file.checksum) {
            return Err(SupervisorError::Conflict(format!("file {} already exists", file.checksum)));
        }
        inner.files.insert(file.checksum.clone(), file.clone());
        Ok(file)
    }

    async fn get_file_by_checksum(&self, checksum: &str) -> Result<Option<LibraryFile>, SupervisorError> {
        Ok(self.inner.lock().files.get(checksum).cloned())
    }

    async fn update_file(&self, checksum: &str, patch: LibraryFilePatch) -> Result<LibraryFile, SupervisorError> {
        let mut inner = self.inner.lock();
        let file = inner
            .files
            .get_mut(checksum)
            .ok_or_else(|| SupervisorError::NotFound(format!("library file {checksum}")))?;
        if let Some(v) = patch.display_name {
            file.display_name = v;
        }
        if let Some(v) = patch.status {
            file.status = v;
        }
        if let Some(v) = patch.is_duplicate {
            file.is_duplicate = v;
        }
        if let Some(v) = patch.duplicate_of_checksum {
            file.duplicate_of_checksum = v;
        }
        if let Some(v) = patch.metadata {
            file.metadata = v;
        }
        Ok(file.clone())
    }

    async fn delete_file(&self, checksum: &str) -> Result<(), SupervisorError> {
        let mut inner = self.inner.lock();
        inner
            .files
            .remove(checksum)
            .ok_or_else(|| SupervisorError::NotFound(format!("library file {checksum}")))?;
        inner.sources.remove(checksum);
        Ok(())
    }

    async fn list_files(
        &self,
        filter: &LibraryFilter,
        sort: SortKey,
        page: usize,
        limit: usize,
    ) -> Result<Page<LibraryFile>, SupervisorError> {
        let inner = self.inner.lock();
        let empty = Vec::new();
        let mut matches: Vec<LibraryFile> = inner
            .files
            .values()
            .filter(|f| matches_filter(f, inner.sources.get(&f.checksum).unwrap_or(&empty), filter))
            .cloned()
            .collect();
        matches.sort_by(|a, b| match sort {
            SortKey::CreatedAt => b.added_at.cmp(&a.added_at),
            _ => sort_key_value(a, sort).cmp(&sort_key_value(b, sort)),
        });
        let total = matches.len();
        let items = matches.into_iter().skip(page * limit).take(limit).collect();
        Ok(Page { items, total })
    }

    async fn create_file_source(&self, source: LibraryFileSource) -> Result<(), SupervisorError> {
        let mut inner = self.inner.lock();
        if !inner.files.contains_key(&source.checksum) {
            return Err(SupervisorError::NotFound(format!("library file {}", source.checksum)));
        }
        let checksum = source.checksum.clone();
        let bucket = inner.sources.entry(checksum).or_default();
        if !bucket.iter().any(|existing| existing.key() == source.key()) {
            bucket.push(source);
        }
        Ok(())
    }

    async fn delete_file_source(&self, source: &LibraryFileSource) -> Result<bool, SupervisorError> {
        let mut inner = self.inner.lock();
        let Some(bucket) = inner.sources.get_mut(&source.checksum) else {
            return Ok(false);
        };
        let before = bucket.len();
        bucket.retain(|existing| existing.key() != source.key());
        Ok(bucket.len() < before)
    }

    async fn delete_file_sources(&self, checksum: &str) -> Result<usize, SupervisorError> {
        Ok(self.inner.lock().sources.remove(checksum).map(|v| v.len()).unwrap_or(0))
    }

    async fn list_file_sources(&self, checksum: &str) -> Result<Vec<LibraryFileSource>, SupervisorError> {
        Ok(self.inner.lock().sources.get(checksum).cloned().unwrap_or_default())
    }

    async fn get_stats(&self) -> Result<LibraryStats, SupervisorError> {
        let inner = self.inner.lock();
        let mut stats = LibraryStats::default();
        for file in inner.files.values() {
            stats.total_files += 1;
            stats.total_bytes += file.size_bytes;
            if file.is_duplicate {
                stats.duplicate_files += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "library_repository_tests.rs"]
mod tests;
