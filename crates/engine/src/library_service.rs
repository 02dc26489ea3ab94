// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed file library (§4.5).
//!
//! Every observed file resolves to exactly one [`LibraryFile`] keyed by the
//! SHA-256 of its bytes, plus one [`LibraryFileSource`] row per observation
//! location. Ingest holds a per-checksum lock for its duration; reads take
//! no lock (§5).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use printernizer_core::library::{FileType, LibraryFileStatus, LibraryFilter, SortKey, SourceType};
use printernizer_core::printer::PrinterType;
use printernizer_core::{Clock, LibraryFile, LibraryFileSource, Printer, ShortId, SupervisorConfig, SupervisorError};
use printernizer_drivers::{PrinterDriver, PrinterFile};
use printernizer_storage::{LibraryFilePatch, LibraryRepository, LibraryStats, Page};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;

/// Where an observed file came from; becomes a [`LibraryFileSource`] row.
#[derive(Debug, Clone)]
pub struct SourceRef {
    pub source_type: SourceType,
    pub source_id: String,
    pub source_name: Option<String>,
    pub manufacturer: Option<String>,
    pub printer_model: Option<String>,
}

impl SourceRef {
    pub fn watch_folder(folder: &Path) -> Self {
        Self {
            source_type: SourceType::WatchFolder,
            source_id: folder.display().to_string(),
            source_name: folder.file_name().map(|n| n.to_string_lossy().into_owned()),
            manufacturer: None,
            printer_model: None,
        }
    }

    pub fn printer(printer: &Printer) -> Self {
        Self {
            source_type: SourceType::Printer,
            source_id: printer.id.to_string(),
            source_name: Some(printer.id.to_string()),
            manufacturer: Some(manufacturer_label(printer.printer_type).to_string()),
            printer_model: None,
        }
    }
}

fn manufacturer_label(printer_type: PrinterType) -> &'static str {
    match printer_type {
        PrinterType::BambuLab => "Bambu Lab",
        PrinterType::Prusa => "Prusa Research",
        PrinterType::OctoPrint => "OctoPrint",
    }
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub file: LibraryFile,
    /// False when the checksum was already in the library and only a source
    /// row was recorded.
    pub newly_added: bool,
}

pub struct LibraryService<C: Clock> {
    repo: Arc<dyn LibraryRepository>,
    clock: C,
    root: PathBuf,
    preserve_originals: bool,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    downloads: Arc<Semaphore>,
}

fn io_error(context: &str, error: std::io::Error) -> SupervisorError {
    SupervisorError::Internal(format!("{context}: {error}"))
}

impl<C: Clock> LibraryService<C> {
    pub fn new(repo: Arc<dyn LibraryRepository>, clock: C, config: &SupervisorConfig) -> Arc<Self> {
        Arc::new(Self {
            repo,
            clock,
            root: config.library_path.clone(),
            preserve_originals: config.library_preserve_originals,
            locks: Mutex::new(HashMap::new()),
            downloads: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
        })
    }

    fn lock_for(&self, checksum: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(checksum.to_string()).or_default())
    }

    async fn checksum_file(path: &Path) -> Result<String, SupervisorError> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| io_error("open for checksum", e))?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| io_error("read for checksum", e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// The §4.5 ingest protocol for one observed path. Identical content
    /// from a second location only gains a source row; new content is
    /// copied (or moved, when originals aren't preserved) into the sharded
    /// library layout.
    pub async fn ingest_path(&self, path: &Path, source: SourceRef) -> Result<IngestOutcome, SupervisorError> {
        let checksum = Self::checksum_file(path).await?;
        let lock = self.lock_for(&checksum);
        let _guard = lock.lock().await;

        let now = self.clock.now();
        let source_row = LibraryFileSource {
            checksum: checksum.clone(),
            source_type: source.source_type,
            source_id: source.source_id,
            original_path: path.display().to_string(),
            source_name: source.source_name,
            manufacturer: source.manufacturer,
            printer_model: source.printer_model,
            discovered_at: now,
        };

        if let Some(existing) = self.repo.get_file_by_checksum(&checksum).await? {
            self.repo.create_file_source(source_row).await?;
            tracing::debug!(checksum = checksum.short(12), path = %path.display(), "known content, recorded new source");
            return Ok(IngestOutcome { file: existing, newly_added: false });
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| checksum.clone());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bin".to_string());
        let library_path = LibraryFile::sharded_path(&self.root.display().to_string(), &checksum, &extension);
        if let Some(parent) = Path::new(&library_path).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create library shard dir", e))?;
        }
        if self.preserve_originals {
            tokio::fs::copy(path, &library_path)
                .await
                .map_err(|e| io_error("copy into library", e))?;
        } else if tokio::fs::rename(path, &library_path).await.is_err() {
            // Rename fails across filesystems; fall back to copy + remove.
            tokio::fs::copy(path, &library_path)
                .await
                .map_err(|e| io_error("copy into library", e))?;
            let _ = tokio::fs::remove_file(path).await;
        }
        let size_bytes = tokio::fs::metadata(&library_path)
            .await
            .map_err(|e| io_error("stat library file", e))?
            .len();

        let file = LibraryFile {
            checksum: checksum.clone(),
            filename,
            display_name: None,
            library_path,
            size_bytes,
            file_type: FileType::from_extension(&extension),
            status: LibraryFileStatus::Available,
            added_at: now,
            last_modified: None,
            last_analyzed: None,
            is_duplicate: false,
            duplicate_of_checksum: None,
            thumbnail: None,
            metadata: serde_json::Value::Null,
        };
        let file = self.repo.create_file(file).await?;
        self.repo.create_file_source(source_row).await?;
        tracing::info!(checksum = checksum.short(12), filename = %file.filename, size_bytes, "library file added");
        Ok(IngestOutcome { file, newly_added: true })
    }

    /// Recursive scan of one watch folder. Per-file failures are logged and
    /// skipped. Returns `(files_seen, newly_added_checksums)`.
    pub async fn scan_watch_folder(&self, folder: &Path) -> Result<(usize, Vec<String>), SupervisorError> {
        let mut seen = 0usize;
        let mut new_checksums = Vec::new();
        let mut pending = vec![folder.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| io_error("read watch folder", e))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error("read watch folder entry", e))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| io_error("stat watch folder entry", e))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }
                seen += 1;
                match self.ingest_path(&path, SourceRef::watch_folder(folder)).await {
                    Ok(outcome) if outcome.newly_added => new_checksums.push(outcome.file.checksum),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "watch folder ingest failed");
                    }
                }
            }
        }
        Ok((seen, new_checksums))
    }

    /// Ingest files listed on a printer by downloading each through the
    /// driver, gated by the shared download semaphore. Files the driver
    /// cannot transfer are counted as discovered but not ingested.
    pub async fn discover_printer_files(
        &self,
        printer: &Printer,
        driver: &dyn PrinterDriver,
        files: Vec<PrinterFile>,
    ) -> (usize, Vec<String>) {
        let discovered = files.len();
        let mut new_checksums = Vec::new();
        let spool = self.root.join(".incoming");
        for file in files {
            let Ok(_permit) = self.downloads.acquire().await else {
                break;
            };
            if tokio::fs::create_dir_all(&spool).await.is_err() {
                break;
            }
            let local = spool.join(file.name.replace(['/', '\\'], "_"));
            match driver.download_file(&file.path, &local).await {
                Ok(()) => {
                    match self.ingest_path(&local, SourceRef::printer(printer)).await {
                        Ok(outcome) if outcome.newly_added => new_checksums.push(outcome.file.checksum),
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(printer_id = %printer.id, file = %file.path, error = %e, "printer file ingest failed");
                        }
                    }
                    let _ = tokio::fs::remove_file(&local).await;
                }
                Err(printernizer_core::DriverError::Unsupported(_)) => {
                    tracing::debug!(printer_id = %printer.id, file = %file.path, "driver cannot transfer this file, listing only");
                }
                Err(e) => {
                    tracing::warn!(printer_id = %printer.id, file = %file.path, error = %e, "printer file download failed");
                }
            }
        }
        (discovered, new_checksums)
    }

    pub async fn get(&self, checksum: &str) -> Result<Option<LibraryFile>, SupervisorError> {
        self.repo.get_file_by_checksum(checksum).await
    }

    pub async fn list(
        &self,
        filter: &LibraryFilter,
        sort: SortKey,
        page: usize,
        limit: usize,
    ) -> Result<Page<LibraryFile>, SupervisorError> {
        self.repo.list_files(filter, sort, page, limit).await
    }

    pub async fn sources(&self, checksum: &str) -> Result<Vec<LibraryFileSource>, SupervisorError> {
        self.repo.list_file_sources(checksum).await
    }

    pub async fn stats(&self) -> Result<LibraryStats, SupervisorError> {
        self.repo.get_stats().await
    }

    /// Remove one observation location; the file stays (§4.5).
    pub async fn remove_source(&self, source: &LibraryFileSource) -> Result<bool, SupervisorError> {
        self.repo.delete_file_source(source).await
    }

    /// Delete the file, cascading its sources and the on-disk copy (§4.5).
    pub async fn delete_file(&self, checksum: &str) -> Result<(), SupervisorError> {
        let lock = self.lock_for(checksum);
        let _guard = lock.lock().await;
        let file = self
            .repo
            .get_file_by_checksum(checksum)
            .await?
            .ok_or_else(|| SupervisorError::NotFound(format!("library file {checksum}")))?;
        self.repo.delete_file(checksum).await?;
        if file.status.on_disk() {
            if let Err(e) = tokio::fs::remove_file(&file.library_path).await {
                tracing::warn!(checksum = checksum.short(12), error = %e, "library file row deleted but disk removal failed");
            }
        }
        self.locks.lock().remove(checksum);
        Ok(())
    }

    /// Admin path for repairing a historical double-import: flags `checksum`
    /// as a duplicate of `canonical`.
    pub async fn mark_duplicate(&self, checksum: &str, canonical: &str) -> Result<LibraryFile, SupervisorError> {
        self.repo
            .update_file(
                checksum,
                LibraryFilePatch {
                    is_duplicate: Some(true),
                    duplicate_of_checksum: Some(Some(canonical.to_string())),
                    ..Default::default()
                },
            )
            .await
    }
}

#[cfg(test)]
#[path = "library_service_tests.rs"]
mod tests;
