//! S5: identical content observed from two sources is one library file
//! with two source rows; removing a source never removes the file, and
//! deleting the file cascades.

use std::path::Path;

use printernizer_core::library::SourceType;
use printernizer_engine::SourceRef;

use crate::prelude::*;

fn printer_source() -> SourceRef {
    SourceRef {
        source_type: SourceType::Printer,
        source_id: PRINTER_ID.into(),
        source_name: Some(PRINTER_ID.into()),
        manufacturer: Some("Bambu Lab".into()),
        printer_model: None,
    }
}

#[tokio::test]
async fn same_checksum_from_printer_and_watch_folder_is_one_file_two_sources() {
    let h = Harness::new();
    let library = h.supervisor.library();
    let staging = tempfile::tempdir().unwrap();

    let cache = staging.path().join("cache");
    std::fs::create_dir_all(&cache).unwrap();
    std::fs::write(cache.join("a.3mf"), b"identical 3mf payload").unwrap();
    let watch = staging.path().join("w");
    std::fs::create_dir_all(&watch).unwrap();
    std::fs::write(watch.join("a.3mf"), b"identical 3mf payload").unwrap();

    let first = library.ingest_path(&cache.join("a.3mf"), printer_source()).await.unwrap();
    assert!(first.newly_added);
    let second = library
        .ingest_path(&watch.join("a.3mf"), SourceRef::watch_folder(&watch))
        .await
        .unwrap();
    assert!(!second.newly_added);
    assert_eq!(second.file.checksum, first.file.checksum);

    let checksum = first.file.checksum;
    assert_eq!(library.stats().await.unwrap().total_files, 1);
    let sources = library.sources(&checksum).await.unwrap();
    assert_eq!(sources.len(), 2);

    // Removing the printer source leaves the file and the other source.
    let printer_row = sources.iter().find(|s| s.source_type == SourceType::Printer).unwrap();
    assert!(library.remove_source(printer_row).await.unwrap());
    assert!(library.get(&checksum).await.unwrap().is_some());
    assert_eq!(library.sources(&checksum).await.unwrap().len(), 1);

    // Deleting the file cascades to the remaining source and the disk copy.
    let library_path = first.file.library_path.clone();
    library.delete_file(&checksum).await.unwrap();
    assert!(library.get(&checksum).await.unwrap().is_none());
    assert!(library.sources(&checksum).await.unwrap().is_empty());
    assert!(!Path::new(&library_path).exists());
}

#[tokio::test]
async fn re_observing_the_same_source_is_idempotent() {
    let h = Harness::new();
    let library = h.supervisor.library();
    let staging = tempfile::tempdir().unwrap();
    std::fs::write(staging.path().join("part.stl"), b"solid").unwrap();

    let path = staging.path().join("part.stl");
    library.ingest_path(&path, SourceRef::watch_folder(staging.path())).await.unwrap();
    let again = library.ingest_path(&path, SourceRef::watch_folder(staging.path())).await.unwrap();
    assert!(!again.newly_added);
    assert_eq!(library.sources(&again.file.checksum).await.unwrap().len(), 1);
}
