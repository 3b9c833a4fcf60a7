use std::fs;

use enhance_engine::{ensure_output_dir, safe_file_name, AtomicFileWriter, MediaStore};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_result() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("x.wav", b"first").unwrap();
    assert_eq!(first.file_name().unwrap(), "x.wav");
    assert_eq!(fs::read(&first).unwrap(), b"first");

    let second = writer.write("x.wav", b"second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"second");
}

#[test]
fn server_names_cannot_leave_download_dir() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("downloads"));
    let saved = writer.write("../../etc/x.wav", b"data").unwrap();
    assert_eq!(saved, temp.path().join("downloads").join("x.wav"));

    assert_eq!(safe_file_name(r"C:\out\y.wav"), "y.wav");
    assert_eq!(safe_file_name("what?.wav"), "what_.wav");
    assert_eq!(safe_file_name(".."), "enhanced.wav");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("x.wav", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("x.wav").exists());
}

#[test]
fn media_store_only_releases_its_own_files() {
    let temp = TempDir::new().unwrap();
    let store = MediaStore::new(temp.path().join("media"));

    let owned = store.store(1, b"audio").unwrap();
    assert!(owned.exists());
    assert_eq!(store.owned_count(), 1);

    let foreign = temp.path().join("user.wav");
    fs::write(&foreign, b"mine").unwrap();
    assert!(!store.release(&foreign).unwrap());
    assert!(foreign.exists());

    assert!(store.release(&owned).unwrap());
    assert!(!owned.exists());
    assert!(!store.release(&owned).unwrap());
}

#[test]
fn dropping_store_cleans_up() {
    let temp = TempDir::new().unwrap();
    let path = {
        let store = MediaStore::new(temp.path().join("media"));
        store.store(2, b"audio").unwrap()
    };
    assert!(!path.exists());
}
