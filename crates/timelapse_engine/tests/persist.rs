use std::fs;

use timelapse_engine::{ensure_output_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("renders");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("clip.mp4", b"first").unwrap();
    assert_eq!(first.file_name().unwrap(), "clip.mp4");
    assert_eq!(fs::read(&first).unwrap(), b"first");

    let second = writer.write("clip.mp4", b"second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"second");
}

#[test]
fn streamed_write_only_appears_on_commit() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let mut pending = writer.begin("out.mp4").unwrap();
    pending.write_chunk(b"abc").unwrap();
    pending.write_chunk(b"def").unwrap();
    assert_eq!(pending.bytes_written(), 6);
    assert!(!temp.path().join("out.mp4").exists());

    let path = pending.commit().unwrap();
    assert_eq!(fs::read(path).unwrap(), b"abcdef");
}

#[test]
fn abandoned_write_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let mut pending = writer.begin("out.mp4").unwrap();
    pending.write_chunk(b"partial").unwrap();
    drop(pending);

    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn output_path_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("clip.mp4", b"data").is_err());
    assert!(!file_path.with_file_name("clip.mp4").exists());
}
