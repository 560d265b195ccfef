use pstbatch_core::artifacts::{relocate_artifacts, relocate_with_probe, RelocateOptions};
use pstbatch_core::runlog::MemorySink;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

fn fast_opts() -> RelocateOptions {
    RelocateOptions {
        release_attempts: 5,
        release_interval: Duration::from_millis(1),
    }
}

#[test]
fn backup_moves_to_first_free_suffix() {
    let dir = tempdir().expect("tempdir");
    let target = dir.path().join("inbox.pst");
    fs::write(&target, b"pst").expect("write target");
    fs::write(dir.path().join("inbox.bak"), b"fresh backup").expect("write backup");
    let sink = MemorySink::new();

    let relocated = relocate_artifacts(&target, &fast_opts(), &sink);

    assert_eq!(relocated, vec![dir.path().join("inbox_1.bak")]);
    assert!(!dir.path().join("inbox.bak").exists());
    assert_eq!(
        fs::read(dir.path().join("inbox_1.bak")).expect("read backup"),
        b"fresh backup"
    );
    assert!(sink.contains("Renamed backup file to: inbox_1.bak"));
}

#[test]
fn existing_suffixed_backups_are_never_overwritten() {
    let dir = tempdir().expect("tempdir");
    let target = dir.path().join("inbox.pst");
    fs::write(&target, b"pst").expect("write target");
    fs::write(dir.path().join("inbox_1.bak"), b"old backup").expect("write old");
    fs::write(dir.path().join("inbox.bak"), b"new backup").expect("write new");
    let sink = MemorySink::new();

    relocate_artifacts(&target, &fast_opts(), &sink);

    assert_eq!(
        fs::read(dir.path().join("inbox_1.bak")).expect("read old"),
        b"old backup"
    );
    assert_eq!(
        fs::read(dir.path().join("inbox_2.bak")).expect("read new"),
        b"new backup"
    );
}

#[test]
fn log_moves_into_timestamped_logs_dir() {
    let dir = tempdir().expect("tempdir");
    let target = dir.path().join("inbox.pst");
    fs::write(&target, b"pst").expect("write target");
    fs::write(dir.path().join("inbox.log"), b"repair details").expect("write log");
    let sink = MemorySink::new();

    let relocated = relocate_artifacts(&target, &fast_opts(), &sink);

    assert_eq!(relocated.len(), 1);
    let moved = &relocated[0];
    assert!(moved.starts_with(dir.path().join("logs")));
    let name = moved.file_name().expect("name").to_string_lossy();
    assert!(name.starts_with("inbox_"));
    assert!(name.ends_with(".log"));
    assert_eq!(fs::read(moved).expect("read moved"), b"repair details");
    assert!(!dir.path().join("inbox.log").exists());
}

#[test]
fn locked_log_is_left_in_place_after_bounded_retries() {
    let dir = tempdir().expect("tempdir");
    let target = dir.path().join("inbox.pst");
    fs::write(&target, b"pst").expect("write target");
    fs::write(dir.path().join("inbox.log"), b"held open").expect("write log");
    let sink = MemorySink::new();

    let mut probes = 0u32;
    let mut never_released = |_: &std::path::Path| {
        probes += 1;
        false
    };
    let relocated = relocate_with_probe(&target, &fast_opts(), &sink, &mut never_released);

    assert!(relocated.is_empty());
    assert!(probes >= 2);
    assert!(dir.path().join("inbox.log").exists());
    assert!(sink.contains("Could not access log file"));
    assert!(!dir.path().join("logs").exists());
}

#[test]
fn nothing_to_relocate_is_a_quiet_no_op() {
    let dir = tempdir().expect("tempdir");
    let target = dir.path().join("inbox.pst");
    fs::write(&target, b"pst").expect("write target");
    let sink = MemorySink::new();

    let relocated: Vec<PathBuf> = relocate_artifacts(&target, &fast_opts(), &sink);

    assert!(relocated.is_empty());
    assert!(sink.lines().is_empty());
}
