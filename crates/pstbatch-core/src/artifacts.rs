use crate::poll::{poll_until, Poll};
use crate::runlog::LogSink;
use crate::stamp::file_timestamp;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RelocateOptions {
    /// Bound on release checks before the log file is given up on.
    pub release_attempts: u32,
    pub release_interval: Duration,
}

impl Default for RelocateOptions {
    fn default() -> Self {
        Self {
            release_attempts: 10,
            release_interval: Duration::from_secs(1),
        }
    }
}

/// Moves the backup and log files the utility leaves beside a successfully
/// repaired target. Both moves are best-effort: the repair already
/// succeeded, so a relocation problem is logged and swallowed. Returns the
/// paths the artifacts ended up at.
pub fn relocate_artifacts(
    target: &Path,
    opts: &RelocateOptions,
    log: &dyn LogSink,
) -> Vec<PathBuf> {
    relocate_with_probe(target, opts, log, &mut writable_probe)
}

/// Variant with an injectable release probe, so tests can simulate a log
/// file that another process holds open.
pub fn relocate_with_probe(
    target: &Path,
    opts: &RelocateOptions,
    log: &dyn LogSink,
    releasable: &mut dyn FnMut(&Path) -> bool,
) -> Vec<PathBuf> {
    let mut relocated = Vec::new();

    let backup = target.with_extension("bak");
    if backup.exists() {
        let renamed = next_backup_path(target);
        match fs::rename(&backup, &renamed) {
            Ok(()) => {
                log.info(&format!(
                    "Renamed backup file to: {}",
                    renamed
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| renamed.display().to_string())
                ));
                relocated.push(renamed);
            }
            Err(err) => log.error(&format!("Error managing backup file: {err}")),
        }
    }

    let produced_log = target.with_extension("log");
    if produced_log.exists() {
        if wait_for_release(&produced_log, opts, releasable) {
            match move_log(target, &produced_log) {
                Ok(moved) => {
                    log.info(&format!(
                        "Moved log file to: logs/{}",
                        moved
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_else(|| moved.display().to_string())
                    ));
                    relocated.push(moved);
                }
                Err(err) => log.error(&format!("Error managing log file: {err}")),
            }
        } else {
            log.warn("Could not access log file - it may still be in use");
        }
    }

    relocated
}

/// First unused `<stem>_<n>.bak` beside the target, scanning upward from 1
/// so previously relocated backups are never overwritten.
fn next_backup_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut suffix = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}_{suffix}.bak"));
        if !candidate.exists() {
            return candidate;
        }
        suffix += 1;
    }
}

fn wait_for_release(
    path: &Path,
    opts: &RelocateOptions,
    releasable: &mut dyn FnMut(&Path) -> bool,
) -> bool {
    let deadline = Instant::now() + opts.release_interval * opts.release_attempts;
    let result = poll_until(opts.release_interval, deadline, || {
        releasable(path).then_some(())
    });
    matches!(result, Poll::Matched(()))
}

fn move_log(target: &Path, produced_log: &Path) -> Result<PathBuf, String> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let log_dir = dir.join("logs");
    fs::create_dir_all(&log_dir)
        .map_err(|err| format!("create log dir {}: {err}", log_dir.display()))?;
    let stem = target
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let destination = log_dir.join(format!("{stem}_{}.log", file_timestamp()));
    fs::rename(produced_log, &destination).map_err(|err| {
        format!(
            "move {} to {}: {err}",
            produced_log.display(),
            destination.display()
        )
    })?;
    Ok(destination)
}

fn writable_probe(path: &Path) -> bool {
    OpenOptions::new().write(true).open(path).is_ok()
}
