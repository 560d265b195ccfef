use crate::stamp::{file_timestamp, record_timestamp};
use log::Level;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Logging context for one batch run. Constructed explicitly and passed to
/// each component instead of configuring a process-global logger, so the
/// lifecycle is scoped to the run that owns it.
pub trait LogSink {
    fn log(&self, level: Level, msg: &str);

    fn debug(&self, msg: &str) {
        self.log(Level::Debug, msg);
    }

    fn info(&self, msg: &str) {
        self.log(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.log(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.log(Level::Error, msg);
    }
}

/// Per-run log file under `<folder>/logs/pst_repair_<timestamp>.log`,
/// mirrored to stderr.
pub struct RunLog {
    file: Mutex<File>,
    path: PathBuf,
    mirror: bool,
}

impl RunLog {
    pub fn create(folder: &Path) -> Result<Self, String> {
        let log_dir = folder.join("logs");
        fs::create_dir_all(&log_dir)
            .map_err(|err| format!("create log dir {}: {err}", log_dir.display()))?;
        let path = log_dir.join(format!("pst_repair_{}.log", file_timestamp()));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| format!("open run log {}: {err}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
            path,
            mirror: true,
        })
    }

    /// Drops the console mirror; lines still reach the log file.
    pub fn quiet(mut self) -> Self {
        self.mirror = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for RunLog {
    fn log(&self, level: Level, msg: &str) {
        let line = format!("{} - {} - {}", record_timestamp(), level, msg);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
        }
        if self.mirror {
            eprintln!("{line}");
        }
    }
}

/// In-memory sink for asserting on log output in tests.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, msg)| msg.contains(needle))
    }

    pub fn contains_at(&self, level: Level, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(line_level, msg)| *line_level == level && msg.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, msg: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, msg.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn run_log_writes_lines_under_logs_dir() {
        let dir = tempdir().expect("tempdir");
        let log = RunLog::create(dir.path()).expect("create run log").quiet();
        log.info("starting up");
        log.warn("something odd");

        let contents = fs::read_to_string(log.path()).expect("read log file");
        assert!(log.path().starts_with(dir.path().join("logs")));
        assert!(contents.contains("INFO - starting up"));
        assert!(contents.contains("WARN - something odd"));
    }

    #[test]
    fn memory_sink_records_levels() {
        let sink = MemorySink::new();
        sink.debug("fine detail");
        sink.error("boom");
        assert!(sink.contains_at(Level::Debug, "fine detail"));
        assert!(sink.contains_at(Level::Error, "boom"));
        assert!(!sink.contains("missing"));
    }
}
