use crate::artifacts::{relocate_artifacts, RelocateOptions};
use crate::orchestrator::{repair_file, OrchestratorOptions};
use crate::report::{RepairRecord, RepairStatus, RunSummary};
use crate::runlog::LogSink;
use crate::stamp::{file_timestamp, record_timestamp};
use crate::tool::RepairTool;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const TARGET_EXTENSION: &str = "pst";

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("folder not found: {0}")]
    FolderMissing(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub folder: PathBuf,
    /// Throttle between files; not correctness-critical.
    pub settle: Duration,
    pub orchestrator: OrchestratorOptions,
    pub relocate: RelocateOptions,
}

impl BatchOptions {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            settle: Duration::from_secs(5),
            orchestrator: OrchestratorOptions::default(),
            relocate: RelocateOptions::default(),
        }
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub records: Vec<RepairRecord>,
    pub summary: RunSummary,
}

/// Repairs every eligible file in the folder, one at a time. Each file is
/// attempted exactly once; a per-file problem becomes a Failed record and
/// the batch moves on. Only batch-level problems (missing folder,
/// unreadable directory) surface as errors.
pub fn run_batch<T: RepairTool>(
    opts: &BatchOptions,
    tool: &T,
    log: &dyn LogSink,
) -> Result<BatchReport, BatchError> {
    if !opts.folder.exists() {
        log.error(&format!(
            "Error: Folder path {} does not exist!",
            opts.folder.display()
        ));
        return Err(BatchError::FolderMissing(opts.folder.clone()));
    }

    log.info("Starting PST repair process...");
    log.info(&format!(
        "Looking for PST files in: {}",
        opts.folder.display()
    ));

    let targets = select_targets(&opts.folder)?;
    let mut summary = RunSummary::new(&opts.folder, &file_timestamp());
    let mut records = Vec::new();

    for (index, target) in targets.iter().enumerate() {
        log.info(&format!("Processing: {}", target.display()));
        let record = process_target(target, opts, tool, log, &mut summary);
        records.push(record);

        if index + 1 < targets.len() {
            log.info("Waiting before processing next file...");
            thread::sleep(opts.settle);
        }
    }

    summary.records = records.clone();
    Ok(BatchReport { records, summary })
}

/// Files with the target extension (case-insensitive), non-recursive,
/// sorted by name for a stable processing order.
fn select_targets(folder: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut targets = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(TARGET_EXTENSION))
            .unwrap_or(false);
        if matches {
            targets.push(path);
        }
    }
    targets.sort();
    Ok(targets)
}

fn process_target<T: RepairTool>(
    target: &Path,
    opts: &BatchOptions,
    tool: &T,
    log: &dyn LogSink,
    summary: &mut RunSummary,
) -> RepairRecord {
    let file = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.display().to_string());

    let size_mb = match fs::metadata(target) {
        Ok(metadata) => metadata.len() as f64 / (1024.0 * 1024.0),
        Err(err) => {
            log.error(&format!("Error processing {file}: {err}"));
            return RepairRecord {
                file,
                status: RepairStatus::Failed,
                size_mb: 0.0,
                timestamp: record_timestamp(),
                repair_stats: Some(err.to_string()),
            };
        }
    };
    log.info(&format!("File size: {size_mb:.2} MB"));

    let outcome = repair_file(tool, target, size_mb, &opts.orchestrator, log);

    if outcome.success {
        for artifact in relocate_artifacts(target, &opts.relocate, log) {
            if let Err(err) = summary.record_artifact(&artifact) {
                log.warn(&format!(
                    "Could not fingerprint artifact {}: {err}",
                    artifact.display()
                ));
            }
        }
    }

    RepairRecord {
        file,
        status: if outcome.success {
            RepairStatus::Success
        } else {
            RepairStatus::Failed
        },
        size_mb,
        timestamp: record_timestamp(),
        repair_stats: outcome.stats,
    }
}
