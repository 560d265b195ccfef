use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;

pub const SUMMARY_SCHEMA_VERSION: &str = "1";

const STATS_COLUMN_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairStatus {
    Success,
    Failed,
}

impl fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairStatus::Success => f.write_str("Success"),
            RepairStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// One row of the batch report. Appended once per target file and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairRecord {
    pub file: String,
    pub status: RepairStatus,
    pub size_mb: f64,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair_stats: Option<String>,
}

/// Artifact moved by the relocator, fingerprinted for the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

/// Machine-readable companion to the delimited report: everything the run
/// produced, in one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: String,
    pub run_id: String,
    pub folder: String,
    pub records: Vec<RepairRecord>,
    pub artifacts: Vec<ArtifactRecord>,
}

impl RunSummary {
    pub fn new(folder: &Path, run_id: &str) -> Self {
        Self {
            schema_version: SUMMARY_SCHEMA_VERSION.to_string(),
            run_id: run_id.to_string(),
            folder: folder.display().to_string(),
            records: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn record_artifact(&mut self, path: &Path) -> Result<(), String> {
        let (sha256, size) = hash_file(path)?;
        self.artifacts.push(ArtifactRecord {
            path: path.display().to_string(),
            sha256,
            size,
        });
        Ok(())
    }
}

pub fn hash_file(path: &Path) -> Result<(String, u64), String> {
    let bytes = fs::read(path).map_err(|err| format!("read {}: {err}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    Ok((hex, bytes.len() as u64))
}

/// Fixed-width results table for stdout.
pub fn render_table(records: &[RepairRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<50} {:<10} {:<15} {:<20} {:<30}\n",
        "File", "Status", "Size (MB)", "Timestamp", "Repair Statistics"
    ));
    out.push_str(&"-".repeat(125));
    out.push('\n');
    for record in records {
        let stats = record.repair_stats.as_deref().unwrap_or("");
        let stats: String = stats.chars().take(STATS_COLUMN_WIDTH).collect();
        out.push_str(&format!(
            "{:<50} {:<10} {:<15} {:<20} {:<30}\n",
            record.file,
            record.status.to_string(),
            format!("{:.2}", record.size_mb),
            record.timestamp,
            stats
        ));
    }
    out
}

/// Delimited results file: `file,status,size_mb,timestamp,repair_stats`.
pub fn write_results_csv(path: &Path, records: &[RepairRecord]) -> Result<(), String> {
    let mut out = String::from("file,status,size_mb,timestamp,repair_stats\n");
    for record in records {
        out.push_str(&format!(
            "{},{},{:.2},{},{}\n",
            csv_field(&record.file),
            record.status,
            record.size_mb,
            csv_field(&record.timestamp),
            csv_field(record.repair_stats.as_deref().unwrap_or(""))
        ));
    }
    fs::write(path, out).map_err(|err| format!("write results {}: {err}", path.display()))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn write_run_summary(path: &Path, summary: &RunSummary) -> Result<(), String> {
    let json = serde_json::to_string_pretty(summary).map_err(|err| err.to_string())?;
    fs::write(path, json).map_err(|err| format!("write run summary {}: {err}", path.display()))
}
