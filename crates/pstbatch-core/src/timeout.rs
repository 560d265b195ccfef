use std::time::Duration;

const BASE_SECS: f64 = 1800.0;
const CEILING_SECS: f64 = 86_400.0;
const SECS_PER_GB: f64 = 1800.0;

/// Scan/repair deadline derived from the target file size.
///
/// 30 minutes of budget for anything up to a gigabyte, another 30 minutes
/// per gigabyte after that, capped at 24 hours for extremely large files.
pub fn repair_timeout(size_mb: f64) -> Duration {
    let size_mb = size_mb.max(0.0);
    let total = BASE_SECS + (size_mb / 1024.0) * SECS_PER_GB;
    Duration::from_secs_f64(total.clamp(BASE_SECS, CEILING_SECS))
}
