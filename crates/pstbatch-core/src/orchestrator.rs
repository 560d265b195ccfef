use crate::poll::{poll_until, Poll};
use crate::runlog::LogSink;
use crate::timeout::repair_timeout;
use crate::tool::{
    ControlState, RepairTool, ToolSession, WindowHandle, BACKUP_CHECKBOX, COMPLETE_TEXT,
    MAIN_WINDOW_TITLE, OK_CONTROL, PATH_CONTROL, REPAIR_CONTROL, START_CONTROL,
};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Polling cadences and wait budgets for one repair. Defaults mirror the
/// reference behavior; tests shrink them to milliseconds.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Budget for the input window to appear after launch.
    pub window_wait: Duration,
    pub window_poll: Duration,
    /// Interval between checks for the enabled repair control.
    pub scan_poll: Duration,
    /// Interval between checks for the completion dialog.
    pub repair_poll: Duration,
    /// Cadence of diagnostic progress/liveness logging.
    pub progress_every: Duration,
    /// Pause after dismissing the completion dialog.
    pub dismiss_settle: Duration,
    /// Replaces the size-derived deadline when set.
    pub deadline_override: Option<Duration>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            window_wait: Duration::from_secs(30),
            window_poll: Duration::from_millis(500),
            scan_poll: Duration::from_secs(5),
            repair_poll: Duration::from_millis(500),
            progress_every: Duration::from_secs(300),
            dismiss_settle: Duration::from_secs(1),
            deadline_override: None,
        }
    }
}

/// Result of one repair attempt. The orchestrator never propagates an
/// error past its boundary; failures come back as `success = false` with
/// the reason already logged.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub success: bool,
    pub stats: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Launching,
    AwaitingInputWindow,
    Scanning,
    AwaitingRepairPrompt,
    Repairing,
    AwaitingCompletionDialog,
    Done,
    Failed,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Launching => "launching",
            Phase::AwaitingInputWindow => "awaiting-input-window",
            Phase::Scanning => "scanning",
            Phase::AwaitingRepairPrompt => "awaiting-repair-prompt",
            Phase::Repairing => "repairing",
            Phase::AwaitingCompletionDialog => "awaiting-completion-dialog",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }
}

fn enter(phase: Phase, log: &dyn LogSink) {
    log.debug(&format!("phase: {}", phase.as_str()));
}

/// Drives the external utility through one scan-and-repair cycle for
/// `target`. Cleanup of the utility's windows runs on every exit path.
pub fn repair_file<T: RepairTool>(
    tool: &T,
    target: &Path,
    size_mb: f64,
    opts: &OrchestratorOptions,
    log: &dyn LogSink,
) -> RepairOutcome {
    let timeout = opts.deadline_override.unwrap_or_else(|| repair_timeout(size_mb));

    enter(Phase::Launching, log);
    log.info(&format!("Launching repair utility for: {}", target.display()));
    log.info(&format!("File size: {size_mb:.2} MB"));
    log.info(&format!(
        "Timeout set to: {:.1} hours",
        timeout.as_secs_f64() / 3600.0
    ));

    let deadline = Instant::now() + timeout;
    let session = match tool.launch(target) {
        Ok(session) => session,
        Err(err) => {
            log.error(&format!("Error launching repair utility: {err}"));
            enter(Phase::Failed, log);
            return RepairOutcome {
                success: false,
                stats: None,
                timeout,
            };
        }
    };

    let result = drive(&session, target, deadline, timeout, opts, log);
    cleanup(&session, log);

    match result {
        Ok(stats) => {
            enter(Phase::Done, log);
            RepairOutcome {
                success: true,
                stats,
                timeout,
            }
        }
        Err(err) => {
            log.error(&err);
            enter(Phase::Failed, log);
            RepairOutcome {
                success: false,
                stats: None,
                timeout,
            }
        }
    }
}

fn drive<S: ToolSession>(
    session: &S,
    target: &Path,
    deadline: Instant,
    timeout: Duration,
    opts: &OrchestratorOptions,
    log: &dyn LogSink,
) -> Result<Option<String>, String> {
    enter(Phase::AwaitingInputWindow, log);
    // The overall deadline can be shorter than the window wait; whichever
    // bound applies is the one reported.
    let window_budget = opts
        .window_wait
        .min(deadline.saturating_duration_since(Instant::now()));
    let window_deadline = Instant::now() + window_budget;
    let main = match poll_until(opts.window_poll, window_deadline, || {
        find_main_window(session, log)
    }) {
        Poll::Matched(window) => window,
        Poll::TimedOut => {
            return Err(format!(
                "Window '{MAIN_WINDOW_TITLE}' not found within {} seconds",
                window_budget.as_secs()
            ))
        }
    };
    log.info("Main window found");

    session
        .set_text(&main, PATH_CONTROL, &target.to_string_lossy())
        .map_err(|err| format!("Error entering target path: {err}"))?;
    log.info("Target path entered");
    session
        .click(&main, START_CONTROL)
        .map_err(|err| format!("Error invoking start control: {err}"))?;
    log.info("Started scanning...");

    enter(Phase::Scanning, log);
    let mut last_report = Instant::now();
    let ready = poll_until(opts.scan_poll, deadline, || {
        if last_report.elapsed() >= opts.progress_every {
            report_progress(session, log);
            report_liveness(session, log);
            last_report = Instant::now();
        }
        find_repair_ready(session, log)
    });
    let prompt = match ready {
        Poll::Matched(window) => window,
        Poll::TimedOut => {
            return Err(format!(
                "Operation timed out after {:.1} hours",
                timeout.as_secs_f64() / 3600.0
            ))
        }
    };

    enter(Phase::AwaitingRepairPrompt, log);
    log.info("Scan completed, repair control ready");
    match session.set_checked(&prompt, BACKUP_CHECKBOX, true) {
        Ok(()) => log.info("Backup checkbox checked"),
        Err(err) => log.warn(&format!("Backup checkbox interaction error: {err}")),
    }
    session
        .click(&prompt, REPAIR_CONTROL)
        .map_err(|err| format!("Error invoking repair control: {err}"))?;
    log.info("Starting repair...");

    enter(Phase::Repairing, log);
    let mut last_note = Instant::now();
    let dialog = poll_until(opts.repair_poll, deadline, || {
        if last_note.elapsed() >= opts.progress_every {
            log.info("Repair is still in progress...");
            last_note = Instant::now();
        }
        find_completion_dialog(session, log)
    });
    let (dialog, stats) = match dialog {
        Poll::Matched(found) => found,
        Poll::TimedOut => {
            return Err("Repair completion dialog not found within timeout".to_string())
        }
    };

    enter(Phase::AwaitingCompletionDialog, log);
    log.info("Found completion dialog, clicking OK");
    session
        .click(&dialog, OK_CONTROL)
        .map_err(|err| format!("Error dismissing completion dialog: {err}"))?;
    thread::sleep(opts.dismiss_settle);
    Ok(stats)
}

/// First window carrying the expected title. More than one such window is
/// ambiguous (a stale instance may linger from an earlier run), so it is
/// flagged in the log before the first match wins.
fn find_main_window<S: ToolSession>(session: &S, log: &dyn LogSink) -> Option<WindowHandle> {
    let matches = match session.find_windows(MAIN_WINDOW_TITLE) {
        Ok(matches) => matches,
        Err(err) => {
            log.debug(&format!("Waiting for window '{MAIN_WINDOW_TITLE}': {err}"));
            return None;
        }
    };
    if matches.len() > 1 {
        log.warn(&format!(
            "{} windows titled '{MAIN_WINDOW_TITLE}' found; using the first",
            matches.len()
        ));
    }
    matches.into_iter().next()
}

fn find_repair_ready<S: ToolSession>(session: &S, log: &dyn LogSink) -> Option<WindowHandle> {
    let window = find_main_window(session, log)?;
    match session.is_enabled(&window, REPAIR_CONTROL) {
        Ok(true) => Some(window),
        Ok(false) => None,
        Err(err) => {
            log.debug(&format!("Error in repair loop: {err}"));
            None
        }
    }
}

fn find_completion_dialog<S: ToolSession>(
    session: &S,
    log: &dyn LogSink,
) -> Option<(WindowHandle, Option<String>)> {
    let windows = match session.windows() {
        Ok(windows) => windows,
        Err(err) => {
            log.debug(&format!("Error in completion check: {err}"));
            return None;
        }
    };
    for window in windows {
        if window.title != MAIN_WINDOW_TITLE {
            continue;
        }
        let controls = match session.controls(&window) {
            Ok(controls) => controls,
            Err(err) => {
                log.debug(&format!("Error in completion check: {err}"));
                continue;
            }
        };
        let complete = controls.iter().any(|control| control.title == COMPLETE_TEXT);
        let has_ok = controls.iter().any(|control| control.title == OK_CONTROL);
        if complete && has_ok {
            let stats = capture_stats(&controls);
            return Some((window, stats));
        }
    }
    None
}

/// Statistics text from the completion dialog, when the utility shows any.
fn capture_stats(controls: &[ControlState]) -> Option<String> {
    controls
        .iter()
        .map(|control| control.title.trim())
        .find(|text| {
            let lower = text.to_lowercase();
            lower.contains("items") || lower.contains("found") || lower.contains("repaired")
        })
        .map(str::to_string)
}

/// Best-effort progress text from any visible window; diagnostics only.
fn report_progress<S: ToolSession>(session: &S, log: &dyn LogSink) {
    let Ok(windows) = session.windows() else {
        return;
    };
    for window in &windows {
        if let Some(progress) = progress_text(session, window) {
            log.info(&format!("Current progress: {progress}"));
            return;
        }
    }
}

fn progress_text<S: ToolSession>(session: &S, window: &WindowHandle) -> Option<String> {
    let controls = session.controls(window).ok()?;
    controls
        .iter()
        .map(|control| control.title.trim())
        .find(|text| text.contains('%') || text.to_lowercase().contains("items"))
        .map(str::to_string)
}

fn report_liveness<S: ToolSession>(session: &S, log: &dyn LogSink) {
    let Ok(windows) = session.windows() else {
        return;
    };
    let responding = windows
        .iter()
        .any(|window| session.is_responding(window).unwrap_or(false));
    if responding {
        log.info("Repair utility process is still responding");
    }
}

/// Closes the utility's windows unless one of them still shows an
/// in-progress repair; interrupting an active repair risks the target
/// file, so those windows are left alone.
fn cleanup<S: ToolSession>(session: &S, log: &dyn LogSink) {
    log.info("Checking window status before cleanup...");
    let windows = match session.windows() {
        Ok(windows) => windows,
        Err(err) => {
            log.debug(&format!("Error in cleanup: {err}"));
            return;
        }
    };
    for window in &windows {
        if session.is_responding(window).unwrap_or(false) && repair_in_progress(session, window) {
            log.warn("Active repair process detected - not forcing close");
            return;
        }
    }
    if !windows.is_empty() {
        log.info("Cleaning up windows...");
    }
    for window in &windows {
        if let Err(err) = session.close_window(window) {
            log.debug(&format!("Error closing window '{}': {err}", window.title));
        }
    }
}

fn repair_in_progress<S: ToolSession>(session: &S, window: &WindowHandle) -> bool {
    let Ok(controls) = session.controls(window) else {
        return false;
    };
    controls
        .iter()
        .any(|control| control.title.to_lowercase().contains("repairing"))
}
