use log::Level;
use pstbatch_core::runlog::MemorySink;
use pstbatch_core::tool::{ScriptedBehavior, ScriptedTool};
use pstbatch_core::{repair_file, OrchestratorOptions};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

fn fast_opts() -> OrchestratorOptions {
    OrchestratorOptions {
        window_wait: Duration::from_millis(50),
        window_poll: Duration::from_millis(1),
        scan_poll: Duration::from_millis(1),
        repair_poll: Duration::from_millis(1),
        progress_every: Duration::from_secs(300),
        dismiss_settle: Duration::from_millis(1),
        deadline_override: Some(Duration::from_millis(250)),
    }
}

fn target_in(dir: &tempfile::TempDir) -> PathBuf {
    let target = dir.path().join("inbox.pst");
    fs::write(&target, vec![0u8; 2048]).expect("write target");
    target
}

#[test]
fn full_run_succeeds_and_captures_stats() {
    let dir = tempdir().expect("tempdir");
    let target = target_in(&dir);
    let tool = ScriptedTool::new(ScriptedBehavior::default());
    let sink = MemorySink::new();

    let outcome = repair_file(&tool, &target, 2.0, &fast_opts(), &sink);

    assert!(outcome.success);
    let stats = outcome.stats.expect("stats captured");
    assert!(stats.contains("items"));
    assert_eq!(outcome.timeout, Duration::from_millis(250));

    let recorder = tool.recorder();
    assert_eq!(
        recorder.entered_path().as_deref(),
        Some(target.to_string_lossy().as_ref())
    );
    assert!(recorder.backup_checked());
    assert_eq!(recorder.start_clicks(), 1);
    assert_eq!(recorder.repair_clicks(), 1);
    assert_eq!(recorder.ok_clicks(), 1);

    assert!(target.with_extension("bak").exists());
    assert!(target.with_extension("log").exists());

    assert!(sink.contains("Main window found"));
    assert!(sink.contains("Started scanning..."));
    assert!(sink.contains("Backup checkbox checked"));
    assert!(sink.contains("Found completion dialog, clicking OK"));
}

#[test]
fn missing_window_times_out_without_panicking() {
    let dir = tempdir().expect("tempdir");
    let target = target_in(&dir);
    let tool = ScriptedTool::new(ScriptedBehavior {
        never_show_window: true,
        ..ScriptedBehavior::default()
    });
    let sink = MemorySink::new();

    let outcome = repair_file(&tool, &target, 2.0, &fast_opts(), &sink);

    assert!(!outcome.success);
    assert!(outcome.stats.is_none());
    assert!(sink.contains("not found within"));
    assert_eq!(tool.recorder().start_clicks(), 0);
}

#[test]
fn duplicate_titled_windows_warn_and_first_wins() {
    let dir = tempdir().expect("tempdir");
    let target = target_in(&dir);
    let tool = ScriptedTool::new(ScriptedBehavior {
        stale_window: true,
        ..ScriptedBehavior::default()
    });
    let sink = MemorySink::new();

    let outcome = repair_file(&tool, &target, 2.0, &fast_opts(), &sink);

    assert!(outcome.success);
    assert!(sink.contains_at(Level::Warn, "using the first"));
    assert_eq!(tool.recorder().start_clicks(), 1);
    assert_eq!(tool.recorder().ok_clicks(), 1);
}

#[test]
fn window_wait_message_reports_the_effective_budget() {
    let dir = tempdir().expect("tempdir");
    let target = target_in(&dir);
    let tool = ScriptedTool::new(ScriptedBehavior {
        never_show_window: true,
        ..ScriptedBehavior::default()
    });
    let sink = MemorySink::new();
    // The overall deadline undercuts the configured window wait.
    let opts = OrchestratorOptions {
        window_wait: Duration::from_secs(60),
        deadline_override: Some(Duration::from_millis(30)),
        ..fast_opts()
    };

    let outcome = repair_file(&tool, &target, 2.0, &opts, &sink);

    assert!(!outcome.success);
    assert!(sink.contains("not found within 0 seconds"));
}

#[test]
fn stalled_scan_times_out() {
    let dir = tempdir().expect("tempdir");
    let target = target_in(&dir);
    let tool = ScriptedTool::new(ScriptedBehavior {
        scan_polls: 1_000_000,
        ..ScriptedBehavior::default()
    });
    let sink = MemorySink::new();

    let outcome = repair_file(&tool, &target, 2.0, &fast_opts(), &sink);

    assert!(!outcome.success);
    assert!(sink.contains("Operation timed out"));
}

#[test]
fn missing_completion_dialog_fails_and_skips_forced_close() {
    let dir = tempdir().expect("tempdir");
    let target = target_in(&dir);
    let tool = ScriptedTool::new(ScriptedBehavior {
        never_complete: true,
        ..ScriptedBehavior::default()
    });
    let sink = MemorySink::new();

    let outcome = repair_file(&tool, &target, 2.0, &fast_opts(), &sink);

    assert!(!outcome.success);
    assert!(sink.contains("Repair completion dialog not found"));
    // The stuck session still shows in-progress text, so cleanup must not
    // close its windows.
    assert!(sink.contains("Active repair process detected"));
    assert_eq!(tool.recorder().closed_windows(), 0);
}

#[test]
fn launch_failure_becomes_failed_outcome() {
    let dir = tempdir().expect("tempdir");
    let target = target_in(&dir);
    let tool = ScriptedTool::new(ScriptedBehavior {
        fail_launch: true,
        ..ScriptedBehavior::default()
    });
    let sink = MemorySink::new();

    let outcome = repair_file(&tool, &target, 2.0, &fast_opts(), &sink);

    assert!(!outcome.success);
    assert!(sink.contains("Error launching repair utility"));
}

#[test]
fn progress_diagnostics_are_logged_when_cadence_elapses() {
    let dir = tempdir().expect("tempdir");
    let target = target_in(&dir);
    let tool = ScriptedTool::new(ScriptedBehavior::default());
    let sink = MemorySink::new();
    let opts = OrchestratorOptions {
        progress_every: Duration::ZERO,
        ..fast_opts()
    };

    let outcome = repair_file(&tool, &target, 2.0, &opts, &sink);

    assert!(outcome.success);
    assert!(sink.contains("Current progress:"));
    assert!(sink.contains("still responding"));
}
