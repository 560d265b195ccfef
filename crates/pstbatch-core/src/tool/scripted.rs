use crate::tool::types::{
    ControlKind, ControlState, RepairTool, ToolSession, WindowHandle, BACKUP_CHECKBOX,
    COMPLETE_TEXT, MAIN_WINDOW_TITLE, OK_CONTROL, PATH_CONTROL, REPAIR_CONTROL, START_CONTROL,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const BEHAVIOR_SCHEMA_VERSION: &str = "1";

/// Deterministic stand-in for the GUI utility. Walks the same phase
/// sequence the real tool exposes (input window, scan, repair prompt,
/// completion dialog) and drops the `.bak`/`.log` side artifacts beside the
/// target when the completion dialog is dismissed.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedBehavior {
    /// Window polls the scan phase consumes before the repair control
    /// becomes enabled.
    #[serde(default = "default_phase_polls")]
    pub scan_polls: u32,
    /// Window polls the repair phase consumes before the completion dialog
    /// appears.
    #[serde(default = "default_phase_polls")]
    pub repair_polls: u32,
    #[serde(default)]
    pub fail_launch: bool,
    #[serde(default)]
    pub never_show_window: bool,
    #[serde(default)]
    pub never_complete: bool,
    /// Presents a second identically-titled window alongside the real one,
    /// as a leftover instance from an earlier run would.
    #[serde(default)]
    pub stale_window: bool,
    #[serde(default = "default_true")]
    pub produce_backup: bool,
    #[serde(default = "default_true")]
    pub produce_log: bool,
    #[serde(default = "default_progress_text")]
    pub progress_text: String,
    #[serde(default = "default_stats_text")]
    pub stats_text: Option<String>,
}

fn default_phase_polls() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

fn default_progress_text() -> String {
    "Scanning folder 3 of 12 (37% complete)".to_string()
}

fn default_stats_text() -> Option<String> {
    Some("8 items found, 8 items repaired".to_string())
}

impl Default for ScriptedBehavior {
    fn default() -> Self {
        Self {
            scan_polls: default_phase_polls(),
            repair_polls: default_phase_polls(),
            fail_launch: false,
            never_show_window: false,
            never_complete: false,
            stale_window: false,
            produce_backup: true,
            produce_log: true,
            progress_text: default_progress_text(),
            stats_text: default_stats_text(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BehaviorFile {
    schema_version: String,
    #[serde(flatten)]
    behavior: ScriptedBehavior,
}

impl ScriptedBehavior {
    /// Loads a behavior description from a JSON file, for `--tool mock`
    /// runs without a real utility installed.
    pub fn load(path: &Path) -> Result<Self, String> {
        let payload = fs::read_to_string(path)
            .map_err(|err| format!("read behavior file {}: {err}", path.display()))?;
        let file: BehaviorFile =
            serde_json::from_str(&payload).map_err(|err| format!("parse behavior file: {err}"))?;
        if file.schema_version != BEHAVIOR_SCHEMA_VERSION {
            return Err(format!(
                "unsupported behavior schema version: {}",
                file.schema_version
            ));
        }
        Ok(file.behavior)
    }
}

/// Interactions observed by scripted sessions, for assertions in tests.
#[derive(Debug, Default)]
pub struct ScriptedRecorder {
    inner: Mutex<RecorderState>,
}

#[derive(Debug, Default, Clone)]
struct RecorderState {
    entered_path: Option<String>,
    backup_checked: bool,
    start_clicks: u32,
    repair_clicks: u32,
    ok_clicks: u32,
    closed_windows: u32,
}

impl ScriptedRecorder {
    fn snapshot(&self) -> RecorderState {
        self.inner
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    fn update(&self, apply: impl FnOnce(&mut RecorderState)) {
        if let Ok(mut state) = self.inner.lock() {
            apply(&mut state);
        }
    }

    pub fn entered_path(&self) -> Option<String> {
        self.snapshot().entered_path
    }

    pub fn backup_checked(&self) -> bool {
        self.snapshot().backup_checked
    }

    pub fn start_clicks(&self) -> u32 {
        self.snapshot().start_clicks
    }

    pub fn repair_clicks(&self) -> u32 {
        self.snapshot().repair_clicks
    }

    pub fn ok_clicks(&self) -> u32 {
        self.snapshot().ok_clicks
    }

    pub fn closed_windows(&self) -> u32 {
        self.snapshot().closed_windows
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedTool {
    behavior: ScriptedBehavior,
    recorder: Arc<ScriptedRecorder>,
}

impl ScriptedTool {
    pub fn new(behavior: ScriptedBehavior) -> Self {
        Self {
            behavior,
            recorder: Arc::new(ScriptedRecorder::default()),
        }
    }

    pub fn recorder(&self) -> &ScriptedRecorder {
        &self.recorder
    }
}

impl RepairTool for ScriptedTool {
    type Session = ScriptedSession;

    fn launch(&self, target: &Path) -> Result<Self::Session, String> {
        if self.behavior.fail_launch {
            return Err("scripted launch failure".to_string());
        }
        Ok(ScriptedSession {
            behavior: self.behavior.clone(),
            recorder: Arc::clone(&self.recorder),
            target: target.to_path_buf(),
            stage: Mutex::new(Stage::Input),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Input,
    Scanning { remaining: u32 },
    RepairReady,
    Repairing { remaining: u32 },
    Complete,
    Dismissed,
}

pub struct ScriptedSession {
    behavior: ScriptedBehavior,
    recorder: Arc<ScriptedRecorder>,
    target: PathBuf,
    stage: Mutex<Stage>,
}

impl ScriptedSession {
    fn stage(&self) -> Stage {
        self.stage
            .lock()
            .map(|stage| *stage)
            .unwrap_or(Stage::Dismissed)
    }

    fn set_stage(&self, next: Stage) {
        if let Ok(mut stage) = self.stage.lock() {
            *stage = next;
        }
    }

    /// Advances poll-driven phases; the utility makes progress while the
    /// orchestrator watches its windows.
    fn tick(&self) {
        let next = match self.stage() {
            Stage::Scanning { remaining: 0 } => Some(Stage::RepairReady),
            Stage::Scanning { remaining } => Some(Stage::Scanning {
                remaining: remaining - 1,
            }),
            Stage::Repairing { remaining: 0 } if !self.behavior.never_complete => {
                Some(Stage::Complete)
            }
            Stage::Repairing { remaining } if !self.behavior.never_complete => {
                Some(Stage::Repairing {
                    remaining: remaining - 1,
                })
            }
            _ => None,
        };
        if let Some(next) = next {
            self.set_stage(next);
        }
    }

    fn current_controls(&self) -> Vec<ControlState> {
        let button = |title: &str, enabled: bool| ControlState {
            title: title.to_string(),
            kind: ControlKind::Button,
            enabled,
        };
        let text = |title: &str| ControlState {
            title: title.to_string(),
            kind: ControlKind::Static,
            enabled: true,
        };
        match self.stage() {
            Stage::Input => vec![
                ControlState {
                    title: PATH_CONTROL.to_string(),
                    kind: ControlKind::Edit,
                    enabled: true,
                },
                button(START_CONTROL, true),
                button(REPAIR_CONTROL, false),
                button(BACKUP_CHECKBOX, true),
            ],
            Stage::Scanning { .. } => vec![
                button(REPAIR_CONTROL, false),
                text(&self.behavior.progress_text),
            ],
            Stage::RepairReady => {
                vec![button(REPAIR_CONTROL, true), button(BACKUP_CHECKBOX, true)]
            }
            Stage::Repairing { .. } => vec![text("Repairing phase 3 of 8")],
            Stage::Complete => {
                let mut controls = vec![text(COMPLETE_TEXT)];
                if let Some(stats) = &self.behavior.stats_text {
                    controls.push(text(stats));
                }
                controls.push(button(OK_CONTROL, true));
                controls
            }
            Stage::Dismissed => Vec::new(),
        }
    }

    fn find_control(&self, control: &str) -> Result<ControlState, String> {
        self.current_controls()
            .into_iter()
            .find(|state| state.title == control)
            .ok_or_else(|| format!("control not found: {control}"))
    }

    fn drop_artifacts(&self) -> Result<(), String> {
        if self.behavior.produce_backup {
            let backup = self.target.with_extension("bak");
            fs::write(&backup, b"scripted backup data")
                .map_err(|err| format!("write backup {}: {err}", backup.display()))?;
        }
        if self.behavior.produce_log {
            let log = self.target.with_extension("log");
            fs::write(&log, b"scripted repair log")
                .map_err(|err| format!("write log {}: {err}", log.display()))?;
        }
        Ok(())
    }
}

impl ToolSession for ScriptedSession {
    fn windows(&self) -> Result<Vec<WindowHandle>, String> {
        if self.behavior.never_show_window {
            return Ok(Vec::new());
        }
        self.tick();
        match self.stage() {
            Stage::Dismissed => Ok(Vec::new()),
            _ => {
                let mut windows = vec![WindowHandle {
                    id: "main".to_string(),
                    title: MAIN_WINDOW_TITLE.to_string(),
                }];
                if self.behavior.stale_window {
                    windows.push(WindowHandle {
                        id: "stale".to_string(),
                        title: MAIN_WINDOW_TITLE.to_string(),
                    });
                }
                Ok(windows)
            }
        }
    }

    fn controls(&self, _window: &WindowHandle) -> Result<Vec<ControlState>, String> {
        Ok(self.current_controls())
    }

    fn set_text(&self, _window: &WindowHandle, control: &str, value: &str) -> Result<(), String> {
        self.find_control(control)?;
        let value = value.to_string();
        self.recorder
            .update(move |state| state.entered_path = Some(value));
        Ok(())
    }

    fn click(&self, _window: &WindowHandle, control: &str) -> Result<(), String> {
        let state = self.find_control(control)?;
        if !state.enabled {
            return Err(format!("control is disabled: {control}"));
        }
        match control {
            START_CONTROL => {
                self.recorder.update(|state| state.start_clicks += 1);
                self.set_stage(Stage::Scanning {
                    remaining: self.behavior.scan_polls,
                });
            }
            REPAIR_CONTROL => {
                self.recorder.update(|state| state.repair_clicks += 1);
                self.set_stage(Stage::Repairing {
                    remaining: self.behavior.repair_polls,
                });
            }
            BACKUP_CHECKBOX => {
                // A click toggles, as the real control does.
                self.recorder
                    .update(|state| state.backup_checked = !state.backup_checked);
            }
            OK_CONTROL => {
                self.recorder.update(|state| state.ok_clicks += 1);
                self.drop_artifacts()?;
                self.set_stage(Stage::Dismissed);
            }
            _ => {}
        }
        Ok(())
    }

    fn set_checked(
        &self,
        _window: &WindowHandle,
        control: &str,
        value: bool,
    ) -> Result<(), String> {
        let state = self.find_control(control)?;
        if !state.enabled {
            return Err(format!("control is disabled: {control}"));
        }
        if control == BACKUP_CHECKBOX {
            self.recorder.update(|state| state.backup_checked = value);
        }
        Ok(())
    }

    fn is_enabled(&self, _window: &WindowHandle, control: &str) -> Result<bool, String> {
        Ok(self.find_control(control)?.enabled)
    }

    fn is_responding(&self, _window: &WindowHandle) -> Result<bool, String> {
        Ok(true)
    }

    fn close_window(&self, _window: &WindowHandle) -> Result<(), String> {
        self.recorder.update(|state| state.closed_windows += 1);
        self.set_stage(Stage::Dismissed);
        Ok(())
    }
}
