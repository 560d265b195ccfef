use std::path::Path;

/// UI vocabulary of the external repair utility. Both windows it shows (the
/// input form and the completion dialog) carry the same title; controls are
/// addressed by the text they display.
pub const MAIN_WINDOW_TITLE: &str = "Microsoft Outlook Inbox Repair Tool";
pub const PATH_CONTROL: &str = "Edit";
pub const START_CONTROL: &str = "&Start";
pub const REPAIR_CONTROL: &str = "&Repair";
pub const BACKUP_CHECKBOX: &str = "&Make backup of scanned file before repairing";
pub const COMPLETE_TEXT: &str = "Repair complete";
pub const OK_CONTROL: &str = "OK";

/// Opaque window identity handed out by an adapter, plus the title it
/// carried when it was enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowHandle {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Edit,
    Button,
    Static,
    Other,
}

impl ControlKind {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "edit" => ControlKind::Edit,
            "button" => ControlKind::Button,
            "static" => ControlKind::Static,
            _ => ControlKind::Other,
        }
    }
}

/// Visible state of one child control. `title` is the text the control
/// displays, which is also how controls are addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub title: String,
    pub kind: ControlKind,
    pub enabled: bool,
}

/// One launched instance of the repair utility. Every operation can fail
/// transiently (the GUI process may be busy realizing its controls); the
/// caller is expected to swallow such errors and retry on its next poll
/// tick rather than abort.
pub trait ToolSession {
    fn windows(&self) -> Result<Vec<WindowHandle>, String>;

    fn controls(&self, window: &WindowHandle) -> Result<Vec<ControlState>, String>;

    fn set_text(&self, window: &WindowHandle, control: &str, value: &str) -> Result<(), String>;

    fn click(&self, window: &WindowHandle, control: &str) -> Result<(), String>;

    /// Puts a checkbox into the given state. Unlike `click`, which toggles,
    /// this is idempotent.
    fn set_checked(&self, window: &WindowHandle, control: &str, value: bool)
        -> Result<(), String>;

    fn is_enabled(&self, window: &WindowHandle, control: &str) -> Result<bool, String>;

    fn is_responding(&self, window: &WindowHandle) -> Result<bool, String>;

    fn close_window(&self, window: &WindowHandle) -> Result<(), String>;

    /// All live windows whose title matches exactly.
    fn find_windows(&self, title: &str) -> Result<Vec<WindowHandle>, String> {
        Ok(self
            .windows()?
            .into_iter()
            .filter(|window| window.title == title)
            .collect())
    }
}

/// Launcher for the external repair utility.
pub trait RepairTool {
    type Session: ToolSession;

    fn launch(&self, target: &Path) -> Result<Self::Session, String>;
}
