pub mod bridge;
pub mod scripted;
pub mod types;

pub use bridge::{BridgeTool, ToolPreference, DEFAULT_UTILITY_PATH};
pub use scripted::{ScriptedBehavior, ScriptedRecorder, ScriptedTool};
pub use types::{
    ControlKind, ControlState, RepairTool, ToolSession, WindowHandle, BACKUP_CHECKBOX,
    COMPLETE_TEXT, MAIN_WINDOW_TITLE, OK_CONTROL, PATH_CONTROL, REPAIR_CONTROL, START_CONTROL,
};
