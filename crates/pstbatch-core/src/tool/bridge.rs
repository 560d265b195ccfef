use crate::tool::types::{ControlKind, ControlState, RepairTool, ToolSession, WindowHandle};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

/// Installation path the repair utility ships at when nothing else is
/// configured.
pub const DEFAULT_UTILITY_PATH: &str =
    r"C:\Program Files (x86)\Microsoft Office\Office16\SCANPST.EXE";

const DEFAULT_BRIDGE_PROGRAM: &str = "pst-ui-bridge";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPreference {
    Auto,
    Bridge,
    Mock,
}

impl ToolPreference {
    pub fn from_env() -> Option<Self> {
        let value = env::var("PSTBATCH_TOOL").ok()?;
        value.parse().ok()
    }
}

impl FromStr for ToolPreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "bridge" => Ok(Self::Bridge),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown tool preference: {other}")),
        }
    }
}

/// Production adapter. The GUI utility cannot be scripted directly, so each
/// capability shells out to a UI-automation bridge executable that does the
/// actual window lookup and clicking; a non-zero bridge exit becomes the
/// error string the polling sites retry on.
#[derive(Debug, Clone)]
pub struct BridgeTool {
    bridge_path: PathBuf,
    utility_path: PathBuf,
}

impl BridgeTool {
    /// Resolves the bridge to use, honoring `PSTBATCH_TOOL` and
    /// `PSTBATCH_BRIDGE_PATH` overrides. Returns `None` when the mock
    /// adapter was requested.
    pub fn detect(
        preference: ToolPreference,
        bridge_path: Option<&Path>,
        utility_path: &Path,
    ) -> Result<Option<Self>, String> {
        let preference = ToolPreference::from_env().unwrap_or(preference);
        if matches!(preference, ToolPreference::Mock) {
            return Ok(None);
        }

        let env_path = env::var_os("PSTBATCH_BRIDGE_PATH").map(PathBuf::from);
        let bridge_path = bridge_path
            .map(Path::to_path_buf)
            .or(env_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BRIDGE_PROGRAM));

        Ok(Some(Self {
            bridge_path,
            utility_path: utility_path.to_path_buf(),
        }))
    }

    pub fn bridge_path(&self) -> &Path {
        &self.bridge_path
    }

    fn run(&self, args: &[&str]) -> Result<String, String> {
        let output = Command::new(&self.bridge_path)
            .args(args)
            .output()
            .map_err(|err| format!("failed to run {}: {err}", self.bridge_path.display()))?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!(
                "{} failed (status={}): {}",
                self.bridge_path.display(),
                output.status,
                stderr.trim()
            ))
        }
    }
}

impl RepairTool for BridgeTool {
    type Session = BridgeSession;

    fn launch(&self, target: &Path) -> Result<Self::Session, String> {
        let utility = self
            .utility_path
            .to_str()
            .ok_or("utility path is not valid UTF-8")?;
        let target = target.to_str().ok_or("target path is not valid UTF-8")?;
        let stdout = self.run(&["launch", "--utility", utility, "--target", target])?;
        let session_id = stdout.trim().to_string();
        if session_id.is_empty() {
            return Err("bridge launch returned no session id".to_string());
        }
        Ok(BridgeSession {
            tool: self.clone(),
            session_id,
        })
    }
}

pub struct BridgeSession {
    tool: BridgeTool,
    session_id: String,
}

impl BridgeSession {
    fn run(&self, subcommand: &str, extra: &[&str]) -> Result<String, String> {
        let mut args = vec![subcommand, "--session", self.session_id.as_str()];
        args.extend_from_slice(extra);
        self.tool.run(&args)
    }

    fn run_bool(&self, subcommand: &str, extra: &[&str]) -> Result<bool, String> {
        let stdout = self.run(subcommand, extra)?;
        match stdout.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(format!("bridge {subcommand} returned {other:?}")),
        }
    }
}

impl ToolSession for BridgeSession {
    fn windows(&self) -> Result<Vec<WindowHandle>, String> {
        let stdout = self.run("windows", &[])?;
        let mut windows = Vec::new();
        for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
            let (id, title) = line
                .split_once('\t')
                .ok_or_else(|| format!("malformed window line from bridge: {line:?}"))?;
            windows.push(WindowHandle {
                id: id.to_string(),
                title: title.to_string(),
            });
        }
        Ok(windows)
    }

    fn controls(&self, window: &WindowHandle) -> Result<Vec<ControlState>, String> {
        let stdout = self.run("controls", &["--window", &window.id])?;
        let mut controls = Vec::new();
        for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
            let mut fields = line.splitn(3, '\t');
            let (kind, enabled, title) = match (fields.next(), fields.next(), fields.next()) {
                (Some(kind), Some(enabled), Some(title)) => (kind, enabled, title),
                _ => return Err(format!("malformed control line from bridge: {line:?}")),
            };
            controls.push(ControlState {
                title: title.to_string(),
                kind: ControlKind::parse(kind),
                enabled: matches!(enabled, "true" | "1"),
            });
        }
        Ok(controls)
    }

    fn set_text(&self, window: &WindowHandle, control: &str, value: &str) -> Result<(), String> {
        self.run(
            "set-text",
            &["--window", &window.id, "--control", control, "--value", value],
        )?;
        Ok(())
    }

    fn click(&self, window: &WindowHandle, control: &str) -> Result<(), String> {
        self.run("click", &["--window", &window.id, "--control", control])?;
        Ok(())
    }

    fn set_checked(
        &self,
        window: &WindowHandle,
        control: &str,
        value: bool,
    ) -> Result<(), String> {
        let value = if value { "true" } else { "false" };
        self.run(
            "check",
            &["--window", &window.id, "--control", control, "--value", value],
        )?;
        Ok(())
    }

    fn is_enabled(&self, window: &WindowHandle, control: &str) -> Result<bool, String> {
        self.run_bool("enabled", &["--window", &window.id, "--control", control])
    }

    fn is_responding(&self, window: &WindowHandle) -> Result<bool, String> {
        self.run_bool("responding", &["--window", &window.id])
    }

    fn close_window(&self, window: &WindowHandle) -> Result<(), String> {
        self.run("close", &["--window", &window.id])?;
        Ok(())
    }
}
