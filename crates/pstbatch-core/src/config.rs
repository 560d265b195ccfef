use crate::tool::ToolPreference;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: &str = "1";

/// Optional TOML configuration for a batch run. Everything here can also be
/// supplied as a CLI flag; flags win.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    pub schema_version: String,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub batch: BatchSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub preference: Option<String>,
    #[serde(default)]
    pub bridge_path: Option<PathBuf>,
    #[serde(default)]
    pub utility_path: Option<PathBuf>,
    /// Behavior file for mock runs.
    #[serde(default)]
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSection {
    #[serde(default)]
    pub folder: Option<PathBuf>,
    #[serde(default)]
    pub settle_secs: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            tool: ToolConfig::default(),
            batch: BatchSection::default(),
        }
    }
}

impl BatchConfig {
    pub fn parse(toml_src: &str) -> Result<Self, String> {
        let config: BatchConfig =
            toml::from_str(toml_src).map_err(|err| format!("invalid batch config: {err}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let src = fs::read_to_string(path)
            .map_err(|err| format!("read batch config {}: {err}", path.display()))?;
        let mut config = Self::parse(&src)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.schema_version != CONFIG_SCHEMA_VERSION {
            return Err(format!(
                "unsupported batch config schema version: {}",
                self.schema_version
            ));
        }
        if let Some(preference) = &self.tool.preference {
            preference.parse::<ToolPreference>()?;
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        if let Some(path) = &self.tool.bridge_path {
            self.tool.bridge_path = Some(resolve_path(base, path));
        }
        if let Some(path) = &self.tool.utility_path {
            self.tool.utility_path = Some(resolve_path(base, path));
        }
        if let Some(path) = &self.tool.script {
            self.tool.script = Some(resolve_path(base, path));
        }
        if let Some(path) = &self.batch.folder {
            self.batch.folder = Some(resolve_path(base, path));
        }
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
