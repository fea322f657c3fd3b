//! Harness configuration loaded from `config.toml`.
//!
//! Lookup order:
//! 1. An explicit `--config <path>` (must exist).
//! 2. User config (`~/.config/long-run-agent/config.toml`) deep-merged with
//!    project config (`{project}/.lra/config.toml`); project keys win.
//! 3. Built-in defaults for anything left unset.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::paths;

pub const DEFAULT_CODING_MODEL: &str = "claude-sonnet-4-5-20250930";
pub const DEFAULT_PLANNING_MODEL: &str = "claude-opus-4-5-20251101";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Model pair used by the orchestration loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Model for the one-time initializer session.
    pub planning: String,
    /// Model for every coding session.
    pub coding: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            planning: DEFAULT_CODING_MODEL.to_string(),
            coding: DEFAULT_CODING_MODEL.to_string(),
        }
    }
}

impl ModelsConfig {
    /// Planning model differs from coding model.
    pub fn is_hybrid(&self) -> bool {
        self.planning != self.coding
    }
}

/// Coding CLI spawned once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Flag placed before the model name, e.g. `--model`.
    pub model_flag: String,
    /// Extra environment variables for the backend process.
    pub env: HashMap<String, String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            args: [
                "--print",
                "--output-format",
                "stream-json",
                "--verbose",
                "--permission-mode",
                "acceptEdits",
                "--max-turns",
                "1000",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            model_flag: "--model".to_string(),
            env: HashMap::new(),
        }
    }
}

/// Rate-limit retry and pacing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Rate-limited sessions tolerated in a row before giving up.
    pub max_rate_limit_retries: u32,
    pub fallback_wait_first_secs: u64,
    pub fallback_wait_extended_secs: u64,
    /// Upper bound for explicit waits reported by the backend.
    pub max_wait_secs: u64,
    /// Pause after a successful or failed session.
    pub auto_continue_delay_secs: u64,
    /// Pause before starting the next session.
    pub between_sessions_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 10,
            fallback_wait_first_secs: 5 * 60 * 60,
            fallback_wait_extended_secs: 24 * 60 * 60,
            max_wait_secs: 24 * 60 * 60,
            auto_continue_delay_secs: 3,
            between_sessions_delay_secs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory holding prompt templates and `*.txt` spec files.
    pub dir: String,
    pub default_spec: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: "prompts".to_string(),
            default_spec: "app_spec.txt".to_string(),
        }
    }
}

/// External page driver wrapped by the browser tool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub driver_command: String,
    pub driver_args: Vec<String>,
    /// `[width, height]` the driver starts with.
    pub default_viewport: [u32; 2],
    /// How long to wait for the driver to answer one message.
    pub reply_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            driver_command: "page-driver".to_string(),
            driver_args: Vec::new(),
            default_viewport: [1920, 1080],
            reply_timeout_secs: 120,
        }
    }
}

impl HarnessConfig {
    /// Load configuration for `project_dir`.
    ///
    /// With `explicit`, only that file is read and it must exist.
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Self::load_from_path(path)?
            }
            None => {
                let user_path = paths::user_config_path();
                let project_path = paths::project_config_path(project_dir);
                Self::load_with_paths(user_path.as_deref(), &project_path)?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from explicit user/project paths. Missing files are skipped.
    pub(crate) fn load_with_paths(user_path: Option<&Path>, project_path: &Path) -> Result<Self> {
        let user_path = user_path.filter(|p| p.exists());
        let project_exists = project_path.exists();

        match (user_path, project_exists) {
            (None, false) => Ok(Self::default()),
            (Some(user), false) => Self::load_from_path(user),
            (None, true) => Self::load_from_path(project_path),
            (Some(user), true) => Self::load_merged(user, project_path),
        }
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading config");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    fn load_merged(base_path: &Path, overlay_path: &Path) -> Result<Self> {
        debug!(
            user = %base_path.display(),
            project = %overlay_path.display(),
            "Loading merged config"
        );
        let base_str = std::fs::read_to_string(base_path)
            .with_context(|| format!("Failed to read user config: {}", base_path.display()))?;
        let overlay_str = std::fs::read_to_string(overlay_path).with_context(|| {
            format!("Failed to read project config: {}", overlay_path.display())
        })?;

        let base_val: toml::Value = toml::from_str(&base_str)
            .with_context(|| format!("Failed to parse user config: {}", base_path.display()))?;
        let overlay_val: toml::Value = toml::from_str(&overlay_str).with_context(|| {
            format!("Failed to parse project config: {}", overlay_path.display())
        })?;

        let merged = merge_toml_values(base_val, overlay_val);
        let merged_str = toml::to_string(&merged).context("Failed to serialize merged config")?;
        toml::from_str(&merged_str).context("Failed to deserialize merged config")
    }

    /// Reject values the harness cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.backend.command.trim().is_empty() {
            bail!("backend.command must not be empty");
        }
        if self.models.planning.trim().is_empty() || self.models.coding.trim().is_empty() {
            bail!("models.planning and models.coding must not be empty");
        }
        if self.retry.fallback_wait_first_secs > self.retry.fallback_wait_extended_secs {
            bail!(
                "retry.fallback_wait_first_secs ({}) must not exceed retry.fallback_wait_extended_secs ({})",
                self.retry.fallback_wait_first_secs,
                self.retry.fallback_wait_extended_secs
            );
        }
        let [width, height] = self.browser.default_viewport;
        if width == 0 || height == 0 {
            bail!("browser.default_viewport must be positive, got {width}x{height}");
        }
        if self.browser.reply_timeout_secs == 0 {
            bail!("browser.reply_timeout_secs must be positive");
        }
        Ok(())
    }
}

/// Deep merge two TOML values. Overlay wins for non-table values.
/// Tables are merged recursively (project-level keys override user-level keys).
pub(crate) fn merge_toml_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_map), toml::Value::Table(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged_val = match base_map.remove(&key) {
                    Some(base_val) => merge_toml_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged_val);
            }
            toml::Value::Table(base_map)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
