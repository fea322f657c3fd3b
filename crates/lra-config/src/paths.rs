use std::path::{Path, PathBuf};

/// XDG app name used for user-level paths.
pub const APP_NAME: &str = "long-run-agent";
/// Per-project state directory name.
pub const PROJECT_STATE_DIR: &str = ".lra";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// User config directory (`~/.config/long-run-agent` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// User-level config file, if a home directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// `{project}/.lra`
pub fn project_state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_STATE_DIR)
}

/// `{project}/.lra/config.toml`
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_state_dir(project_dir).join(CONFIG_FILE_NAME)
}

/// `{project}/.lra/logs`
pub fn project_logs_dir(project_dir: &Path) -> PathBuf {
    project_state_dir(project_dir).join("logs")
}
