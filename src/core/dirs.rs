use crate::core::error::WorktreeKeeperError;
use std::path::PathBuf;

const APP_DIR: &str = "worktree-keeper";

pub fn get_config_directory() -> Result<PathBuf, WorktreeKeeperError> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".config"))
                    .ok_or(WorktreeKeeperError::ConfigDirectoryNotFound)
            })?,
        "macos" => dirs::home_dir()
            .ok_or(WorktreeKeeperError::ConfigDirectoryNotFound)?
            .join("Library/Application Support"),
        _ => dirs::config_dir().ok_or(WorktreeKeeperError::ConfigDirectoryNotFound)?,
    };

    Ok(base.join(APP_DIR))
}

/// Default root under which worktrees are created and the cache is kept.
pub fn default_worktrees_directory() -> Result<PathBuf, WorktreeKeeperError> {
    dirs::home_dir()
        .map(|home| home.join("worktrees"))
        .ok_or(WorktreeKeeperError::ConfigDirectoryNotFound)
}
