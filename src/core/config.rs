use crate::core::dirs::{default_worktrees_directory, get_config_directory};
use crate::core::error::{Result, WorktreeKeeperError};
use crate::core::forge::ForgeKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Scan root for worktrees; the cache file lives here too.
    pub worktrees_dir: PathBuf,
    /// Searched first when a worktree's repository has moved.
    #[serde(default)]
    pub repo_dir: Option<PathBuf>,
    #[serde(default)]
    pub forge: Option<ForgeKind>,
}

impl Config {
    pub fn with_root(worktrees_dir: impl Into<PathBuf>) -> Self {
        Self {
            worktrees_dir: worktrees_dir.into(),
            repo_dir: None,
            forge: None,
        }
    }

    /// Load the user's config, falling back to defaults when no file exists.
    pub fn load() -> Result<Self> {
        let config_file = get_config_directory()?.join(CONFIG_FILE);
        match Self::load_from(&config_file)? {
            Some(config) => Ok(config),
            None => Ok(Self::with_root(default_worktrees_directory()?)),
        }
    }

    pub fn load_from(config_file: &Path) -> Result<Option<Self>> {
        if !config_file.exists() {
            log::debug!("No config file at {}", config_file.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_file)?;
        let config = serde_json::from_str(&content)
            .map_err(|e| WorktreeKeeperError::config_parse_failed(config_file, e))?;
        Ok(Some(config))
    }

    pub fn save(&self) -> Result<()> {
        let config_dir = get_config_directory()?;
        self.save_to(&config_dir.join(CONFIG_FILE))
    }

    pub fn save_to(&self, config_file: &Path) -> Result<()> {
        if let Some(parent) = config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_file, content)?;
        Ok(())
    }

    /// Directories searched, in order, for a repository that has moved.
    pub fn repo_search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::with_capacity(2);
        if let Some(repo_dir) = &self.repo_dir {
            dirs.push(repo_dir.clone());
        }
        dirs.push(self.worktrees_dir.clone());
        dirs
    }
}
