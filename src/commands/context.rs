use crate::core::{config::Config, error::Result, git::GitCli};
use std::path::{Path, PathBuf};

/// Configuration and collaborators shared by every subcommand.
pub struct CommandContext {
    pub config: Config,
    pub git: GitCli,
}

impl CommandContext {
    /// Load the user's config and apply command-line overrides on top.
    pub fn new(root: Option<PathBuf>, repo_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::load()?;
        if let Some(root) = root {
            config.worktrees_dir = root;
        }
        if repo_dir.is_some() {
            config.repo_dir = repo_dir;
        }
        config.worktrees_dir = absolute_dir(&config.worktrees_dir)?;
        config.repo_dir = config.repo_dir.as_deref().map(absolute_dir).transpose()?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        log::debug!("Using worktrees root {}", config.worktrees_dir.display());
        Self {
            config,
            git: GitCli::new(),
        }
    }

    /// Scan root and cache directory.
    pub fn root(&self) -> &Path {
        &self.config.worktrees_dir
    }
}

/// Cached paths are absolute: relative directories resolve against the current
/// directory.
fn absolute_dir(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}
