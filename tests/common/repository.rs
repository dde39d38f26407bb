//! Real git repositories and worktrees for integration tests
//!
//! Every test gets its own [`Sandbox`]: a temp directory holding a source
//! repository, a worktrees root and an isolated config directory.

#![allow(dead_code)]

use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use worktree_keeper::core::error::{Result, WorktreeKeeperError};

pub const ORIGIN_URL: &str = "git@github.com:acme/widget.git";

/// Temp layout:
///
/// ```text
/// <tmp>/src/widget      source repository with one commit
/// <tmp>/worktrees       scan root and cache directory
/// <tmp>/home            HOME and XDG_CONFIG_HOME for the binary
/// ```
pub struct Sandbox {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub repo: PathBuf,
    pub worktrees: PathBuf,
    pub home: PathBuf,
}

impl Sandbox {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().canonicalize()?;
        let repo = root.join("src").join("widget");
        let worktrees = root.join("worktrees");
        let home = root.join("home");
        fs::create_dir_all(&repo)?;
        fs::create_dir_all(&worktrees)?;
        fs::create_dir_all(&home)?;

        init_repo(&repo)?;

        Ok(Self {
            temp_dir,
            root,
            repo,
            worktrees,
            home,
        })
    }

    /// `git worktree add -b <branch> <worktrees>/<name>`
    pub fn add_worktree(&self, name: &str, branch: &str) -> Result<PathBuf> {
        let path = self.worktrees.join(name);
        git(
            &self.repo,
            &["worktree", "add", "-q", "-b", branch, &path.to_string_lossy()],
        )?;
        Ok(path)
    }

    /// Delete a worktree directory behind git's back.
    pub fn delete_worktree_dir(&self, name: &str) -> Result<()> {
        fs::remove_dir_all(self.worktrees.join(name))?;
        Ok(())
    }

    /// Move the source repository to `<tmp>/<dir>/widget` and return the new path.
    pub fn move_repo(&self, dir: &str) -> Result<PathBuf> {
        let target_dir = self.root.join(dir);
        fs::create_dir_all(&target_dir)?;
        let target = target_dir.join("widget");
        fs::rename(&self.repo, &target)?;
        Ok(target)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.worktrees.join(".worktree-cache.json")
    }

    pub fn config_file(&self) -> PathBuf {
        let base = if cfg!(target_os = "macos") {
            self.home.join("Library").join("Application Support")
        } else {
            self.home.join(".config")
        };
        base.join("worktree-keeper").join("config.json")
    }

    /// The binary, isolated from the user's config and pointed at this sandbox.
    pub fn keeper(&self) -> Command {
        let mut cmd = self.bare_keeper();
        cmd.arg("--root").arg(&self.worktrees);
        cmd
    }

    /// The isolated binary without a `--root` argument.
    pub fn bare_keeper(&self) -> Command {
        let mut cmd = Command::cargo_bin("worktree-keeper").expect("binary is built");
        cmd.env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", self.home.join(".config"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

pub fn init_repo(path: &Path) -> Result<()> {
    git(path, &["init", "-q"])?;
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
    git(path, &["config", "user.name", "Test User"])?;
    git(path, &["config", "user.email", "test@example.com"])?;
    git(path, &["config", "commit.gpgsign", "false"])?;
    git(path, &["remote", "add", "origin", ORIGIN_URL])?;
    git(path, &["commit", "-q", "--allow-empty", "-m", "Initial commit"])?;
    Ok(())
}

pub fn git(dir: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new("git").args(args).current_dir(dir).output()?;
    if !output.status.success() {
        return Err(WorktreeKeeperError::git_command_failed(
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }
    Ok(())
}
