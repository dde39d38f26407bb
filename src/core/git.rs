//! Git worktree queries and repairs.
//!
//! The diagnostics and repair code talk to git only through the [`GitOps`] trait so
//! that they can run against a fake in tests. [`GitCli`] is the real implementation:
//! it reads repository state through `git2` and shells out to the `git` binary for
//! `worktree repair` and `worktree prune`, which `git2` does not offer.
//!
//! # Public API
//! - [`GitOps`]: Everything the core needs from git
//! - [`GitCli`]: Production implementation
//!
//! # Worktree links
//! A linked worktree has a `.git` *file* containing `gitdir: <repo>/.git/worktrees/<name>`.
//! That directory holds a `gitdir` file pointing back at the worktree's `.git`. The
//! link is healthy only when both directions resolve.

use crate::core::error::{Result, WorktreeKeeperError};
use crate::core::registry::WorktreeInfo;
use git2::{ErrorCode, Repository};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const GIT_MARKER: &str = ".git";

pub trait GitOps {
    /// Worktrees directly under `scan_root`.
    fn list_worktrees(&self, scan_root: &Path) -> Result<Vec<WorktreeInfo>>;
    fn worktree_info(&self, path: &Path) -> Result<WorktreeInfo>;
    fn current_branch(&self, path: &Path) -> Result<String>;
    /// Root of the repository that owns the worktree at `path`.
    fn main_repo_path(&self, path: &Path) -> Result<PathBuf>;
    /// URL of the `origin` remote, empty when there is none.
    fn origin_url(&self, repo: &Path) -> Result<String>;
    fn is_worktree(&self, path: &Path) -> bool;
    fn validate_link(&self, path: &Path) -> Result<()>;
    /// Repository root named by the worktree's `.git` file.
    fn recorded_repo_path(&self, path: &Path) -> Option<PathBuf>;
    fn is_valid_repo(&self, path: &Path) -> bool;
    fn can_repair(&self, repo: &Path) -> bool;
    fn repair_link(&self, repo: &Path, worktree: &Path) -> Result<()>;
    /// Names of worktree records in `repo` whose checkout is gone.
    fn prunable_worktrees(&self, repo: &Path) -> Result<Vec<String>>;
    fn prune(&self, repo: &Path) -> Result<()>;
    fn known_worktree_paths(&self, repo: &Path) -> Result<Vec<PathBuf>>;
    fn find_repo_by_name(&self, name: &str, candidates: &[PathBuf]) -> Option<PathBuf>;
}

/// Compare two paths, resolving symlinks when both exist.
pub fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Read the `gitdir:` target out of a worktree's `.git` file.
fn read_gitdir(worktree: &Path) -> Result<PathBuf> {
    let marker = worktree.join(GIT_MARKER);
    let content = fs::read_to_string(&marker)?;
    let target = content
        .lines()
        .find_map(|line| line.strip_prefix("gitdir:"))
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .ok_or_else(|| {
            WorktreeKeeperError::broken_link(format!("{} has no gitdir line", marker.display()))
        })?;

    let target = PathBuf::from(target);
    Ok(if target.is_absolute() {
        target
    } else {
        worktree.join(target)
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, path: &Path) -> Result<Repository> {
        Repository::open(path).map_err(|e| {
            log::debug!("Cannot open repository at {}: {e}", path.display());
            WorktreeKeeperError::not_a_repository(path)
        })
    }

    /// Run `git -C <dir> <args>`, turning a non-zero exit into an error.
    fn execute_git_command<I, S>(&self, dir: &Path, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let display = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        log::debug!("Running git {display} in {}", dir.display());

        let output = Command::new("git").arg("-C").arg(dir).args(&args).output()?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            return Err(WorktreeKeeperError::git_command_failed(
                display,
                error_msg.trim(),
            ));
        }

        Ok(())
    }
}

impl GitOps for GitCli {
    fn list_worktrees(&self, scan_root: &Path) -> Result<Vec<WorktreeInfo>> {
        let entries = match fs::read_dir(scan_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut worktrees = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || !self.is_worktree(&path) {
                continue;
            }
            match self.worktree_info(&path) {
                Ok(info) => worktrees.push(info),
                Err(e) => log::debug!("Skipping {}: {e}", path.display()),
            }
        }

        worktrees.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(worktrees)
    }

    fn worktree_info(&self, path: &Path) -> Result<WorktreeInfo> {
        let repo_path = self.main_repo_path(path)?;
        let branch = self.current_branch(path)?;
        let origin_url = self.origin_url(&repo_path).unwrap_or_else(|e| {
            log::debug!("No origin for {}: {e}", repo_path.display());
            String::new()
        });

        Ok(WorktreeInfo {
            path: path.to_path_buf(),
            branch,
            origin_url,
            repo_path,
        })
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        let repo = self.open(path)?;
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(String::new()),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            return Ok(head.shorthand().unwrap_or_default().to_string());
        }

        // Detached HEAD
        Ok(match head.target() {
            Some(oid) => format!("detached at {}", &oid.to_string()[..7]),
            None => String::new(),
        })
    }

    fn main_repo_path(&self, path: &Path) -> Result<PathBuf> {
        let repo = self.open(path)?;
        let common = repo.commondir();
        let root = if common.file_name() == Some(OsStr::new(GIT_MARKER)) {
            common.parent().unwrap_or(common)
        } else {
            common
        };
        Ok(root.to_path_buf())
    }

    fn origin_url(&self, repo: &Path) -> Result<String> {
        let repo = self.open(repo)?;
        let url = match repo.find_remote("origin") {
            Ok(remote) => remote.url().unwrap_or_default().to_string(),
            Err(e) if e.code() == ErrorCode::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(url)
    }

    fn is_worktree(&self, path: &Path) -> bool {
        path.join(GIT_MARKER).is_file()
    }

    fn validate_link(&self, path: &Path) -> Result<()> {
        let gitdir = read_gitdir(path)?;
        if !gitdir.is_dir() {
            return Err(WorktreeKeeperError::broken_link(format!(
                "gitdir {} does not exist",
                gitdir.display()
            )));
        }

        let back_file = gitdir.join("gitdir");
        let back = fs::read_to_string(&back_file).map_err(|e| {
            WorktreeKeeperError::broken_link(format!("cannot read {}: {e}", back_file.display()))
        })?;
        let back = PathBuf::from(back.trim());
        let back = if back.is_absolute() {
            back
        } else {
            gitdir.join(back)
        };

        if !same_path(&back, &path.join(GIT_MARKER)) {
            return Err(WorktreeKeeperError::broken_link(format!(
                "repository points at {} instead",
                back.display()
            )));
        }

        Ok(())
    }

    fn recorded_repo_path(&self, path: &Path) -> Option<PathBuf> {
        let gitdir = read_gitdir(path).ok()?;
        let worktrees_dir = gitdir.parent()?;
        if worktrees_dir.file_name() != Some(OsStr::new("worktrees")) {
            return None;
        }
        let common = worktrees_dir.parent()?;
        if common.file_name() == Some(OsStr::new(GIT_MARKER)) {
            common.parent().map(Path::to_path_buf)
        } else {
            Some(common.to_path_buf())
        }
    }

    fn is_valid_repo(&self, path: &Path) -> bool {
        !path.as_os_str().is_empty() && Repository::open(path).is_ok()
    }

    fn can_repair(&self, repo: &Path) -> bool {
        match Repository::open(repo) {
            Ok(repo) => !repo.is_worktree(),
            Err(_) => false,
        }
    }

    fn repair_link(&self, repo: &Path, worktree: &Path) -> Result<()> {
        self.execute_git_command(
            repo,
            [
                OsStr::new("worktree"),
                OsStr::new("repair"),
                worktree.as_os_str(),
            ],
        )?;
        self.validate_link(worktree)
    }

    fn prunable_worktrees(&self, repo: &Path) -> Result<Vec<String>> {
        let repository = self.open(repo)?;
        let names = repository.worktrees()?;

        let mut prunable = Vec::new();
        for name in names.iter().flatten() {
            let worktree = repository.find_worktree(name)?;
            if worktree.is_prunable(None)? {
                prunable.push(name.to_string());
            }
        }
        Ok(prunable)
    }

    fn prune(&self, repo: &Path) -> Result<()> {
        self.execute_git_command(repo, ["worktree", "prune"])
    }

    fn known_worktree_paths(&self, repo: &Path) -> Result<Vec<PathBuf>> {
        let repository = self.open(repo)?;
        let names = repository.worktrees()?;

        let mut paths = Vec::new();
        for name in names.iter().flatten() {
            let worktree = repository.find_worktree(name)?;
            paths.push(worktree.path().to_path_buf());
        }
        Ok(paths)
    }

    fn find_repo_by_name(&self, name: &str, candidates: &[PathBuf]) -> Option<PathBuf> {
        candidates
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.join(GIT_MARKER).is_dir() && self.is_valid_repo(candidate))
    }
}
