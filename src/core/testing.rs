//! Test doubles shared by the unit tests.

use crate::core::cache::{WorktreeCache, WorktreeEntry};
use crate::core::doctor::DiagnosticContext;
use crate::core::error::{Result, WorktreeKeeperError};
use crate::core::git::{GitOps, GIT_MARKER};
use crate::core::registry::WorktreeInfo;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn active_entry(id: u64, path: &Path, repo: &str) -> WorktreeEntry {
    WorktreeEntry {
        id,
        path: path.to_path_buf(),
        branch: "main".to_string(),
        origin_url: "git@github.com:acme/widget.git".to_string(),
        repo_path: PathBuf::from(repo),
        removed_at: None,
        pr: None,
    }
}

/// A temp directory with a `worktrees/` scan root inside it.
pub struct Workspace {
    _temp_dir: TempDir,
    root: PathBuf,
    scan_root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        let scan_root = root.join("worktrees");
        fs::create_dir_all(&scan_root).unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
            scan_root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan_root(&self) -> PathBuf {
        self.scan_root.clone()
    }

    /// A directory under the scan root with a `.git` file.
    pub fn worktree(&self, name: &str) -> PathBuf {
        let path = self.scan_root.join(name);
        fs::create_dir_all(&path).unwrap();
        fs::write(
            path.join(GIT_MARKER),
            format!("gitdir: /nowhere/.git/worktrees/{name}\n"),
        )
        .unwrap();
        path
    }

    pub fn orphan_worktree(&self, name: &str) -> PathBuf {
        self.worktree(name)
    }

    /// A directory under the scan root with a `.git` directory.
    pub fn main_repo_dir(&self, name: &str) -> PathBuf {
        let path = self.scan_root.join(name);
        fs::create_dir_all(path.join(GIT_MARKER)).unwrap();
        path
    }

    pub fn context<'a>(
        &'a self,
        cache: &'a WorktreeCache,
        git: &'a FakeGit,
        repo_search_dirs: &'a [PathBuf],
    ) -> DiagnosticContext<'a> {
        DiagnosticContext {
            cache,
            scan_root: &self.scan_root,
            repo_search_dirs,
            git,
        }
    }
}

/// Scriptable [`GitOps`]. Filesystem checks (`is_worktree`) use the real disk.
#[derive(Default)]
pub struct FakeGit {
    pub valid_repos: HashSet<PathBuf>,
    pub unrepairable: HashSet<PathBuf>,
    pub broken_links: HashMap<PathBuf, String>,
    pub recorded_repos: HashMap<PathBuf, PathBuf>,
    pub prunable: HashMap<PathBuf, Vec<String>>,
    pub known_worktrees: HashMap<PathBuf, Vec<PathBuf>>,
    pub infos: HashMap<PathBuf, WorktreeInfo>,
    pub fail_repairs: bool,
    pub repaired: RefCell<Vec<(PathBuf, PathBuf)>>,
    pub pruned: RefCell<Vec<PathBuf>>,
}

impl FakeGit {
    fn info(&self, path: &Path) -> Result<&WorktreeInfo> {
        self.infos
            .get(path)
            .ok_or_else(|| WorktreeKeeperError::not_a_repository(path))
    }
}

impl GitOps for FakeGit {
    fn list_worktrees(&self, scan_root: &Path) -> Result<Vec<WorktreeInfo>> {
        let mut listed: Vec<_> = self
            .infos
            .values()
            .filter(|info| info.path.parent() == Some(scan_root))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(listed)
    }

    fn worktree_info(&self, path: &Path) -> Result<WorktreeInfo> {
        self.info(path).cloned()
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        Ok(self.info(path)?.branch.clone())
    }

    fn main_repo_path(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.info(path)?.repo_path.clone())
    }

    fn origin_url(&self, repo: &Path) -> Result<String> {
        Ok(self
            .infos
            .values()
            .find(|info| info.repo_path == repo)
            .map(|info| info.origin_url.clone())
            .unwrap_or_default())
    }

    fn is_worktree(&self, path: &Path) -> bool {
        path.join(GIT_MARKER).is_file()
    }

    fn validate_link(&self, path: &Path) -> Result<()> {
        match self.broken_links.get(path) {
            Some(reason) => Err(WorktreeKeeperError::broken_link(reason.clone())),
            None => Ok(()),
        }
    }

    fn recorded_repo_path(&self, path: &Path) -> Option<PathBuf> {
        self.recorded_repos.get(path).cloned()
    }

    fn is_valid_repo(&self, path: &Path) -> bool {
        self.valid_repos.contains(path)
    }

    fn can_repair(&self, repo: &Path) -> bool {
        self.valid_repos.contains(repo) && !self.unrepairable.contains(repo)
    }

    fn repair_link(&self, repo: &Path, worktree: &Path) -> Result<()> {
        if self.fail_repairs {
            return Err(WorktreeKeeperError::git_command_failed(
                "worktree repair",
                "fatal: not a valid path",
            ));
        }
        self.repaired
            .borrow_mut()
            .push((repo.to_path_buf(), worktree.to_path_buf()));
        Ok(())
    }

    fn prunable_worktrees(&self, repo: &Path) -> Result<Vec<String>> {
        self.prunable
            .get(repo)
            .cloned()
            .ok_or_else(|| WorktreeKeeperError::not_a_repository(repo))
    }

    fn prune(&self, repo: &Path) -> Result<()> {
        self.pruned.borrow_mut().push(repo.to_path_buf());
        Ok(())
    }

    fn known_worktree_paths(&self, repo: &Path) -> Result<Vec<PathBuf>> {
        self.known_worktrees
            .get(repo)
            .cloned()
            .ok_or_else(|| WorktreeKeeperError::not_a_repository(repo))
    }

    fn find_repo_by_name(&self, name: &str, candidates: &[PathBuf]) -> Option<PathBuf> {
        candidates
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| self.valid_repos.contains(candidate))
    }
}
