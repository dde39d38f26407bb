//! Applies diagnostic fixes to the in-memory cache and to git, then saves once.

use super::{FixAction, Issue};
use crate::core::cache::{self, WorktreeCache};
use crate::core::error::{Result, WorktreeKeeperError};
use crate::core::git::GitOps;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairFailure {
    pub key: String,
    pub fix: FixAction,
    pub reason: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepairSummary {
    pub fixed: usize,
    pub failed: usize,
    pub failures: Vec<RepairFailure>,
}

pub struct RepairExecutor<'a> {
    git: &'a dyn GitOps,
    /// Scan root, which is also where the cache file lives.
    root: &'a Path,
}

impl<'a> RepairExecutor<'a> {
    pub fn new(git: &'a dyn GitOps, root: &'a Path) -> Self {
        Self { git, root }
    }

    /// Apply every issue's fix. A failed fix is recorded and the rest still run.
    ///
    /// The cache is written once at the end, and only if something was fixed.
    pub fn run(&self, cache: &mut WorktreeCache, issues: &[Issue]) -> Result<RepairSummary> {
        let mut summary = RepairSummary::default();
        let mut pruned = HashSet::new();

        for issue in issues {
            match self.apply(cache, issue, &mut pruned) {
                Ok(()) => {
                    log::info!("Fixed '{}' ({})", issue.key, issue.fix);
                    summary.fixed += 1;
                }
                Err(e) => {
                    log::warn!("Could not fix '{}' ({}): {e}", issue.key, issue.fix);
                    summary.failed += 1;
                    summary.failures.push(RepairFailure {
                        key: issue.key.clone(),
                        fix: issue.fix,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if summary.fixed > 0 {
            cache::save(self.root, cache)?;
        }
        Ok(summary)
    }

    fn apply(
        &self,
        cache: &mut WorktreeCache,
        issue: &Issue,
        pruned: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        match issue.fix {
            FixAction::MarkRemoved => {
                cache.mark_removed_by_key(&issue.key);
                Ok(())
            }
            FixAction::UpdatePath => {
                let path = self.root.join(&issue.key);
                entry_mut(cache, &issue.key)?.path = path;
                Ok(())
            }
            FixAction::UpdateMetadata => {
                let path = entry_mut(cache, &issue.key)?.path.clone();
                let info = self.git.worktree_info(&path)?;
                let entry = entry_mut(cache, &issue.key)?;
                entry.repo_path = info.repo_path;
                entry.branch = info.branch;
                entry.origin_url = info.origin_url;
                Ok(())
            }
            FixAction::ReassignId => {
                let id = fresh_id(cache);
                let entry = entry_mut(cache, &issue.key)?;
                log::debug!("Reassigning '{}' from id {} to {id}", issue.key, entry.id);
                entry.id = id;
                Ok(())
            }
            FixAction::Repair => self.repair_entry(cache, issue),
            FixAction::Prune => {
                let repo = required_repo(issue)?;
                if pruned.insert(repo.to_path_buf()) {
                    self.git.prune(repo)?;
                }
                Ok(())
            }
            FixAction::AddToCache => self.add(cache, &issue.key),
            FixAction::RepairAndAdd => {
                let repo = required_repo(issue)?;
                self.git.repair_link(repo, &self.root.join(&issue.key))?;
                self.add(cache, &issue.key)
            }
            FixAction::RemoveOrphanDir => Err(WorktreeKeeperError::repair_failed(format!(
                "{} was left in place, remove it manually",
                self.root.join(&issue.key).display()
            ))),
        }
    }

    fn repair_entry(&self, cache: &mut WorktreeCache, issue: &Issue) -> Result<()> {
        let entry = entry_mut(cache, &issue.key)?;
        let worktree = entry.path.clone();
        let repo = match &issue.repo_path {
            Some(repo) => repo.clone(),
            None if entry.has_repo_path() => entry.repo_path.clone(),
            None => {
                return Err(WorktreeKeeperError::repair_failed(
                    "no repository recorded for this worktree",
                ))
            }
        };

        self.git.repair_link(&repo, &worktree)?;

        let entry = entry_mut(cache, &issue.key)?;
        if entry.repo_path != repo {
            log::info!(
                "Repository of '{}' moved to {}",
                issue.key,
                repo.display()
            );
            match self.git.origin_url(&repo) {
                Ok(origin) => entry.origin_url = origin,
                Err(e) => log::debug!("Keeping cached origin for '{}': {e}", issue.key),
            }
            entry.repo_path = repo;
        }
        Ok(())
    }

    fn add(&self, cache: &mut WorktreeCache, key: &str) -> Result<()> {
        let info = self.git.worktree_info(&self.root.join(key))?;
        let id = cache.get_or_assign_id(&info);
        log::debug!("Added '{key}' to the cache as id {id}");
        Ok(())
    }
}

fn entry_mut<'c>(cache: &'c mut WorktreeCache, key: &str) -> Result<&'c mut cache::WorktreeEntry> {
    cache
        .worktrees
        .get_mut(key)
        .ok_or_else(|| WorktreeKeeperError::repair_failed(format!("'{key}' is not in the cache")))
}

fn required_repo(issue: &Issue) -> Result<&Path> {
    issue
        .repo_path
        .as_deref()
        .ok_or_else(|| WorktreeKeeperError::repair_failed("no repository path on issue"))
}

/// Allocate an id strictly above the current counter and every id in use.
fn fresh_id(cache: &mut WorktreeCache) -> u64 {
    let highest = cache.worktrees.values().map(|entry| entry.id).max().unwrap_or(0);
    cache.next_id = cache.next_id.max(highest + 1) + 1;
    cache.allocate_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::doctor::{Finding, IssueCategory};
    use crate::core::registry::WorktreeInfo;
    use crate::core::testing::{active_entry, FakeGit, Workspace};

    fn issue(key: &str, fix: FixAction) -> Issue {
        Finding::new(key, "test", fix).into_issue(IssueCategory::Cache)
    }

    fn issue_with_repo(key: &str, fix: FixAction, repo: &Path) -> Issue {
        Finding::new(key, "test", fix)
            .with_repo(repo)
            .into_issue(IssueCategory::Git)
    }

    #[test]
    fn test_mark_removed_is_saved() {
        let ws = Workspace::new();
        let root = ws.scan_root();
        let mut cache = WorktreeCache::new();
        cache
            .worktrees
            .insert("repo-old".to_string(), active_entry(1, &root.join("repo-old"), "/src/repo"));
        cache.next_id = 2;

        let git = FakeGit::default();
        let summary = RepairExecutor::new(&git, &root)
            .run(&mut cache, &[issue("repo-old", FixAction::MarkRemoved)])
            .unwrap();

        assert_eq!(summary.fixed, 1);
        assert_eq!(summary.failed, 0);
        let saved = cache::load(&root).unwrap();
        assert!(saved.worktrees["repo-old"].removed_at.is_some());
    }

    #[test]
    fn test_reassign_id_takes_unused_id() {
        let ws = Workspace::new();
        let root = ws.scan_root();
        let mut cache = WorktreeCache::new();
        cache
            .worktrees
            .insert("alpha".to_string(), active_entry(3, &root.join("alpha"), "/src/repo"));
        cache
            .worktrees
            .insert("beta".to_string(), active_entry(3, &root.join("beta"), "/src/repo"));
        cache.next_id = 4;
        let prior = cache.next_id;

        let git = FakeGit::default();
        RepairExecutor::new(&git, &root)
            .run(&mut cache, &[issue("beta", FixAction::ReassignId)])
            .unwrap();

        let beta = cache.worktrees["beta"].id;
        assert_eq!(cache.worktrees["alpha"].id, 3);
        assert!(beta > prior);
        assert!(cache.next_id > beta);
        assert_eq!(beta, 5);
        assert_eq!(cache.next_id, 6);
    }

    #[test]
    fn test_reassign_id_skips_past_corrupt_counter() {
        let ws = Workspace::new();
        let root = ws.scan_root();
        let mut cache = WorktreeCache::new();
        cache
            .worktrees
            .insert("alpha".to_string(), active_entry(7, &root.join("alpha"), "/src/repo"));
        cache
            .worktrees
            .insert("beta".to_string(), active_entry(7, &root.join("beta"), "/src/repo"));
        cache.next_id = 2;

        let git = FakeGit::default();
        RepairExecutor::new(&git, &root)
            .run(&mut cache, &[issue("beta", FixAction::ReassignId)])
            .unwrap();

        assert_eq!(cache.worktrees["beta"].id, 9);
        assert_eq!(cache.next_id, 10);
    }

    #[test]
    fn test_update_path_and_metadata() {
        let ws = Workspace::new();
        let root = ws.scan_root();
        let path = ws.worktree("feature");
        let mut cache = WorktreeCache::new();
        cache.worktrees.insert(
            "feature".to_string(),
            active_entry(1, Path::new("/old/feature"), ""),
        );

        let mut git = FakeGit::default();
        git.infos.insert(
            path.clone(),
            WorktreeInfo {
                path: path.clone(),
                branch: "feature".to_string(),
                origin_url: "git@gitlab.com:acme/widget.git".to_string(),
                repo_path: PathBuf::from("/src/widget"),
            },
        );

        let summary = RepairExecutor::new(&git, &root)
            .run(
                &mut cache,
                &[
                    issue("feature", FixAction::UpdatePath),
                    issue("feature", FixAction::UpdateMetadata),
                ],
            )
            .unwrap();

        assert_eq!(summary.fixed, 2);
        let entry = &cache.worktrees["feature"];
        assert_eq!(entry.path, path);
        assert_eq!(entry.branch, "feature");
        assert_eq!(entry.repo_path, PathBuf::from("/src/widget"));
    }

    #[test]
    fn test_repair_against_moved_repo_updates_entry() {
        let ws = Workspace::new();
        let root = ws.scan_root();
        let path = ws.worktree("feature");
        let moved = ws.root().join("repos").join("widget");
        let mut cache = WorktreeCache::new();
        cache
            .worktrees
            .insert("feature".to_string(), active_entry(1, &path, "/old/widget"));

        let mut git = FakeGit::default();
        git.infos.insert(
            moved.join("main"),
            WorktreeInfo {
                path: moved.join("main"),
                branch: "main".to_string(),
                origin_url: "git@gitlab.com:acme/widget.git".to_string(),
                repo_path: moved.clone(),
            },
        );

        let summary = RepairExecutor::new(&git, &root)
            .run(&mut cache, &[issue_with_repo("feature", FixAction::Repair, &moved)])
            .unwrap();

        assert_eq!(summary.fixed, 1);
        assert_eq!(git.repaired.borrow().as_slice(), &[(moved.clone(), path)]);
        let entry = &cache.worktrees["feature"];
        assert_eq!(entry.repo_path, moved);
        assert_eq!(entry.origin_url, "git@gitlab.com:acme/widget.git");
    }

    #[test]
    fn test_prune_runs_once_per_repo() {
        let ws = Workspace::new();
        let root = ws.scan_root();
        let repo = PathBuf::from("/src/widget");
        let mut cache = WorktreeCache::new();

        let git = FakeGit::default();
        let summary = RepairExecutor::new(&git, &root)
            .run(
                &mut cache,
                &[
                    issue_with_repo("stale-one", FixAction::Prune, &repo),
                    issue_with_repo("stale-two", FixAction::Prune, &repo),
                ],
            )
            .unwrap();

        assert_eq!(summary.fixed, 2);
        assert_eq!(git.pruned.borrow().as_slice(), &[repo]);
    }

    #[test]
    fn test_add_and_repair_and_add() {
        let ws = Workspace::new();
        let root = ws.scan_root();
        let healthy = ws.orphan_worktree("healthy");
        let broken = ws.orphan_worktree("broken");
        let repo = ws.root().join("src").join("widget");

        let mut git = FakeGit::default();
        for path in [&healthy, &broken] {
            git.infos.insert(
                path.clone(),
                WorktreeInfo {
                    path: path.clone(),
                    branch: "main".to_string(),
                    origin_url: String::new(),
                    repo_path: repo.clone(),
                },
            );
        }

        let mut cache = WorktreeCache::new();
        let summary = RepairExecutor::new(&git, &root)
            .run(
                &mut cache,
                &[
                    issue("healthy", FixAction::AddToCache),
                    issue_with_repo("broken", FixAction::RepairAndAdd, &repo),
                ],
            )
            .unwrap();

        assert_eq!(summary.fixed, 2);
        assert_eq!(cache.worktrees["healthy"].id, 1);
        assert_eq!(cache.worktrees["broken"].id, 2);
        assert_eq!(git.repaired.borrow().as_slice(), &[(repo, broken)]);
    }

    #[test]
    fn test_orphan_dir_is_never_deleted() {
        let ws = Workspace::new();
        let root = ws.scan_root();
        let stray = ws.orphan_worktree("stray");
        let mut cache = WorktreeCache::new();

        let git = FakeGit::default();
        let summary = RepairExecutor::new(&git, &root)
            .run(&mut cache, &[issue("stray", FixAction::RemoveOrphanDir)])
            .unwrap();

        assert_eq!(summary.fixed, 0);
        assert_eq!(summary.failed, 1);
        assert!(summary.failures[0].reason.contains("remove it manually"));
        assert!(stray.exists());
        // Nothing fixed, nothing written.
        assert!(!cache::cache_file_path(&root).exists());
    }

    #[test]
    fn test_failure_does_not_block_other_fixes() {
        let ws = Workspace::new();
        let root = ws.scan_root();
        let path = ws.worktree("feature");
        let mut cache = WorktreeCache::new();
        cache
            .worktrees
            .insert("feature".to_string(), active_entry(1, &path, "/src/widget"));
        cache
            .worktrees
            .insert("gone".to_string(), active_entry(2, &root.join("gone"), "/src/widget"));
        cache.next_id = 3;

        let git = FakeGit {
            fail_repairs: true,
            ..FakeGit::default()
        };
        let summary = RepairExecutor::new(&git, &root)
            .run(
                &mut cache,
                &[
                    issue("feature", FixAction::Repair),
                    issue("gone", FixAction::MarkRemoved),
                    issue("missing", FixAction::UpdatePath),
                ],
            )
            .unwrap();

        assert_eq!(summary.fixed, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failures[0].key, "feature");
        assert_eq!(summary.failures[1].fix, FixAction::UpdatePath);
        let saved = cache::load(&root).unwrap();
        assert!(saved.worktrees["gone"].removed_at.is_some());
        assert!(saved.worktrees["feature"].removed_at.is_none());
    }
}
