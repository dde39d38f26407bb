//! Diagnostics and repair for the worktree cache.
//!
//! Three checkers compare the loaded cache against the filesystem and git and
//! report [`Issue`]s. They only observe: nothing here writes to the cache or the
//! disk. [`repair::RepairExecutor`] applies the fixes afterwards.
//!
//! # Checkers
//! - [`cache_check::CacheIntegrityChecker`]: missing paths, moved paths, missing
//!   metadata, duplicate ids
//! - [`git_check::GitLinkChecker`]: broken worktree links and prunable records
//! - [`orphan_check::OrphanChecker`]: worktrees missing from the cache and cache
//!   entries git no longer knows
//!
//! A collaborator failure skips the affected check and the scan moves on.

pub mod cache_check;
pub mod git_check;
pub mod issue;
pub mod orphan_check;
pub mod repair;

pub use issue::{Finding, FixAction, Issue, IssueCategory};
pub use repair::{RepairExecutor, RepairFailure, RepairSummary};

use crate::core::cache::WorktreeCache;
use crate::core::git::GitOps;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Everything a checker may look at.
pub struct DiagnosticContext<'a> {
    pub cache: &'a WorktreeCache,
    pub scan_root: &'a Path,
    /// Tried in order when a repository has moved.
    pub repo_search_dirs: &'a [PathBuf],
    pub git: &'a dyn GitOps,
}

pub trait Checker {
    fn category(&self) -> IssueCategory;
    fn check(&self, ctx: &DiagnosticContext<'_>) -> Vec<Finding>;
}

/// Where a worktree's repository lives now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RepoLocation {
    InPlace(PathBuf),
    Moved(PathBuf),
    NotFound(String),
}

/// Find the repository a worktree belongs to, searching by name if it is no
/// longer at `recorded`.
pub(crate) fn locate_repo(ctx: &DiagnosticContext<'_>, recorded: Option<&Path>) -> RepoLocation {
    let Some(recorded) = recorded.filter(|p| !p.as_os_str().is_empty()) else {
        return RepoLocation::NotFound("<unknown>".to_string());
    };

    if ctx.git.is_valid_repo(recorded) {
        return RepoLocation::InPlace(recorded.to_path_buf());
    }

    let name = match recorded.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return RepoLocation::NotFound(recorded.display().to_string()),
    };

    match ctx.git.find_repo_by_name(&name, ctx.repo_search_dirs) {
        Some(found) => {
            log::debug!("Repository '{name}' moved to {}", found.display());
            RepoLocation::Moved(found)
        }
        None => RepoLocation::NotFound(name),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub issues: Vec<Issue>,
}

impl DiagnosticReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn by_category(&self) -> BTreeMap<IssueCategory, Vec<&Issue>> {
        let mut grouped: BTreeMap<IssueCategory, Vec<&Issue>> = BTreeMap::new();
        for issue in &self.issues {
            grouped.entry(issue.category).or_default().push(issue);
        }
        grouped
    }
}

fn checker_for(category: IssueCategory) -> Box<dyn Checker> {
    match category {
        IssueCategory::Cache => Box::new(cache_check::CacheIntegrityChecker),
        IssueCategory::Git => Box::new(git_check::GitLinkChecker),
        IssueCategory::Orphan => Box::new(orphan_check::OrphanChecker),
    }
}

/// Run the selected checkers (all of them when `categories` is empty) in the
/// order cache, git, orphan.
pub fn run_diagnostics(ctx: &DiagnosticContext<'_>, categories: &[IssueCategory]) -> DiagnosticReport {
    let mut issues = Vec::new();

    for category in IssueCategory::ALL {
        if !categories.is_empty() && !categories.contains(&category) {
            continue;
        }
        let checker = checker_for(category);
        let findings = checker.check(ctx);
        log::debug!("{} checker found {} issues", checker.category(), findings.len());
        issues.extend(findings.into_iter().map(|f| f.into_issue(checker.category())));
    }

    DiagnosticReport {
        issues: drop_ghosts_with_git_issues(issues),
    }
}

/// A worktree already handled by the git checker must not also be marked
/// removed as a ghost in the same pass.
fn drop_ghosts_with_git_issues(issues: Vec<Issue>) -> Vec<Issue> {
    let git_keys: HashSet<String> = issues
        .iter()
        .filter(|issue| issue.category == IssueCategory::Git)
        .map(|issue| issue.key.clone())
        .collect();

    issues
        .into_iter()
        .filter(|issue| {
            let ghost = issue.category == IssueCategory::Orphan && issue.fix == FixAction::MarkRemoved;
            !(ghost && git_keys.contains(&issue.key))
        })
        .collect()
}
