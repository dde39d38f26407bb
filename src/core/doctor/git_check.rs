//! Worktree links between checkouts and their repositories.

use super::{locate_repo, Checker, DiagnosticContext, Finding, FixAction, IssueCategory, RepoLocation};
use crate::core::cache::WorktreeEntry;
use crate::core::git::GIT_MARKER;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub struct GitLinkChecker;

impl Checker for GitLinkChecker {
    fn category(&self) -> IssueCategory {
        IssueCategory::Git
    }

    fn check(&self, ctx: &DiagnosticContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut healthy_repos = BTreeSet::new();

        for (key, entry) in ctx.cache.active_entries() {
            if entry.path.as_os_str().is_empty() || !entry.path.exists() {
                continue;
            }

            let marker = entry.path.join(GIT_MARKER);
            let metadata = match marker.symlink_metadata() {
                Ok(metadata) => metadata,
                Err(_) => {
                    findings.push(Finding::new(
                        key,
                        format!("{} is missing", marker.display()),
                        FixAction::MarkRemoved,
                    ));
                    continue;
                }
            };
            if metadata.is_dir() {
                findings.push(Finding::new(
                    key,
                    "not a worktree: .git is a directory (main repository)",
                    FixAction::MarkRemoved,
                ));
                continue;
            }

            match ctx.git.validate_link(&entry.path) {
                Ok(()) => {
                    if let Some(repo) = owning_repo(ctx, entry) {
                        healthy_repos.insert(repo);
                    }
                }
                Err(e) => findings.push(broken_link_finding(ctx, key, entry, &e.to_string())),
            }
        }

        for repo in healthy_repos {
            match ctx.git.prunable_worktrees(&repo) {
                Ok(names) => findings.extend(names.into_iter().map(|name| {
                    let description =
                        format!("stale worktree record '{name}' in {}", repo.display());
                    Finding::new(name, description, FixAction::Prune).with_repo(&repo)
                })),
                Err(e) => log::debug!("Skipping prune check for {}: {e}", repo.display()),
            }
        }

        findings
    }
}

fn owning_repo(ctx: &DiagnosticContext<'_>, entry: &WorktreeEntry) -> Option<PathBuf> {
    if entry.has_repo_path() {
        return Some(entry.repo_path.clone());
    }
    match ctx.git.main_repo_path(&entry.path) {
        Ok(repo) => Some(repo),
        Err(e) => {
            log::debug!("Cannot resolve repository of {}: {e}", entry.path.display());
            None
        }
    }
}

fn broken_link_finding(
    ctx: &DiagnosticContext<'_>,
    key: &str,
    entry: &WorktreeEntry,
    reason: &str,
) -> Finding {
    let recorded = if entry.has_repo_path() {
        Some(entry.repo_path.clone())
    } else {
        ctx.git.recorded_repo_path(&entry.path)
    };

    let (repo, moved) = match locate_repo(ctx, recorded.as_deref()) {
        RepoLocation::InPlace(repo) => (repo, false),
        RepoLocation::Moved(repo) => (repo, true),
        RepoLocation::NotFound(name) => {
            return Finding::new(
                key,
                format!("broken link, repo not found: {name}"),
                FixAction::MarkRemoved,
            );
        }
    };

    if !ctx.git.can_repair(&repo) {
        return Finding::new(
            key,
            format!("broken link, unrepairable: {reason}"),
            FixAction::MarkRemoved,
        );
    }

    let description = if moved {
        format!("broken link, repo moved to {}", repo.display())
    } else {
        format!("broken link: {reason}")
    };
    Finding::new(key, description, FixAction::Repair).with_repo(repo)
}
