//! Worktrees on disk the cache does not know, and cache entries git does not know.

use super::{locate_repo, Checker, DiagnosticContext, Finding, FixAction, IssueCategory, RepoLocation};
use crate::core::git::same_path;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct OrphanChecker;

impl Checker for OrphanChecker {
    fn category(&self) -> IssueCategory {
        IssueCategory::Orphan
    }

    fn check(&self, ctx: &DiagnosticContext<'_>) -> Vec<Finding> {
        let mut findings = orphan_directories(ctx);
        findings.extend(ghost_entries(ctx));
        findings
    }
}

fn scan_worktree_dirs(ctx: &DiagnosticContext<'_>) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(ctx.scan_root) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot scan {}: {e}", ctx.scan_root.display());
            return Vec::new();
        }
    };

    let mut dirs: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            if name.starts_with('.') || !path.is_dir() || !ctx.git.is_worktree(&path) {
                return None;
            }
            Some((name, path))
        })
        .collect();
    dirs.sort();
    dirs
}

fn orphan_directories(ctx: &DiagnosticContext<'_>) -> Vec<Finding> {
    let active_paths: Vec<&Path> = ctx
        .cache
        .active_entries()
        .map(|(_, entry)| entry.path.as_path())
        .collect();

    let mut findings = Vec::new();
    for (name, path) in scan_worktree_dirs(ctx) {
        if active_paths.iter().any(|known| same_path(known, &path)) {
            continue;
        }

        let reason = match ctx.git.validate_link(&path) {
            Ok(()) => {
                findings.push(Finding::new(
                    name,
                    format!("worktree not in cache: {}", path.display()),
                    FixAction::AddToCache,
                ));
                continue;
            }
            Err(e) => e.to_string(),
        };

        let recorded = ctx.git.recorded_repo_path(&path);
        match locate_repo(ctx, recorded.as_deref()) {
            RepoLocation::InPlace(repo) | RepoLocation::Moved(repo) => findings.push(
                Finding::new(
                    name,
                    format!("worktree not in cache with broken link: {reason}"),
                    FixAction::RepairAndAdd,
                )
                .with_repo(repo),
            ),
            RepoLocation::NotFound(repo_name) => findings.push(Finding::new(
                name,
                format!("orphaned directory, repo not found: {repo_name}"),
                FixAction::RemoveOrphanDir,
            )),
        }
    }
    findings
}

/// Active entries whose repository no longer lists them as worktrees.
fn ghost_entries(ctx: &DiagnosticContext<'_>) -> Vec<Finding> {
    let mut known: HashMap<&Path, Option<Vec<PathBuf>>> = HashMap::new();
    let mut findings = Vec::new();

    for (key, entry) in ctx.cache.active_entries() {
        if !entry.path.exists() || !entry.has_repo_path() {
            continue;
        }
        let repo = entry.repo_path.as_path();
        if !ctx.git.is_valid_repo(repo) {
            continue;
        }

        let paths = known.entry(repo).or_insert_with(|| match ctx.git.known_worktree_paths(repo) {
            Ok(paths) => Some(paths),
            Err(e) => {
                log::debug!("Cannot list worktrees of {}: {e}", repo.display());
                None
            }
        });
        let Some(paths) = paths else {
            continue;
        };

        if !paths.iter().any(|known| same_path(known, &entry.path)) {
            findings.push(Finding::new(
                key,
                format!("ghost entry: {} does not list this worktree", repo.display()),
                FixAction::MarkRemoved,
            ));
        }
    }
    findings
}
