//! Cache entries that no longer describe the filesystem.

use super::{Checker, DiagnosticContext, Finding, FixAction, IssueCategory};
use crate::core::git::same_path;
use std::collections::HashSet;

pub struct CacheIntegrityChecker;

impl Checker for CacheIntegrityChecker {
    fn category(&self) -> IssueCategory {
        IssueCategory::Cache
    }

    fn check(&self, ctx: &DiagnosticContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();

        // At most one finding per entry, in priority order.
        for (key, entry) in ctx.cache.active_entries() {
            if !entry.path.exists() {
                findings.push(Finding::new(
                    key,
                    format!("path no longer exists: {}", entry.path.display()),
                    FixAction::MarkRemoved,
                ));
                continue;
            }

            let expected = ctx.scan_root.join(key);
            if expected.is_dir() && !same_path(&expected, &entry.path) {
                findings.push(Finding::new(
                    key,
                    format!(
                        "path mismatch: cached {} but found {}",
                        entry.path.display(),
                        expected.display()
                    ),
                    FixAction::UpdatePath,
                ));
                continue;
            }

            if !entry.has_repo_path() {
                findings.push(Finding::new(
                    key,
                    "missing metadata: repository path is empty",
                    FixAction::UpdateMetadata,
                ));
            }
        }

        findings.extend(duplicate_ids(ctx));
        findings
    }
}

/// The first entry holding an id keeps it; later holders need a new one.
fn duplicate_ids(ctx: &DiagnosticContext<'_>) -> Vec<Finding> {
    let mut seen = HashSet::new();
    ctx.cache
        .active_entries()
        .filter(|(_, entry)| !seen.insert(entry.id))
        .map(|(key, entry)| {
            Finding::new(
                key,
                format!("duplicate id {} shared with another worktree", entry.id),
                FixAction::ReassignId,
            )
        })
        .collect()
}
