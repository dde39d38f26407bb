use crate::commands::context::CommandContext;
use crate::core::{
    cache::{self, WorktreeCache, WorktreeEntry},
    error::{Result, WorktreeKeeperError},
    forge::{resolve_forge, Forge},
    pr::PrInfo,
    print_info,
    registry::Lookup,
};
use chrono::Utc;
use colored::*;

/// Show the PR for worktree `id`, fetching it when the cached copy is missing,
/// stale or `refresh` is set.
pub fn execute_pr(ctx: &CommandContext, id: u64, refresh: bool) -> Result<()> {
    let root = ctx.root();
    let (mut cache, lock) = cache::load_with_lock(root)?;

    let (key, entry) = active_entry(&cache, id)?;
    let cached = cache
        .get_pr_for_branch(&key)
        .filter(|pr| !refresh && !pr.is_stale())
        .cloned();
    let pr = match cached {
        Some(pr) => {
            log::debug!("Using cached PR for '{key}'");
            pr
        }
        None => {
            let forge = resolve_forge(ctx.config.forge, &entry.origin_url)?;
            let pr = fetch_pr(forge.as_ref(), &entry)?;
            cache.set_pr_for_branch(&key, pr.clone());
            cache::save(root, &cache)?;
            pr
        }
    };
    lock.release()?;

    print_info(&format_pr(&entry.branch, &pr));
    Ok(())
}

fn active_entry(cache: &WorktreeCache, id: u64) -> Result<(String, WorktreeEntry)> {
    let entry = match cache.get_by_id(id) {
        Lookup::Active(entry) => entry.clone(),
        Lookup::Removed(entry) => {
            return Err(WorktreeKeeperError::RemovedId {
                id,
                path: entry.path.clone(),
            })
        }
        Lookup::NotFound => return Err(WorktreeKeeperError::UnknownId { id }),
    };
    let key = cache
        .key_for_id(id)
        .map(str::to_string)
        .ok_or(WorktreeKeeperError::UnknownId { id })?;
    Ok((key, entry))
}

fn fetch_pr(forge: &dyn Forge, entry: &WorktreeEntry) -> Result<PrInfo> {
    log::debug!("Fetching {} PR for branch '{}'", forge.kind(), entry.branch);
    let fetched = forge.fetch_pr_for_branch(&entry.path, &entry.branch)?;
    Ok(fetched.unwrap_or_else(|| PrInfo::not_found(Utc::now())))
}

fn format_pr(branch: &str, pr: &PrInfo) -> String {
    if !pr.exists() {
        return format!("{}  {}", branch.green(), "no PR".bright_black());
    }

    let mut line = format!("{}  #{} {}", branch.green(), pr.number, pr.state);
    if !pr.author.is_empty() {
        line.push_str(&format!(" by {}", pr.author));
    }
    if pr.is_approved {
        line.push_str(", approved");
    } else if pr.has_reviews {
        line.push_str(", reviewed");
    }
    if pr.comment_count > 0 {
        line.push_str(&format!(", {} comment(s)", pr.comment_count));
    }
    if !pr.url.is_empty() {
        line.push_str(&format!("\n{}", pr.url.bright_black()));
    }
    line
}
