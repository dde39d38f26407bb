use crate::commands::context::CommandContext;
use crate::core::{cache, error::Result, git::GitOps, print_success};
use std::collections::HashSet;

pub fn execute_sync(ctx: &CommandContext) -> Result<()> {
    let root = ctx.root();
    let (mut cache, lock) = cache::load_with_lock(root)?;

    let active_before: HashSet<String> = cache.active_entries().map(|(key, _)| key.clone()).collect();
    let live = ctx.git.list_worktrees(root)?;
    cache.sync_worktrees(&live);

    cache::save(root, &cache)?;
    lock.release()?;

    let newly_removed = active_before
        .iter()
        .filter(|key| cache.worktrees.get(*key).is_some_and(|entry| entry.is_removed()))
        .count();
    print_success(&format!(
        "Tracking {} worktree(s), {} newly marked removed",
        live.len(),
        newly_removed
    ));
    Ok(())
}
