use crate::commands::context::CommandContext;
use crate::core::{
    cache::{self, WorktreeCache},
    error::{Result, WorktreeKeeperError},
    registry::Lookup,
};
use std::path::PathBuf;

/// Print the path of worktree `id`. Read-only, so no lock is taken.
pub fn execute_path(ctx: &CommandContext, id: u64) -> Result<()> {
    let cache = cache::load(ctx.root())?;
    println!("{}", resolve_path(&cache, id)?.display());
    Ok(())
}

fn resolve_path(cache: &WorktreeCache, id: u64) -> Result<PathBuf> {
    match cache.get_by_id(id) {
        Lookup::Active(entry) => Ok(entry.path.clone()),
        Lookup::Removed(entry) => Err(WorktreeKeeperError::RemovedId {
            id,
            path: entry.path.clone(),
        }),
        Lookup::NotFound => Err(WorktreeKeeperError::UnknownId { id }),
    }
}
