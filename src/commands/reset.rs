use crate::commands::context::CommandContext;
use crate::core::{cache, error::Result, print_success};

/// Forget every worktree and restart ids at 1.
pub fn execute_reset(ctx: &CommandContext) -> Result<()> {
    let root = ctx.root();
    let (mut cache, lock) = cache::load_with_lock(root)?;
    let forgotten = cache.worktrees.len();
    cache.reset();
    cache::save(root, &cache)?;
    lock.release()?;

    print_success(&format!("Cache reset, {forgotten} worktree(s) forgotten"));
    Ok(())
}
