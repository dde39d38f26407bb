//! Predefined sandbox scenarios

#![allow(dead_code)]

use super::repository::*;
use worktree_keeper::core::error::Result;

/// Scenario: two worktrees of the same repository, not yet cached
pub fn sandbox_with_two_worktrees() -> Result<Sandbox> {
    let sandbox = Sandbox::new()?;
    sandbox.add_worktree("widget-alpha", "alpha")?;
    sandbox.add_worktree("widget-beta", "beta")?;
    Ok(sandbox)
}

/// Scenario: two worktrees already cached with ids 1 and 2
pub fn cached_sandbox() -> Result<Sandbox> {
    let sandbox = sandbox_with_two_worktrees()?;
    let output = sandbox.keeper().arg("sync").output()?;
    assert!(output.status.success(), "sync failed: {output:?}");
    Ok(sandbox)
}
