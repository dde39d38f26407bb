//! Worktree Keeper - stable ids, cached metadata and self-healing for git worktrees.
//!
//! All worktrees live as direct children of one root directory. The library keeps
//! a JSON cache in that directory that gives every worktree a stable numeric id,
//! remembers its branch, origin and pull/merge request, and can diagnose and
//! repair divergence between the cache, the filesystem and git.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module:
//! - Cache load/save with an advisory file lock
//! - Identity registry and PR/MR metadata index
//! - Diagnostics and repair
//! - Error handling and result types

pub mod commands;
pub mod core;

pub use core::{
    // Persistence
    load,
    load_with_lock,
    make_worktree_key,
    save,
    // Diagnostics
    run_diagnostics,
    Config,
    DiagnosticContext,
    DiagnosticReport,
    FileLock,
    FixAction,
    Forge,
    ForgeKind,
    GitCli,
    // Collaborators
    GitOps,
    Issue,
    IssueCategory,
    Lookup,
    PrInfo,
    PrState,
    RepairExecutor,
    RepairSummary,
    // Error handling
    Result,
    WorktreeCache,
    WorktreeEntry,
    WorktreeInfo,
    WorktreeKeeperError,
};
