//! Core functionality for worktree-keeper.
//!
//! This module provides the cache store and its lock, worktree identities,
//! PR/MR metadata, the git and forge collaborators, diagnostics and repair,
//! and terminal output helpers.

pub mod cache;
pub mod config;
pub mod dirs;
pub mod doctor;
pub mod error;
pub mod forge;
pub mod git;
pub mod lock;
pub mod output;
pub mod pr;
pub mod registry;

#[cfg(test)]
pub mod testing;

// === Error handling ===
pub use error::{Result, WorktreeKeeperError};

// === Persistence ===
// Crash-safe cache document guarded by an advisory file lock
pub use cache::{load, load_with_lock, make_worktree_key, save, WorktreeCache, WorktreeEntry};
pub use lock::FileLock;

// === Identity and PR metadata ===
pub use pr::{PrInfo, PrState};
pub use registry::{Lookup, WorktreeInfo};

// === Collaborators ===
pub use forge::{Forge, ForgeKind};
pub use git::{GitCli, GitOps};

// === Configuration ===
pub use config::Config;

// === Diagnostics ===
pub use doctor::{
    run_diagnostics, DiagnosticContext, DiagnosticReport, FixAction, Issue, IssueCategory,
    RepairExecutor, RepairSummary,
};

// === Output formatting ===
pub use output::{print_error, print_info, print_section_header, print_success, print_warning};
