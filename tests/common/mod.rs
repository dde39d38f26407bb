//! Shared utilities for worktree-keeper integration tests
//!
//! Tests drive the real binary against real git repositories and worktrees
//! created in temp directories.

pub mod assertions;
pub mod fixtures;
pub mod repository;
