//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`WorktreeKeeperError`] which covers every failure that is
//! allowed to escape the core. It uses `thiserror` for ergonomic error definitions
//! and includes constructors for the common failure scenarios.
//!
//! # Public API
//! - [`WorktreeKeeperError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, WorktreeKeeperError>`
//!
//! # Error Categories
//! - **Git operations**: Repository not found, git2 library errors, failed git commands
//! - **Cache operations**: Lock acquisition, read/write/serialize failures
//! - **Lookups**: Unknown or removed worktree ids
//! - **Forge operations**: Missing or failing forge CLIs
//!
//! Missing, corrupted or legacy cache files are not errors; the store recovers
//! from them silently.

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for worktree-keeper
#[derive(Error, Debug)]
pub enum WorktreeKeeperError {
    // Git repository errors
    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("Git repository error: {0}")]
    GitRepo(#[from] git2::Error),

    #[error("git {command} failed: {stderr}")]
    GitCommandFailed { command: String, stderr: String },

    #[error("Worktree link is broken: {reason}")]
    BrokenLink { reason: String },

    // File operation errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Cache errors
    #[error("Failed to acquire cache lock '{path}': {source}")]
    LockFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create cache directory '{path}': {source}")]
    CacheDirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read cache file '{path}': {source}")]
    CacheReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize cache data: {source}")]
    CacheSerializationFailed { source: serde_json::Error },

    #[error("Failed to write cache file '{path}': {source}")]
    CacheWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Could not find config directory")]
    ConfigDirectoryNotFound,

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    // Lookup errors
    #[error("No worktree with id {id}")]
    UnknownId { id: u64 },

    #[error("Worktree {id} was removed (last seen at {path})")]
    RemovedId { id: u64, path: PathBuf },

    // Forge errors
    #[error("Cannot determine forge for origin '{origin}'. Set \"forge\" in config.json")]
    UnsupportedForge { origin: String },

    #[error("{tool} failed: {stderr}")]
    ForgeCommandFailed { tool: String, stderr: String },

    // Repair errors
    #[error("{0}")]
    RepairFailed(String),
}

/// Convenience type alias for Results using WorktreeKeeperError
pub type Result<T> = std::result::Result<T, WorktreeKeeperError>;

impl WorktreeKeeperError {
    /// Create a not-a-repository error
    pub fn not_a_repository(path: impl Into<PathBuf>) -> Self {
        Self::NotARepository { path: path.into() }
    }

    /// Create a git command failure from the subcommand and its stderr
    pub fn git_command_failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::GitCommandFailed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a broken link error
    pub fn broken_link(reason: impl Into<String>) -> Self {
        Self::BrokenLink {
            reason: reason.into(),
        }
    }

    /// Create a lock acquisition error
    pub fn lock_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LockFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a cache directory creation failed error
    pub fn cache_directory_creation_failed(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::CacheDirectoryCreationFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a cache read failed error
    pub fn cache_read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a cache serialization failed error
    pub fn cache_serialization_failed(source: serde_json::Error) -> Self {
        Self::CacheSerializationFailed { source }
    }

    /// Create a cache write failed error
    pub fn cache_write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheWriteFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a config parse error
    pub fn config_parse_failed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::ConfigParseFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a forge command failure
    pub fn forge_command_failed(tool: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::ForgeCommandFailed {
            tool: tool.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a repair failure with a message
    pub fn repair_failed(message: impl Into<String>) -> Self {
        Self::RepairFailed(message.into())
    }
}
