//! Cached pull/merge request metadata.
//!
//! Each [`WorktreeEntry`](crate::core::cache::WorktreeEntry) may carry a [`PrInfo`]
//! snapshot fetched from its forge. Snapshots older than [`PR_CACHE_MAX_AGE_HOURS`]
//! are stale; a snapshot without a timestamp is always stale.

use crate::core::cache::WorktreeCache;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PR_CACHE_MAX_AGE_HOURS: i64 = 24;

pub fn pr_cache_max_age() -> Duration {
    Duration::hours(PR_CACHE_MAX_AGE_HOURS)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Merged,
    Closed,
    Draft,
    /// Fetched, but the forge has no PR for the branch.
    #[default]
    #[serde(rename = "")]
    None,
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Merged => "merged",
            Self::Closed => "closed",
            Self::Draft => "draft",
            Self::None => "no PR",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrInfo {
    pub number: u64,
    pub state: PrState,
    pub url: String,
    pub author: String,
    pub comment_count: u32,
    pub has_reviews: bool,
    pub is_approved: bool,
    pub cached_at: Option<DateTime<Utc>>,
}

impl PrInfo {
    /// Snapshot recording that the forge has no PR for a branch.
    pub fn not_found(cached_at: DateTime<Utc>) -> Self {
        Self {
            cached_at: Some(cached_at),
            ..Self::default()
        }
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// Exactly [`pr_cache_max_age`] old is still fresh.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        match self.cached_at {
            None => true,
            Some(cached_at) => now.signed_duration_since(cached_at) > pr_cache_max_age(),
        }
    }

    pub fn exists(&self) -> bool {
        self.state != PrState::None
    }
}

impl WorktreeCache {
    /// Branch of the entry whose fresh PR matches `number` on `origin_url`.
    pub fn get_branch_by_pr_number(&self, origin_url: &str, number: u64) -> Option<&str> {
        self.worktrees
            .values()
            .filter(|entry| entry.origin_url == origin_url)
            .find(|entry| {
                entry
                    .pr
                    .as_ref()
                    .is_some_and(|pr| pr.exists() && pr.number == number && !pr.is_stale())
            })
            .map(|entry| entry.branch.as_str())
    }

    pub fn get_pr_for_branch(&self, key: &str) -> Option<&PrInfo> {
        self.worktrees.get(key).and_then(|entry| entry.pr.as_ref())
    }

    /// Unknown keys are ignored.
    pub fn set_pr_for_branch(&mut self, key: &str, pr: PrInfo) {
        match self.worktrees.get_mut(key) {
            Some(entry) => entry.pr = Some(pr),
            None => log::debug!("Ignoring PR update for unknown worktree '{key}'"),
        }
    }

    pub fn get_pr_by_origin_and_branch(&self, origin_url: &str, branch: &str) -> Option<&PrInfo> {
        self.worktrees
            .values()
            .filter(|entry| entry.origin_url == origin_url && entry.branch == branch)
            .find_map(|entry| entry.pr.as_ref())
    }

    /// Updates every entry on `(origin_url, branch)`; a no-op when none match.
    pub fn set_pr_by_origin_and_branch(&mut self, origin_url: &str, branch: &str, pr: PrInfo) {
        let mut matched = false;
        for entry in self
            .worktrees
            .values_mut()
            .filter(|entry| entry.origin_url == origin_url && entry.branch == branch)
        {
            entry.pr = Some(pr.clone());
            matched = true;
        }
        if !matched {
            log::debug!("No worktree for {origin_url} {branch}, PR not cached");
        }
    }
}
