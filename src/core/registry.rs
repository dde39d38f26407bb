//! Stable worktree identities.
//!
//! Ids are minted only by [`WorktreeCache::get_or_assign_id`], in first-seen order,
//! and are never reused. Worktrees that disappear are soft-deleted so that their id
//! survives if they come back.

use crate::core::cache::{make_worktree_key, WorktreeCache, WorktreeEntry};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Live metadata for one worktree, as reported by git.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: String,
    pub origin_url: String,
    pub repo_path: PathBuf,
}

/// Result of an id lookup. A removed entry is distinct from a missing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Active(T),
    Removed(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Active(value) => Lookup::Active(f(value)),
            Self::Removed(value) => Lookup::Removed(f(value)),
            Self::NotFound => Lookup::NotFound,
        }
    }

    pub fn active(self) -> Option<T> {
        match self {
            Self::Active(value) => Some(value),
            _ => None,
        }
    }
}

impl WorktreeCache {
    /// Return the id for `info.path`, creating the entry if needed.
    ///
    /// Existing entries get their metadata refreshed and lose any removal mark.
    pub fn get_or_assign_id(&mut self, info: &WorktreeInfo) -> u64 {
        let key = make_worktree_key(&info.path);

        if let Some(entry) = self.worktrees.get_mut(&key) {
            entry.path = info.path.clone();
            entry.branch = info.branch.clone();
            entry.origin_url = info.origin_url.clone();
            entry.repo_path = info.repo_path.clone();
            if entry.removed_at.take().is_some() {
                log::info!("Worktree '{key}' reappeared, keeping id {}", entry.id);
            }
            return entry.id;
        }

        let id = self.allocate_id();
        log::debug!("Assigned id {id} to worktree '{key}'");
        self.worktrees.insert(
            key,
            WorktreeEntry {
                id,
                path: info.path.clone(),
                branch: info.branch.clone(),
                origin_url: info.origin_url.clone(),
                repo_path: info.repo_path.clone(),
                removed_at: None,
                pr: None,
            },
        );
        id
    }

    pub fn get_by_id(&self, id: u64) -> Lookup<&WorktreeEntry> {
        match self.worktrees.values().find(|entry| entry.id == id) {
            Some(entry) if entry.is_removed() => Lookup::Removed(entry),
            Some(entry) => Lookup::Active(entry),
            None => Lookup::NotFound,
        }
    }

    pub fn get_branch_by_id(&self, id: u64) -> Lookup<&str> {
        self.get_by_id(id).map(|entry| entry.branch.as_str())
    }

    pub fn key_for_id(&self, id: u64) -> Option<&str> {
        self.worktrees
            .iter()
            .find(|(_, entry)| entry.id == id)
            .map(|(key, _)| key.as_str())
    }

    /// Soft-delete the entry for `path`. Returns whether anything changed.
    pub fn mark_removed(&mut self, path: &Path) -> bool {
        let key = make_worktree_key(path);
        self.mark_removed_by_key(&key)
    }

    /// Soft-delete by key; unknown and already-removed keys are left alone.
    pub fn mark_removed_by_key(&mut self, key: &str) -> bool {
        match self.worktrees.get_mut(key) {
            Some(entry) if entry.removed_at.is_none() => {
                entry.removed_at = Some(Utc::now());
                log::debug!("Marked worktree '{key}' (id {}) as removed", entry.id);
                true
            }
            _ => false,
        }
    }

    /// Reconcile the cache with the worktrees that currently exist.
    ///
    /// Live worktrees are created or refreshed; cached worktrees missing from
    /// `live` are soft-deleted. Returns the id assigned to each live path.
    pub fn sync_worktrees(&mut self, live: &[WorktreeInfo]) -> HashMap<PathBuf, u64> {
        let mut assigned = HashMap::with_capacity(live.len());
        let mut live_keys = HashSet::with_capacity(live.len());

        for info in live {
            let id = self.get_or_assign_id(info);
            assigned.insert(info.path.clone(), id);
            live_keys.insert(make_worktree_key(&info.path));
        }

        let vanished: Vec<String> = self
            .active_entries()
            .filter(|(key, _)| !live_keys.contains(key.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &vanished {
            self.mark_removed_by_key(key);
        }

        log::debug!(
            "Synced {} live worktrees, {} newly removed",
            live.len(),
            vanished.len()
        );
        assigned
    }
}
