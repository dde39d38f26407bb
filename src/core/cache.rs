//! Persistent worktree cache document and its on-disk store.
//!
//! The cache is a single JSON document kept in the worktrees root directory. It maps
//! worktree keys to [`WorktreeEntry`] records and carries the id counter used to
//! mint new worktree ids.
//!
//! # Public API
//! - [`WorktreeCache`]: The cache document
//! - [`WorktreeEntry`]: One tracked worktree
//! - [`load`], [`save`], [`load_with_lock`]: Store operations
//! - [`make_worktree_key`]: Key derivation from a worktree path
//!
//! # Storage Strategy
//! - **Never fatal on bad content**: missing, corrupted and legacy files load as a
//!   fresh document
//! - **Atomic writes**: content goes to `<file>.tmp` and is renamed into place
//! - **Owner-only permissions** on unix

use crate::core::error::{Result, WorktreeKeeperError};
use crate::core::lock::FileLock;
use crate::core::pr::PrInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const CACHE_FILE: &str = ".worktree-cache.json";
pub const LOCK_FILE: &str = ".worktree-cache.lock";

/// Pre-worktree format: origin URL -> branch -> PR.
pub type LegacyPrMap = BTreeMap<String, BTreeMap<String, PrInfo>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorktreeEntry {
    pub id: u64,
    pub path: PathBuf,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub origin_url: String,
    #[serde(default)]
    pub repo_path: PathBuf,
    #[serde(default)]
    pub removed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pr: Option<PrInfo>,
}

impl WorktreeEntry {
    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }

    pub fn has_repo_path(&self) -> bool {
        !self.repo_path.as_os_str().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorktreeCache {
    #[serde(default)]
    pub worktrees: BTreeMap<String, WorktreeEntry>,
    #[serde(default = "first_id")]
    pub next_id: u64,
    /// Only ever populated by hand; [`load`] drops whatever the file carried.
    #[serde(rename = "prs", default, skip_serializing)]
    pub legacy_prs: Option<LegacyPrMap>,
}

fn first_id() -> u64 {
    1
}

impl Default for WorktreeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WorktreeCache {
    pub fn new() -> Self {
        Self {
            worktrees: BTreeMap::new(),
            next_id: first_id(),
            legacy_prs: None,
        }
    }

    /// Drop every entry and restart the id counter.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Entries that are not soft-deleted, in key order.
    pub fn active_entries(&self) -> impl Iterator<Item = (&String, &WorktreeEntry)> {
        self.worktrees.iter().filter(|(_, entry)| !entry.is_removed())
    }

    /// Take the next id from the counter.
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn normalize(&mut self) {
        if self.next_id < 1 {
            log::warn!("Cache next_id was {}, resetting to 1", self.next_id);
            self.next_id = 1;
        }
    }
}

/// Derive the cache key for a worktree path: its final component.
///
/// Worktrees in different repositories that share a directory name map to the
/// same key.
pub fn make_worktree_key(path: impl AsRef<Path>) -> String {
    let raw = path.as_ref().to_string_lossy();
    let trimmed = raw.trim_end_matches(std::path::MAIN_SEPARATOR);
    if trimmed.is_empty() {
        return raw.into_owned();
    }
    match trimmed.rfind(std::path::MAIN_SEPARATOR) {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

pub fn cache_file_path(dir: &Path) -> PathBuf {
    dir.join(CACHE_FILE)
}

pub fn lock_file_path(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE)
}

fn temp_file_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Load the cache document from `dir`.
///
/// Only I/O failures other than "not found" are errors.
pub fn load(dir: &Path) -> Result<WorktreeCache> {
    let cache_file = cache_file_path(dir);

    let content = match fs::read_to_string(&cache_file) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No cache file at {}, starting fresh", cache_file.display());
            return Ok(WorktreeCache::new());
        }
        Err(e) => {
            log::error!("Failed to read cache file '{}': {}", cache_file.display(), e);
            return Err(WorktreeKeeperError::cache_read_failed(&cache_file, e));
        }
    };

    Ok(parse_document(&content, &cache_file))
}

fn parse_document(content: &str, cache_file: &Path) -> WorktreeCache {
    let value: serde_json::Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            log::warn!(
                "Discarding corrupted cache file '{}': {}",
                cache_file.display(),
                e
            );
            return WorktreeCache::new();
        }
    };

    let Some(object) = value.as_object() else {
        log::warn!(
            "Discarding cache file '{}': top level is not an object",
            cache_file.display()
        );
        return WorktreeCache::new();
    };

    if object.contains_key("worktrees") || object.contains_key("next_id") {
        return parse_current(value, cache_file);
    }

    match serde_json::from_value::<LegacyPrMap>(value) {
        Ok(legacy) => {
            let pr_count: usize = legacy.values().map(BTreeMap::len).sum();
            log::warn!(
                "Migrating legacy cache '{}': dropping {} cached PRs from {} origins",
                cache_file.display(),
                pr_count,
                legacy.len()
            );
        }
        Err(e) => {
            log::warn!(
                "Discarding unrecognised cache file '{}': {}",
                cache_file.display(),
                e
            );
        }
    }
    WorktreeCache::new()
}

/// Mirror of [`WorktreeCache`] that tolerates `null` and negative fields.
#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    worktrees: Option<BTreeMap<String, WorktreeEntry>>,
    #[serde(default)]
    next_id: Option<i64>,
    #[serde(rename = "prs", default)]
    legacy_prs: Option<serde_json::Value>,
}

fn parse_current(value: serde_json::Value, cache_file: &Path) -> WorktreeCache {
    let raw: RawDocument = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!(
                "Discarding corrupted cache file '{}': {}",
                cache_file.display(),
                e
            );
            return WorktreeCache::new();
        }
    };

    if raw.legacy_prs.is_some() {
        log::debug!("Dropping legacy PR map from {}", cache_file.display());
    }

    let mut cache = WorktreeCache {
        worktrees: raw.worktrees.unwrap_or_default(),
        next_id: raw
            .next_id
            .and_then(|id| u64::try_from(id).ok())
            .unwrap_or(0),
        legacy_prs: None,
    };
    cache.normalize();

    log::debug!(
        "Loaded {} worktrees from cache (next_id = {})",
        cache.worktrees.len(),
        cache.next_id
    );
    cache
}

/// Atomically write the cache document into `dir`.
pub fn save(dir: &Path, cache: &WorktreeCache) -> Result<()> {
    if let Err(e) = fs::create_dir_all(dir) {
        log::error!("Failed to create cache directory '{}': {}", dir.display(), e);
        return Err(WorktreeKeeperError::cache_directory_creation_failed(dir, e));
    }

    let cache_file = cache_file_path(dir);
    let tmp_file = temp_file_path(&cache_file);

    let json = serde_json::to_string_pretty(cache).map_err(|e| {
        log::error!("Failed to serialize cache data: {e}");
        WorktreeKeeperError::cache_serialization_failed(e)
    })?;

    if let Err(e) = write_owner_only(&tmp_file, json.as_bytes()) {
        let _ = fs::remove_file(&tmp_file);
        log::error!("Failed to write cache file '{}': {}", tmp_file.display(), e);
        return Err(WorktreeKeeperError::cache_write_failed(&tmp_file, e));
    }

    if let Err(e) = fs::rename(&tmp_file, &cache_file) {
        let _ = fs::remove_file(&tmp_file);
        log::error!(
            "Failed to move cache file into place '{}': {}",
            cache_file.display(),
            e
        );
        return Err(WorktreeKeeperError::cache_write_failed(&cache_file, e));
    }

    log::debug!(
        "Saved {} worktrees to {}",
        cache.worktrees.len(),
        cache_file.display()
    );
    Ok(())
}

fn write_owner_only(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

/// Lock the cache directory, then load the document.
///
/// The returned [`FileLock`] must be kept alive until the matching [`save`] is done;
/// dropping it releases the lock on every exit path.
pub fn load_with_lock(dir: &Path) -> Result<(WorktreeCache, FileLock)> {
    let lock = FileLock::acquire(lock_file_path(dir))?;
    let cache = load(dir)?;
    Ok((cache, lock))
}
