use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What the repair pass should do about an [`Issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixAction {
    MarkRemoved,
    UpdatePath,
    UpdateMetadata,
    ReassignId,
    Repair,
    Prune,
    AddToCache,
    RepairAndAdd,
    /// Reported only; user data is never deleted automatically.
    RemoveOrphanDir,
}

impl FixAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarkRemoved => "mark_removed",
            Self::UpdatePath => "update_path",
            Self::UpdateMetadata => "update_metadata",
            Self::ReassignId => "reassign_id",
            Self::Repair => "repair",
            Self::Prune => "prune",
            Self::AddToCache => "add_to_cache",
            Self::RepairAndAdd => "repair_and_add",
            Self::RemoveOrphanDir => "remove_orphan_dir",
        }
    }
}

impl fmt::Display for FixAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Cache,
    Git,
    Orphan,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 3] = [Self::Cache, Self::Git, Self::Orphan];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Cache => "Cache integrity",
            Self::Git => "Git links",
            Self::Orphan => "Orphans",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cache => "cache",
            Self::Git => "git",
            Self::Orphan => "orphan",
        };
        f.write_str(name)
    }
}

impl FromStr for IssueCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache" => Ok(Self::Cache),
            "git" => Ok(Self::Git),
            "orphan" => Ok(Self::Orphan),
            other => Err(format!(
                "unknown category '{other}' (expected cache, git or orphan)"
            )),
        }
    }
}

/// A checker's observation, before the orchestrator assigns it a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub key: String,
    pub description: String,
    pub fix: FixAction,
    pub repo_path: Option<PathBuf>,
}

impl Finding {
    pub fn new(key: impl Into<String>, description: impl Into<String>, fix: FixAction) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            fix,
            repo_path: None,
        }
    }

    pub fn with_repo(mut self, repo_path: impl Into<PathBuf>) -> Self {
        self.repo_path = Some(repo_path.into());
        self
    }

    pub fn into_issue(self, category: IssueCategory) -> Issue {
        Issue {
            key: self.key,
            description: self.description,
            fix: self.fix,
            category,
            repo_path: self.repo_path,
        }
    }
}

/// One divergence between the cache, the filesystem and git.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Cache key, or directory / worktree-record name for things not in the cache.
    pub key: String,
    pub description: String,
    pub fix: FixAction,
    pub category: IssueCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<PathBuf>,
}
