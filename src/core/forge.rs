//! Pull/merge request lookups against GitHub and GitLab.
//!
//! Both forges are reached through their official CLIs (`gh`, `glab`) run inside the
//! repository, so authentication is whatever the user already configured.

use crate::core::error::{Result, WorktreeKeeperError};
use crate::core::pr::{PrInfo, PrState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::process::{Command, Output};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForgeKind {
    GitHub,
    GitLab,
}

impl ForgeKind {
    /// Guess the forge from an origin URL.
    pub fn detect(origin_url: &str) -> Option<Self> {
        let origin = origin_url.to_ascii_lowercase();
        if origin.contains("github") {
            Some(Self::GitHub)
        } else if origin.contains("gitlab") {
            Some(Self::GitLab)
        } else {
            None
        }
    }
}

impl fmt::Display for ForgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHub => write!(f, "github"),
            Self::GitLab => write!(f, "gitlab"),
        }
    }
}

impl FromStr for ForgeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            other => Err(format!("unknown forge '{other}' (expected github or gitlab)")),
        }
    }
}

pub trait Forge {
    fn kind(&self) -> ForgeKind;
    /// `Ok(None)` when the forge has no PR for `branch`.
    fn fetch_pr_for_branch(&self, repo: &Path, branch: &str) -> Result<Option<PrInfo>>;
    fn fetch_branch_for_pr(&self, repo: &Path, number: u64) -> Result<Option<String>>;
}

pub fn forge_for(kind: ForgeKind) -> Box<dyn Forge> {
    match kind {
        ForgeKind::GitHub => Box::new(GitHub),
        ForgeKind::GitLab => Box::new(GitLab),
    }
}

/// An explicit choice wins over detection from the origin URL.
pub fn resolve_forge(explicit: Option<ForgeKind>, origin_url: &str) -> Result<Box<dyn Forge>> {
    explicit
        .or_else(|| ForgeKind::detect(origin_url))
        .map(forge_for)
        .ok_or_else(|| WorktreeKeeperError::UnsupportedForge {
            origin: origin_url.to_string(),
        })
}

fn run_tool(tool: &str, repo: &Path, args: &[&str]) -> Result<Output> {
    log::debug!("Running {tool} {} in {}", args.join(" "), repo.display());
    Command::new(tool)
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| WorktreeKeeperError::forge_command_failed(tool, format!("cannot run: {e}")))
}

fn looks_like_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("not found")
        || stderr.contains("no pull requests found")
        || stderr.contains("could not resolve")
}

fn stdout_or_none(tool: &str, output: Output) -> Result<Option<String>> {
    if output.status.success() {
        return Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()));
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if looks_like_not_found(&stderr) {
        return Ok(None);
    }
    Err(WorktreeKeeperError::forge_command_failed(tool, stderr.trim()))
}

pub struct GitHub;

const GH_PR_FIELDS: &str = "number,state,url,author,isDraft,comments,reviews,reviewDecision";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    state: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    author: Option<GhAuthor>,
    #[serde(default)]
    is_draft: bool,
    #[serde(default)]
    comments: Vec<serde_json::Value>,
    #[serde(default)]
    reviews: Vec<serde_json::Value>,
    #[serde(default)]
    review_decision: Option<String>,
}

#[derive(Deserialize)]
struct GhAuthor {
    #[serde(default)]
    login: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhHeadRef {
    head_ref_name: String,
}

/// Parse `gh pr list --json` output; the first PR wins.
pub fn parse_github_pr_list(json: &str, now: DateTime<Utc>) -> Result<Option<PrInfo>> {
    let prs: Vec<GhPullRequest> = serde_json::from_str(json)?;
    Ok(prs.into_iter().next().map(|pr| {
        let state = match pr.state.to_ascii_uppercase().as_str() {
            "MERGED" => PrState::Merged,
            "CLOSED" => PrState::Closed,
            _ if pr.is_draft => PrState::Draft,
            _ => PrState::Open,
        };
        PrInfo {
            number: pr.number,
            state,
            url: pr.url,
            author: pr.author.map(|a| a.login).unwrap_or_default(),
            comment_count: u32::try_from(pr.comments.len()).unwrap_or(u32::MAX),
            has_reviews: !pr.reviews.is_empty(),
            is_approved: pr.review_decision.as_deref() == Some("APPROVED"),
            cached_at: Some(now),
        }
    }))
}

impl Forge for GitHub {
    fn kind(&self) -> ForgeKind {
        ForgeKind::GitHub
    }

    fn fetch_pr_for_branch(&self, repo: &Path, branch: &str) -> Result<Option<PrInfo>> {
        let output = run_tool(
            "gh",
            repo,
            &[
                "pr", "list", "--head", branch, "--state", "all", "--limit", "1", "--json",
                GH_PR_FIELDS,
            ],
        )?;
        match stdout_or_none("gh", output)? {
            Some(json) => parse_github_pr_list(&json, Utc::now()),
            None => Ok(None),
        }
    }

    fn fetch_branch_for_pr(&self, repo: &Path, number: u64) -> Result<Option<String>> {
        let number = number.to_string();
        let output = run_tool("gh", repo, &["pr", "view", &number, "--json", "headRefName"])?;
        match stdout_or_none("gh", output)? {
            Some(json) => {
                let head: GhHeadRef = serde_json::from_str(&json)?;
                Ok(Some(head.head_ref_name))
            }
            None => Ok(None),
        }
    }
}

pub struct GitLab;

#[derive(Deserialize)]
struct GlMergeRequest {
    iid: u64,
    state: String,
    #[serde(default)]
    web_url: String,
    #[serde(default)]
    author: Option<GlAuthor>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    user_notes_count: u32,
    #[serde(default)]
    reviewers: Vec<serde_json::Value>,
    #[serde(default)]
    upvotes: u32,
}

#[derive(Deserialize)]
struct GlAuthor {
    #[serde(default)]
    username: String,
}

#[derive(Deserialize)]
struct GlSourceBranch {
    source_branch: String,
}

/// Parse `glab mr list -F json` output; the first MR wins.
pub fn parse_gitlab_mr_list(json: &str, now: DateTime<Utc>) -> Result<Option<PrInfo>> {
    let mrs: Vec<GlMergeRequest> = serde_json::from_str(json)?;
    Ok(mrs.into_iter().next().map(|mr| {
        let state = match mr.state.as_str() {
            "merged" => PrState::Merged,
            "closed" | "locked" => PrState::Closed,
            _ if mr.draft => PrState::Draft,
            _ => PrState::Open,
        };
        PrInfo {
            number: mr.iid,
            state,
            url: mr.web_url,
            author: mr.author.map(|a| a.username).unwrap_or_default(),
            comment_count: mr.user_notes_count,
            has_reviews: !mr.reviewers.is_empty(),
            is_approved: mr.upvotes > 0,
            cached_at: Some(now),
        }
    }))
}

impl Forge for GitLab {
    fn kind(&self) -> ForgeKind {
        ForgeKind::GitLab
    }

    fn fetch_pr_for_branch(&self, repo: &Path, branch: &str) -> Result<Option<PrInfo>> {
        let output = run_tool(
            "glab",
            repo,
            &["mr", "list", "--source-branch", branch, "--all", "-F", "json"],
        )?;
        match stdout_or_none("glab", output)? {
            Some(json) => parse_gitlab_mr_list(&json, Utc::now()),
            None => Ok(None),
        }
    }

    fn fetch_branch_for_pr(&self, repo: &Path, number: u64) -> Result<Option<String>> {
        let number = number.to_string();
        let output = run_tool("glab", repo, &["mr", "view", &number, "-F", "json"])?;
        match stdout_or_none("glab", output)? {
            Some(json) => {
                let mr: GlSourceBranch = serde_json::from_str(&json)?;
                Ok(Some(mr.source_branch))
            }
            None => Ok(None),
        }
    }
}
