//! Common assertion helpers for command output

#![allow(dead_code)]

use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;

pub fn has_row(id: u64, key: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("[{id}] {key}"))
}

pub fn no_issues() -> impl Predicate<str> {
    predicates::str::contains("No issues found")
}

pub fn fixed(fixed: usize, failed: usize) -> impl Predicate<str> {
    predicates::str::contains(format!("Fixed {fixed} issue(s), {failed} failed"))
}

/// Parse the cache file written by the binary.
pub fn read_cache(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
