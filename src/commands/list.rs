use crate::commands::context::CommandContext;
use crate::core::{
    cache::{self, WorktreeEntry},
    error::Result,
    git::GitOps,
    print_info, print_section_header,
};
use colored::*;

pub fn execute_list(ctx: &CommandContext, all: bool) -> Result<()> {
    let root = ctx.root();
    let (mut cache, lock) = cache::load_with_lock(root)?;
    let live = ctx.git.list_worktrees(root)?;
    cache.sync_worktrees(&live);
    cache::save(root, &cache)?;
    lock.release()?;

    let mut rows: Vec<(&String, &WorktreeEntry)> = cache
        .worktrees
        .iter()
        .filter(|(_, entry)| all || !entry.is_removed())
        .collect();
    rows.sort_by_key(|(_, entry)| entry.id);

    if rows.is_empty() {
        print_info(&format!("No worktrees under {}", root.display()));
        return Ok(());
    }

    print_section_header("Worktrees");
    for (key, entry) in rows {
        println!("{}", format_row(key, entry));
    }
    println!();
    Ok(())
}

fn format_row(key: &str, entry: &WorktreeEntry) -> String {
    let id = format!("[{}]", entry.id);
    if entry.is_removed() {
        return format!("{} {}  {}", id.bright_black(), key.bright_black(), "removed".red());
    }

    let pr = match &entry.pr {
        Some(pr) if pr.exists() => format!("  (#{} {})", pr.number, pr.state),
        Some(_) => "  (no PR)".to_string(),
        None => String::new(),
    };
    format!(
        "{} {}  {}{}",
        id.blue(),
        key.white(),
        entry.branch.green(),
        pr.bright_black()
    )
}
