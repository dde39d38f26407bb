use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use worktree_keeper::commands::*;
use worktree_keeper::core::{doctor::IssueCategory, error::Result, print_error};

#[derive(Parser)]
#[command(name = "worktree-keeper")]
#[command(about = "Stable ids, cached metadata and self-healing for git worktrees")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Worktrees root directory (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Directory searched first for repositories that moved (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    repo_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync and list worktrees with their ids
    List {
        /// Include removed worktrees
        #[arg(long)]
        all: bool,
    },
    /// Sync the cache with the worktrees on disk
    Sync,
    /// Print the path of a worktree by id
    Path {
        id: u64,
    },
    /// Show the pull/merge request of a worktree by id
    Pr {
        id: u64,
        /// Fetch from the forge even if the cached copy is fresh
        #[arg(long)]
        refresh: bool,
    },
    /// Check the cache against the filesystem and git
    Doctor {
        /// Repair the issues found
        #[arg(long)]
        fix: bool,
        /// Only run these checks (cache, git, orphan)
        #[arg(long = "category", value_name = "CATEGORY")]
        categories: Vec<IssueCategory>,
    },
    /// Forget all cached worktrees
    Reset,
}

fn run(cli: Cli) -> Result<()> {
    let ctx = CommandContext::new(cli.root, cli.repo_dir)?;
    match cli.command {
        Commands::List { all } => execute_list(&ctx, all),
        Commands::Sync => execute_sync(&ctx),
        Commands::Path { id } => execute_path(&ctx, id),
        Commands::Pr { id, refresh } => execute_pr(&ctx, id, refresh),
        Commands::Doctor { fix, categories } => execute_doctor(&ctx, fix, &categories),
        Commands::Reset => execute_reset(&ctx),
    }
}

fn main() {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    if cli.debug {
        env::set_var("RUST_LOG", "debug");
    } else if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if let Err(e) = run(cli) {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
