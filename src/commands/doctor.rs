use crate::commands::context::CommandContext;
use crate::core::{
    cache::{self, WorktreeCache},
    doctor::{
        run_diagnostics, DiagnosticContext, DiagnosticReport, IssueCategory, RepairExecutor,
        RepairSummary,
    },
    error::Result,
    print_info, print_section_header, print_success, print_warning,
};
use colored::*;

/// Diagnose the cache, and with `fix` repair what was found.
///
/// Without `fix` nothing is locked or written.
pub fn execute_doctor(ctx: &CommandContext, fix: bool, categories: &[IssueCategory]) -> Result<()> {
    let root = ctx.root();

    if !fix {
        let cache = cache::load(root)?;
        let report = diagnose(ctx, &cache, categories);
        print_report(&report);
        if !report.is_empty() {
            print_info(&format!(
                "{} issue(s) found. Run with --fix to repair.",
                report.len()
            ));
        }
        return Ok(());
    }

    let (mut cache, lock) = cache::load_with_lock(root)?;
    let report = diagnose(ctx, &cache, categories);
    print_report(&report);
    if report.is_empty() {
        lock.release()?;
        return Ok(());
    }

    let summary = RepairExecutor::new(&ctx.git, root).run(&mut cache, &report.issues)?;
    lock.release()?;
    print_summary(&summary);
    Ok(())
}

fn diagnose(
    ctx: &CommandContext,
    cache: &WorktreeCache,
    categories: &[IssueCategory],
) -> DiagnosticReport {
    let search_dirs = ctx.config.repo_search_dirs();
    let diagnostic_ctx = DiagnosticContext {
        cache,
        scan_root: ctx.root(),
        repo_search_dirs: &search_dirs,
        git: &ctx.git,
    };
    run_diagnostics(&diagnostic_ctx, categories)
}

fn print_report(report: &DiagnosticReport) {
    if report.is_empty() {
        print_success("No issues found");
        return;
    }

    for (category, issues) in report.by_category() {
        print_section_header(category.title());
        for issue in issues {
            println!(
                "  {} {}  {}",
                "•".yellow(),
                issue.key.white(),
                issue.description
            );
            println!("    {}", format!("fix: {}", issue.fix).bright_black());
        }
    }
    println!();
}

fn print_summary(summary: &RepairSummary) {
    for failure in &summary.failures {
        print_warning(&format!("{} ({}): {}", failure.key, failure.fix, failure.reason));
    }
    print_success(&format!(
        "Fixed {} issue(s), {} failed",
        summary.fixed, summary.failed
    ));
}
