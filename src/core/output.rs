//! Colored terminal output shared by every subcommand.
//!
//! Errors are red, warnings yellow, success green. Paths and ids are never
//! colored so they stay easy to copy.

use colored::*;

/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    eprintln!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// ```text
/// ! <message>
/// ```
pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow(), message);
}

/// ```text
///
/// ✓ <message>
/// ```
pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

pub fn print_info(message: &str) {
    println!("{message}");
}

/// ```text
///
/// <header>:
///
/// ```
pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.bold());
}
