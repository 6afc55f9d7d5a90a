// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Terminal color utilities
//!
//! Provides consistent status markers across the CLI.

use colored::{ColoredString, Colorize};

fn marked(mark: ColoredString, msg: &str) -> String {
    format!("  {} {}", mark, msg)
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("{}", marked("✓".green(), msg));
}

/// Print an error cross
pub fn print_error(msg: &str) {
    println!("{}", marked("✗".red(), msg));
}

/// Print a warning
pub fn print_warning(msg: &str) {
    println!("{}", marked("⚠".yellow(), msg));
}

/// Print an info item
pub fn print_info(msg: &str) {
    println!("{}", marked("→".blue(), msg));
}

/// Print an error cross to stderr
pub fn eprint_error(msg: &str) {
    eprintln!("{}", marked("✗".red(), msg));
}

/// Print a warning to stderr
pub fn eprint_warning(msg: &str) {
    eprintln!("{}", marked("⚠".yellow(), msg));
}
