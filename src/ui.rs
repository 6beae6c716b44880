//! Terminal message helpers

use colored::Colorize;

/// Width of the key column in [`kv`]
const KEY_WIDTH: usize = 12;

pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a muted, indented line
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a title underlined to its width
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print an aligned key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {} {}", format!("{key:<KEY_WIDTH$}").dimmed(), value);
}

/// `n` followed by `noun`, pluralized with a trailing `s`
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}
