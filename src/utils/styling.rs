//! Terminal styling utilities for the tiering report

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

use crate::pipeline::Warning;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static SEED: Emoji<'_, '_> = Emoji("🎲 ", "");
pub static DOCS: Emoji<'_, '_> = Emoji("📄 ", "");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!! ");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
        _            _   _
     __| | ___   ___| |_(_) ___ _ __
    / _` |/ _ \ / __| __| |/ _ \ '__|
   | (_| | (_) | (__| |_| |  __/ |
    \__,_|\___/ \___|\__|_|\___|_|
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Document completeness tiers via GMM and K-Means").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Settings shown in the configuration card.
pub struct ConfigCard<'a> {
    pub input: &'a Path,
    pub output_dir: Option<&'a Path>,
    pub algorithm: &'a str,
    pub seed: u64,
    pub n_documents: usize,
    pub n_init: usize,
    pub constant_policy: &'a str,
}

/// Print configuration card
pub fn print_config(card: &ConfigCard<'_>) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);
    let output = card
        .output_dir
        .map(|p| truncate_path(p, 38))
        .unwrap_or_else(|| "(export disabled)".to_string());

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Input:  {:<39}│",
        FOLDER,
        truncate_path(card.input, 38)
    );
    println!("    │  {} Output: {:<39}│", SAVE, output);
    println!("    ├{}┤", line);
    println!(
        "    │  {} Algorithm:          {:<27}│",
        CHART,
        style(card.algorithm).yellow()
    );
    println!(
        "    │  {} Seed / restarts:    {:<27}│",
        SEED,
        style(format!("{} / {}", card.seed, card.n_init)).yellow()
    );
    println!(
        "    │  {} Documents:          {:<27}│",
        DOCS,
        style(format!(
            "{} (constant: {})",
            card.n_documents, card.constant_policy
        ))
        .yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a degenerate-data warning to stderr
pub fn print_warning(warning: &Warning) {
    eprintln!(
        "    {}{} {}",
        WARN,
        style("Warning:").yellow().bold(),
        style(warning).yellow()
    );
}

/// Print the elapsed time of a step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("Tiering complete!").green().bold()
    );
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(info) = detail {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!("      Found {} {}", style(count).yellow().bold(), description);
    }
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_tail() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("abcdefghijkl", 8), "...hijkl");
    }
}
