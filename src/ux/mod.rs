use chrono::{Local, TimeZone};
use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::errors::ForgeError;
use crate::normalize::export_surface;
use crate::session::Outcome;
use crate::wire::SavedPageRecord;

pub fn spinner(message: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} {elapsed:.dim}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn show_outcome(outcome: &Outcome) {
    let kind = if outcome.is_refinement() { "[REFINED]".yellow().bold() } else { "[GENERATED]".green().bold() };
    let normalized = outcome.result.normalized_source_text();
    let surface = export_surface(normalized);
    println!(
        "\n{}  {} ({})",
        kind,
        outcome.request.page_variant.label().bold(),
        outcome.request.style_preset.map(|p| p.label()).unwrap_or("no preset")
    );
    println!(
        "  raw: {}   normalized: {}   default export: {}",
        format_size(outcome.result.source_text().len(), DECIMAL),
        format_size(normalized.len(), DECIMAL),
        surface.default_exports.join(", ").cyan()
    );
}

/// Unified diff of the normalized source against the previous one.
pub fn render_diff(before: &str, after: &str) -> String {
    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();
    let diff = difflib::unified_diff(&old, &new, "previous/App.jsx", "current/App.jsx", "", "", 3);
    diff.iter()
        .map(|line| {
            let line = line.trim_end_matches('\n');
            if line.starts_with("+++") || line.starts_with("---") {
                line.bold().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_pages(pages: &[SavedPageRecord]) {
    if pages.is_empty() {
        println!("(no saved pages)");
        return;
    }
    for p in pages {
        let when = Local
            .timestamp_millis_opt(p.created_at_epoch_millis)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".into());
        println!(
            "{}  {}  {:<12}  {:>8}  {}",
            p.id.bold(),
            when.dimmed(),
            p.page_variant.label(),
            format_size(p.source_text.len(), DECIMAL),
            truncate(&p.instruction_text, 60)
        );
    }
}

pub fn print_error(err: &ForgeError) {
    eprintln!("{} {}", "error:".red().bold(), err);
    if let Some(fix) = err.remediation() {
        eprintln!("{} {}", "hint:".yellow().bold(), fix);
    }
}

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        let ans = s.trim().to_lowercase();
        ans == "y" || ans == "yes"
    } else {
        false
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{head}…")
}
