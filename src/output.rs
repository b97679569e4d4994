use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::responses::IssueSummary;

/// Global output format setting
static OUTPUT_JSON: AtomicBool = AtomicBool::new(false);

pub fn set_json_output(json: bool) {
    OUTPUT_JSON.store(json, Ordering::Relaxed);
}

pub fn is_json_output() -> bool {
    OUTPUT_JSON.load(Ordering::Relaxed)
}

/// Print a table or JSON depending on output mode
pub fn print_table<T, R, F>(items: &[T], to_row: F)
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if is_json_output() {
        print_json(items);
    } else {
        let rows: Vec<R> = items.iter().map(to_row).collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Print a message (or a `{"message": ...}` object in JSON mode)
pub fn print_message(message: &str) {
    if is_json_output() {
        println!("{}", serde_json::json!({ "message": message }));
    } else {
        println!("{message}");
    }
}

/// Status colored by its usual workflow meaning
pub fn status_colored(status: &str) -> String {
    let lower = status.to_lowercase();
    if lower.contains("resolved") || lower.contains("closed") || lower.contains("done") {
        status.green().to_string()
    } else if lower.contains("progress") {
        status.blue().to_string()
    } else if lower.contains("review") {
        status.magenta().to_string()
    } else if lower.contains("blocked") {
        status.red().to_string()
    } else {
        status.to_string()
    }
}

pub fn priority_colored(priority: &str) -> String {
    match priority.to_lowercase().as_str() {
        "blocker" | "critical" => priority.red().bold().to_string(),
        "major" | "high" => priority.yellow().bold().to_string(),
        "minor" | "low" | "trivial" => priority.bright_black().to_string(),
        _ => priority.to_string(),
    }
}

/// Format a Jira timestamp (`2024-01-15T10:30:00.000+0000`) in local time
pub fn format_date(timestamp: &str) -> String {
    use chrono::{DateTime, Local};

    match DateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f%z") {
        Ok(dt) => dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => timestamp.split('T').next().unwrap_or(timestamp).to_string(),
    }
}

/// Truncate a string with ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

pub fn print_issue(issue: &IssueSummary, url: &str) {
    let fields = &issue.fields;
    println!(
        "{} {}",
        issue.key.bold(),
        fields.summary.as_deref().unwrap_or_default()
    );
    println!("{}", url.dimmed());
    println!();

    let named = |r: &Option<crate::responses::NamedRef>| r.as_ref().map(|r| r.name.clone());
    if let Some(issue_type) = named(&fields.issuetype) {
        println!("{:>10}: {issue_type}", "Type");
    }
    if let Some(status) = named(&fields.status) {
        println!("{:>10}: {}", "Status", status_colored(&status));
    }
    if let Some(priority) = named(&fields.priority) {
        println!("{:>10}: {}", "Priority", priority_colored(&priority));
    }
    let assignee = fields
        .assignee
        .as_ref()
        .and_then(|a| a.display_name.clone().or_else(|| a.name.clone()))
        .unwrap_or_else(|| "Unassigned".to_string());
    println!("{:>10}: {assignee}", "Assignee");
    if let Some(created) = &fields.created {
        println!("{:>10}: {}", "Created", format_date(created));
    }
    if let Some(updated) = &fields.updated {
        println!("{:>10}: {}", "Updated", format_date(updated));
    }

    if !fields.issuelinks.is_empty() {
        println!();
        println!("{}", "Links:".bold());
        for link in &fields.issuelinks {
            let (direction, other) = match (&link.outward_issue, &link.inward_issue) {
                (Some(to), _) => ("->", to.key.as_str()),
                (None, Some(from)) => ("<-", from.key.as_str()),
                (None, None) => continue,
            };
            println!("  {direction} {} {other}", link.link_type.name);
        }
    }

    if let Some(description) = fields.description.as_deref().filter(|d| !d.is_empty()) {
        println!();
        println!("{description}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a rather long summary", 10), "a rathe...");
    }

    #[test]
    fn test_format_date_falls_back_to_date_part() {
        assert_eq!(format_date("2024-01-15Tgarbage"), "2024-01-15");
        assert_eq!(format_date("2024-01-15T10:30:00.000+0000").len(), "2024-01-15 10:30".len());
    }
}
