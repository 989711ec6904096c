//! Terminal output formatting

use colored::Colorize;
use sonar_history_core::{format_project_date, Outcome, RevisionRecord, ScanPlan, ScanReport};
use std::time::Instant;

/// Abbreviated revision id for tables
pub fn short_id(id: &str) -> &str {
    id.get(..10).unwrap_or(id)
}

pub fn format_record(record: &RevisionRecord) -> String {
    let (icon, result) = match record.outcome {
        Outcome::Success => ("✓".green(), "ok".green()),
        Outcome::Failure(kind) => ("✗".red(), kind.to_string().red()),
    };

    format!(
        "  {} {:<10} {:<24} {:<24} {} ({:.1}s)",
        icon,
        short_id(&record.id),
        format_project_date(&record.timestamp),
        record.config_file.display(),
        result,
        record.duration_secs
    )
}

pub fn print_plan(plan: &ScanPlan) {
    println!();
    println!(
        "  {}",
        format!(
            "{:<10} {:<24} {:<24} {}",
            "Revision", "Analysis date", "Commit date", "Properties"
        )
        .bold()
    );
    println!("  {}", "\u{2500}".repeat(72).dimmed());

    for target in &plan.targets {
        let commit_date = format_project_date(&target.raw_timestamp);
        let commit_date = if target.raw_timestamp == target.timestamp {
            commit_date.normal()
        } else {
            commit_date.yellow()
        };
        println!(
            "  {:<10} {:<24} {:<24} {}",
            short_id(&target.id),
            format_project_date(&target.timestamp),
            commit_date,
            target.config_file.display()
        );
    }

    println!();
    println!(
        "  {} of {} revisions selected \u{00b7} {} dates corrected \u{00b7} drift window {} day(s)",
        plan.targets.len(),
        plan.history_len,
        plan.corrected_count(),
        plan.drift_window_days
    );
}

pub fn print_report(report: &ScanReport, start: Instant) {
    println!();

    for record in &report.records {
        println!("{}", format_record(record));
    }

    if !report.records.is_empty() {
        println!();
    }

    println!("  {}", "\u{2500}".repeat(60).dimmed());
    println!(
        "  {} \u{00b7} {} \u{00b7} {}",
        format!("{} succeeded", report.succeeded()).green(),
        format!("{} failed", report.failed()).red(),
        format!("{} of {} analysed", report.records.len(), report.planned).blue()
    );
    if let Some(err) = &report.aborted {
        println!("  {}: {}", "aborted".red().bold(), err);
    }
    println!("  Time: {:.1}s", start.elapsed().as_secs_f64());
}
