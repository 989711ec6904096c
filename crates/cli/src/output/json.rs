//! JSON output formatting

use serde::Serialize;
use sonar_history_core::{RevisionRecord, ScanPlan, ScanReport};

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub version: &'a str,
    pub repository: String,
    pub summary: JsonSummary,
    pub revisions: &'a [RevisionRecord],
}

#[derive(Debug, Serialize)]
pub struct JsonSummary {
    pub history: usize,
    pub planned: usize,
    pub analysed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub drift_window_days: u32,
    pub aborted: Option<String>,
}

pub fn build_report<'a>(
    repository: &std::path::Path,
    plan: &ScanPlan,
    report: &'a ScanReport,
) -> JsonReport<'a> {
    JsonReport {
        version: sonar_history_core::VERSION,
        repository: repository.display().to_string(),
        summary: JsonSummary {
            history: plan.history_len,
            planned: report.planned,
            analysed: report.records.len(),
            succeeded: report.succeeded(),
            failed: report.failed(),
            drift_window_days: plan.drift_window_days,
            aborted: report.aborted.as_ref().map(|e| e.to_string()),
        },
        revisions: &report.records,
    }
}

pub fn print_report(repository: &std::path::Path, plan: &ScanPlan, report: &ScanReport) {
    match serde_json::to_string_pretty(&build_report(repository, plan, report)) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize JSON: {}", e),
    }
}

pub fn print_plan(plan: &ScanPlan) {
    match serde_json::to_string_pretty(plan) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize JSON: {}", e),
    }
}
