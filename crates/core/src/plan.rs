//! Scan plan - history snapshot, corrected dates and selection, computed once

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::{ConfigOverride, ScanConfig};
use crate::error::ConfigError;
use crate::revision::Revision;
use crate::select::select_revisions;
use crate::smooth::DateSmoother;

/// One revision the driver will analyse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanTarget {
    pub id: String,
    /// Commit timestamp as found in history
    pub raw_timestamp: DateTime<FixedOffset>,
    /// Analysis date handed to the tool
    pub timestamp: DateTime<FixedOffset>,
    pub config_file: PathBuf,
}

/// Everything the driver needs, fixed before the first checkout
#[derive(Debug, Clone, Serialize)]
pub struct ScanPlan {
    pub targets: Vec<ScanTarget>,
    pub history_len: usize,
    pub drift_window_days: u32,
    /// Whether smoothing kept the newest commit's real timestamp
    pub end_preserved: bool,
    pub since_missing: bool,
    pub until_missing: bool,
    pub unapplied_overrides: Vec<ConfigOverride>,
}

impl ScanPlan {
    /// Smooth the full history, then select from it
    ///
    /// Dates are corrected over the whole history rather than the selection so
    /// a revision keeps the same analysis date whatever stride or range is used.
    pub fn build(
        history: &[Revision],
        config: &ScanConfig,
        smoother: &DateSmoother,
    ) -> Result<Self, ConfigError> {
        let selection = select_revisions(history, config)?;

        let raw: Vec<DateTime<FixedOffset>> = history.iter().map(|r| r.timestamp).collect();
        let smoothed = smoother.smooth(&raw);

        let targets = selection
            .revisions
            .into_iter()
            .map(|sel| ScanTarget {
                raw_timestamp: raw[sel.index],
                timestamp: smoothed.timestamps[sel.index],
                id: sel.id,
                config_file: sel.config_file,
            })
            .collect();

        Ok(Self {
            targets,
            history_len: history.len(),
            drift_window_days: smoothed.drift_window_days,
            end_preserved: smoothed.end_preserved,
            since_missing: selection.since_missing,
            until_missing: selection.until_missing,
            unapplied_overrides: selection.unapplied,
        })
    }

    /// Number of targets whose analysis date differs from the commit date
    pub fn corrected_count(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.timestamp != t.raw_timestamp)
            .count()
    }
}
