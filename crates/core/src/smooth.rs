//! Analysis date smoothing
//!
//! SonarQube refuses analyses whose dates go backwards, so commit timestamps
//! must be turned into a strictly increasing sequence before they can be used
//! as `sonar.projectDate`. Raw values are trusted while they advance by no more
//! than a drift window; anything else is treated as corrupt and replaced by the
//! previous corrected value plus one second. The window starts at one day and
//! widens a day at a time until the true final timestamp survives.

use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;

/// Upper bound on drift-window widenings, roughly 270 years of history
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100_000;

/// Output of [`DateSmoother::smooth`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Smoothed {
    /// Strictly increasing timestamps, one per input timestamp
    pub timestamps: Vec<DateTime<FixedOffset>>,
    /// Drift window of the attempt that produced `timestamps`
    pub drift_window_days: u32,
    /// Whether the last corrected timestamp equals the last raw one
    pub end_preserved: bool,
}

/// Turns raw history timestamps into usable analysis dates
#[derive(Debug, Clone, Copy)]
pub struct DateSmoother {
    max_attempts: u32,
}

impl Default for DateSmoother {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl DateSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of drift windows tried; at least one attempt is always made
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Compute corrected timestamps for the whole sequence
    pub fn smooth(&self, raw: &[DateTime<FixedOffset>]) -> Smoothed {
        let (first, last) = match (raw.first(), raw.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Smoothed {
                    timestamps: Vec::new(),
                    drift_window_days: 0,
                    end_preserved: true,
                }
            }
        };

        // Beyond the span of the history a wider window cannot accept anything new
        // that would still let the last raw value through.
        let span_days = (last - first).num_days().max(0) as u64;
        let limit = (span_days + 1).min(u64::from(self.max_attempts)) as u32;

        let mut window_days = 1;
        loop {
            let timestamps = correct(raw, Duration::days(i64::from(window_days)));
            let end_preserved = timestamps.last() == Some(&last);

            // An end value at or before the start can never be reproduced.
            if end_preserved || last <= first || window_days >= limit {
                if !end_preserved {
                    tracing::debug!(
                        window_days,
                        "final timestamp could not be preserved, keeping last attempt"
                    );
                }
                tracing::debug!(window_days, count = raw.len(), "smoothed analysis dates");
                return Smoothed {
                    timestamps,
                    drift_window_days: window_days,
                    end_preserved,
                };
            }

            window_days += 1;
        }
    }
}

/// Smooth with default settings, returning only the timestamps
pub fn smooth_timestamps(raw: &[DateTime<FixedOffset>]) -> Vec<DateTime<FixedOffset>> {
    DateSmoother::default().smooth(raw).timestamps
}

/// One pass over the sequence with a fixed drift window
fn correct(raw: &[DateTime<FixedOffset>], window: Duration) -> Vec<DateTime<FixedOffset>> {
    let mut corrected: Vec<DateTime<FixedOffset>> = Vec::with_capacity(raw.len());

    for &ts in raw {
        let next = match corrected.last() {
            None => ts,
            Some(&prev) if ts > prev && ts - prev <= window => ts,
            Some(&prev) => prev + Duration::seconds(1),
        };
        corrected.push(next);
    }

    corrected
}
