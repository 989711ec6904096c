//! Error taxonomy for a history scan
//!
//! Each kind maps to one policy: [`ConfigError`] stops before any scan work,
//! [`FatalScanError`] aborts the remaining history, and
//! [`RecoverableAnalysisError`] is recorded while scanning moves on.

use chrono::{DateTime, FixedOffset};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Malformed scan input, detected before anything is checked out
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("--change: each changed properties file should correspond to a revision ({files} files, {revisions} revisions)")]
    MismatchedChangeList { files: usize, revisions: usize },

    #[error("--change: properties filename for revision `{revision}` should not be empty")]
    EmptyOverrideFile { revision: String },

    #[error("--every: analyse every revision should be a number greater or equal to 1 (got {0})")]
    InvalidStride(i64),

    #[error("failed to read revision file {path}: {source}")]
    AllowList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read settings file {path}: {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure that leaves the working tree in a state no later step can trust
#[derive(Error, Debug)]
pub enum FatalScanError {
    #[error("failed to check out revision {revision}: {reason}")]
    Checkout { revision: String, reason: String },

    #[error("failed to stage {file} for revision {revision}: {source}")]
    Configure {
        revision: String,
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch analysis tool for revision {revision}: {source}")]
    Launch {
        revision: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scan interrupted; working tree left at revision {revision}")]
    Interrupted { revision: String },
}

impl FatalScanError {
    /// Revision the driver was working on when it gave up
    pub fn revision(&self) -> &str {
        match self {
            FatalScanError::Checkout { revision, .. }
            | FatalScanError::Configure { revision, .. }
            | FatalScanError::Launch { revision, .. }
            | FatalScanError::Interrupted { revision } => revision,
        }
    }
}

/// Why a single analysis did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The tool exited with a nonzero code
    ExitCode(i32),
    /// The tool was terminated by a signal and reported no exit code
    Terminated,
    /// The tool ran past the configured timeout and was killed
    TimedOut(Duration),
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::ExitCode(code) => write!(f, "exit code {}", code),
            FailureKind::Terminated => write!(f, "terminated by signal"),
            FailureKind::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
        }
    }
}

/// A failed analysis of one revision; the scan continues past it
#[derive(Error, Debug, Clone)]
#[error("analysis of {revision} at {timestamp} failed: {kind}")]
pub struct RecoverableAnalysisError {
    pub revision: String,
    pub timestamp: DateTime<FixedOffset>,
    pub kind: FailureKind,
}
