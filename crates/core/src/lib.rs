//! sonar-history core - replay a repository's history through an analysis tool
//!
//! This crate provides the engine behind the `sonar-history` CLI:
//! - Revision listing and checkout via git2
//! - Analysis date smoothing into a strictly increasing sequence
//! - Revision selection by range, stride and allow-list, with properties
//!   files switching at trigger revisions
//! - A sequential driver that checks out, configures, runs and classifies
//!   each selected revision

pub mod config;
pub mod driver;
pub mod error;
pub mod git;
pub mod log;
pub mod plan;
pub mod revision;
pub mod select;
pub mod smooth;
pub mod tool;

pub use config::{
    parse_change_list, parse_stride, read_allow_list, ConfigOverride, ScanConfig, Settings,
};
pub use driver::{
    AnalysisDriver, DriverState, NoopObserver, Outcome, RevisionRecord, ScanObserver, ScanReport,
};
pub use error::{ConfigError, FailureKind, FatalScanError, RecoverableAnalysisError};
pub use git::GitRepository;
pub use log::AnalysisLog;
pub use plan::{ScanPlan, ScanTarget};
pub use revision::{Revision, RevisionSource};
pub use select::{select_revisions, SelectedRevision, Selection};
pub use smooth::{smooth_timestamps, DateSmoother, Smoothed};
pub use tool::{format_project_date, AnalysisRequest, AnalysisTool, SonarScanner, ToolOutput, ToolStatus};

/// sonar-history version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
