//! Per-revision orchestration
//!
//! The driver is a small state machine:
//!
//! ```text
//! Scanning -> Checkout -> Configure -> Invoke -> Classify -> Scanning
//!     |          |           |           |
//!     v          +-----------+-----------+--> Aborted
//!    Done
//! ```
//!
//! Checkout, Configure and a failed launch abort the run because every later
//! step depends on a clean working tree at the right revision. A tool that runs
//! and fails only marks its own revision as failed.

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{FailureKind, FatalScanError, RecoverableAnalysisError};
use crate::plan::{ScanPlan, ScanTarget};
use crate::revision::RevisionSource;
use crate::tool::{AnalysisRequest, AnalysisTool, ToolOutput};

/// Where the driver is for the current revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Scanning,
    Checkout,
    Configure,
    Invoke,
    Classify,
    Done,
    Aborted,
}

/// Classification of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(FailureKind),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl Serialize for Outcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outcome::Success => serializer.serialize_str("success"),
            Outcome::Failure(kind) => serializer.serialize_str(&format!("failure: {}", kind)),
        }
    }
}

/// What happened to one revision
#[derive(Debug, Clone, Serialize)]
pub struct RevisionRecord {
    pub id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub config_file: PathBuf,
    pub outcome: Outcome,
    pub duration_secs: f64,
    #[serde(skip)]
    pub output: String,
}

impl RevisionRecord {
    /// The recoverable error for a failed record, `None` on success
    pub fn error(&self) -> Option<RecoverableAnalysisError> {
        match self.outcome {
            Outcome::Success => None,
            Outcome::Failure(kind) => Some(RecoverableAnalysisError {
                revision: self.id.clone(),
                timestamp: self.timestamp,
                kind,
            }),
        }
    }
}

/// Final state of a run and everything recorded on the way
#[derive(Debug)]
pub struct ScanReport {
    pub records: Vec<RevisionRecord>,
    /// `None` when every target was processed
    pub aborted: Option<FatalScanError>,
    pub planned: usize,
}

impl ScanReport {
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.succeeded()
    }

    pub fn state(&self) -> DriverState {
        if self.aborted.is_some() {
            DriverState::Aborted
        } else {
            DriverState::Done
        }
    }
}

/// Hooks for progress display and logging
///
/// Errors returned from a hook end the run and propagate to the caller.
pub trait ScanObserver {
    fn on_state(&mut self, _target: &ScanTarget, _state: DriverState) -> Result<()> {
        Ok(())
    }

    fn on_record(&mut self, _record: &RevisionRecord) -> Result<()> {
        Ok(())
    }

    fn on_abort(&mut self, _error: &FatalScanError) -> Result<()> {
        Ok(())
    }
}

/// Observer that ignores everything
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Sequentially analyses every target of a [`ScanPlan`]
pub struct AnalysisDriver<'a, S: RevisionSource, T: AnalysisTool> {
    source: &'a S,
    tool: &'a T,
    stop: Arc<AtomicBool>,
}

impl<'a, S: RevisionSource, T: AnalysisTool> AnalysisDriver<'a, S, T> {
    pub fn new(source: &'a S, tool: &'a T) -> Self {
        Self {
            source,
            tool,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked before each revision and between its steps
    ///
    /// Setting it lets the running step finish, then aborts with `Interrupted`.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run the whole plan
    ///
    /// Fatal scan errors end up in [`ScanReport::aborted`] alongside the records
    /// produced so far; only observer failures are returned as `Err`.
    pub fn run(&self, plan: &ScanPlan, observer: &mut dyn ScanObserver) -> Result<ScanReport> {
        let mut records = Vec::with_capacity(plan.targets.len());
        let mut checked_out: Option<&str> = None;

        for target in &plan.targets {
            if self.stop.load(Ordering::SeqCst) {
                let error = FatalScanError::Interrupted {
                    revision: checked_out.unwrap_or("(none)").to_string(),
                };
                return self.abort(records, plan, error, observer);
            }

            observer.on_state(target, DriverState::Scanning)?;
            match self.process(target, observer)? {
                Ok(record) => {
                    checked_out = Some(target.id.as_str());
                    if let Some(err) = record.error() {
                        tracing::warn!(%err, "analysis failed, continuing");
                    }
                    observer.on_record(&record)?;
                    records.push(record);
                }
                Err(error) => return self.abort(records, plan, error, observer),
            }
        }

        tracing::info!(
            analysed = records.len(),
            failed = records.iter().filter(|r| !r.outcome.is_success()).count(),
            "history scan finished"
        );

        Ok(ScanReport {
            records,
            aborted: None,
            planned: plan.targets.len(),
        })
    }

    /// Checkout, Configure, Invoke and Classify one target
    fn process(
        &self,
        target: &ScanTarget,
        observer: &mut dyn ScanObserver,
    ) -> Result<Result<RevisionRecord, FatalScanError>> {
        let start = Instant::now();

        observer.on_state(target, DriverState::Checkout)?;
        tracing::debug!(revision = %target.id, "checkout");
        if let Err(e) = self.source.checkout(&target.id) {
            return Ok(Err(FatalScanError::Checkout {
                revision: target.id.clone(),
                reason: format!("{:#}", e),
            }));
        }

        if let Some(error) = self.interrupted(target) {
            return Ok(Err(error));
        }

        observer.on_state(target, DriverState::Configure)?;
        let staged = match stage_config(&target.config_file, self.source.work_tree()) {
            Ok(path) => path,
            Err(source) => {
                return Ok(Err(FatalScanError::Configure {
                    revision: target.id.clone(),
                    file: target.config_file.clone(),
                    source,
                }))
            }
        };

        if let Some(error) = self.interrupted(target) {
            return Ok(Err(error));
        }

        observer.on_state(target, DriverState::Invoke)?;
        tracing::debug!(revision = %target.id, timestamp = %target.timestamp, "invoke");
        let request = AnalysisRequest {
            work_tree: self.source.work_tree(),
            config_file: &staged,
            timestamp: target.timestamp,
        };
        let output = match self.tool.analyze(&request) {
            Ok(output) => output,
            Err(source) => {
                return Ok(Err(FatalScanError::Launch {
                    revision: target.id.clone(),
                    source,
                }))
            }
        };

        observer.on_state(target, DriverState::Classify)?;
        Ok(Ok(classify(target, output, start.elapsed())))
    }

    /// `Interrupted` at `target` when a stop was requested during the last step
    fn interrupted(&self, target: &ScanTarget) -> Option<FatalScanError> {
        self.stop
            .load(Ordering::SeqCst)
            .then(|| FatalScanError::Interrupted {
                revision: target.id.clone(),
            })
    }

    fn abort(
        &self,
        records: Vec<RevisionRecord>,
        plan: &ScanPlan,
        error: FatalScanError,
        observer: &mut dyn ScanObserver,
    ) -> Result<ScanReport> {
        tracing::warn!(%error, "history scan aborted");
        observer.on_abort(&error)?;
        Ok(ScanReport {
            records,
            aborted: Some(error),
            planned: plan.targets.len(),
        })
    }
}

fn classify(target: &ScanTarget, output: ToolOutput, elapsed: Duration) -> RevisionRecord {
    let outcome = match output.status.failure() {
        None => Outcome::Success,
        Some(kind) => Outcome::Failure(kind),
    };

    RevisionRecord {
        id: target.id.clone(),
        timestamp: target.timestamp,
        config_file: target.config_file.clone(),
        outcome,
        duration_secs: elapsed.as_secs_f64(),
        output: output.output,
    }
}

/// Copy a properties file into the root of the working tree
///
/// Returns the staged path. A file that already is that path is left alone.
pub fn stage_config(config_file: &Path, work_tree: &Path) -> std::io::Result<PathBuf> {
    let name = config_file.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", config_file.display()),
        )
    })?;
    let dest = work_tree.join(name);

    let same_file = match (std::fs::canonicalize(config_file), std::fs::canonicalize(&dest)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !same_file {
        std::fs::copy(config_file, &dest)?;
    }

    Ok(dest)
}
