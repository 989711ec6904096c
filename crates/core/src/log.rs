//! Append-only analysis log
//!
//! Every analysed revision gets a header, the tool's combined output and a
//! result line. The file is opened in append mode and never truncated, so
//! several runs over the same history accumulate in one place.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::driver::{Outcome, RevisionRecord, ScanObserver};
use crate::error::FatalScanError;
use crate::tool::format_project_date;

pub struct AnalysisLog {
    path: PathBuf,
    file: File,
}

impl AnalysisLog {
    /// Open (or create) the log for appending
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create log dir {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append_record(&mut self, record: &RevisionRecord) -> Result<()> {
        let result = match record.outcome {
            Outcome::Success => "SUCCESS".to_string(),
            Outcome::Failure(kind) => format!("FAILURE ({})", kind),
        };

        writeln!(
            self.file,
            "==== {} {} [{}] ====",
            record.id,
            format_project_date(&record.timestamp),
            record.config_file.display()
        )?;
        self.file.write_all(record.output.as_bytes())?;
        if !record.output.is_empty() && !record.output.ends_with('\n') {
            writeln!(self.file)?;
        }
        writeln!(
            self.file,
            "==== {} {} in {:.1}s ====",
            record.id, result, record.duration_secs
        )?;
        self.file.flush()?;
        Ok(())
    }

    pub fn append_abort(&mut self, error: &FatalScanError) -> Result<()> {
        writeln!(self.file, "==== ABORTED: {} ====", error)?;
        self.file.flush()?;
        Ok(())
    }
}

impl ScanObserver for AnalysisLog {
    fn on_record(&mut self, record: &RevisionRecord) -> Result<()> {
        self.append_record(record)
            .with_context(|| format!("write log {}", self.path.display()))
    }

    fn on_abort(&mut self, error: &FatalScanError) -> Result<()> {
        self.append_abort(error)
            .with_context(|| format!("write log {}", self.path.display()))
    }
}
