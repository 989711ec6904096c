//! External analysis tool invocation

use chrono::{DateTime, FixedOffset};
use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::FailureKind;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Inputs for analysing one checked-out revision
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    pub work_tree: &'a Path,
    /// Properties file already staged into the working tree
    pub config_file: &'a Path,
    pub timestamp: DateTime<FixedOffset>,
}

/// How the tool run ended, plus everything it printed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: ToolStatus,
    /// Interleaved stdout and stderr
    pub output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Exited(i32),
    Terminated,
    TimedOut(Duration),
}

impl ToolStatus {
    /// `None` on success, the failure kind otherwise
    pub fn failure(self) -> Option<FailureKind> {
        match self {
            ToolStatus::Exited(0) => None,
            ToolStatus::Exited(code) => Some(FailureKind::ExitCode(code)),
            ToolStatus::Terminated => Some(FailureKind::Terminated),
            ToolStatus::TimedOut(limit) => Some(FailureKind::TimedOut(limit)),
        }
    }
}

/// Something that can analyse the working tree at a given date
///
/// `Err` means the tool could not be started at all; a tool that ran and
/// failed reports that through [`ToolOutput::status`].
pub trait AnalysisTool {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> std::io::Result<ToolOutput>;
}

/// Format a date the way `sonar.projectDate` expects: `2020-01-02T03:04:05+0100`
pub fn format_project_date(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%z").to_string()
}

/// Runs `sonar-scanner` (or a compatible binary) in the working tree
#[derive(Debug, Clone)]
pub struct SonarScanner {
    binary: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl SonarScanner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Extra arguments placed before the per-revision properties
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Kill the tool and report a failure once `timeout` has elapsed
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments for one revision, after any configured extra arguments
    pub fn arguments(&self, request: &AnalysisRequest<'_>) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(format!(
            "-Dproject.settings={}",
            request.config_file.display()
        ));
        args.push(format!(
            "-Dsonar.projectDate={}",
            format_project_date(&request.timestamp)
        ));
        args
    }

    fn wait(&self, child: &mut Child) -> std::io::Result<ToolStatus> {
        let Some(limit) = self.timeout else {
            return child.wait().map(exit_status);
        };

        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(exit_status(status));
            }
            if Instant::now() >= deadline {
                tracing::warn!(pid = child.id(), "analysis timed out, killing");
                kill_process_group(child);
                child.wait()?;
                return Ok(ToolStatus::TimedOut(limit));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl AnalysisTool for SonarScanner {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> std::io::Result<ToolOutput> {
        let args = self.arguments(request);
        tracing::debug!(binary = %self.binary.display(), ?args, "launching analysis");

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .current_dir(request.work_tree)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout also stops whatever the tool started.
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn()?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let readers: Vec<JoinHandle<()>> = [
            child.stdout.take().map(|s| pump(s, Arc::clone(&buffer))),
            child.stderr.take().map(|s| pump(s, Arc::clone(&buffer))),
        ]
        .into_iter()
        .flatten()
        .collect();

        let status = match self.wait(&mut child) {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(pid = child.id(), "error waiting for analysis: {}", e);
                kill_process_group(&mut child);
                let _ = child.wait();
                return Err(e);
            }
        };
        // A process that left the killed group can still hold the pipes open.
        if !matches!(status, ToolStatus::TimedOut(_)) {
            for reader in readers {
                let _ = reader.join();
            }
        }

        let bytes = match Arc::try_unwrap(buffer) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(|e| e.into_inner()),
            Err(shared) => shared.lock().map(|b| b.clone()).unwrap_or_default(),
        };

        Ok(ToolOutput {
            status,
            output: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Kill the tool together with every process it started in its group
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    // The child may exit between try_wait and kill.
    let _ = child.kill();
}

/// Copy a pipe into the shared buffer until it closes
fn pump(mut pipe: impl Read + Send + 'static, sink: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    })
}

fn exit_status(status: ExitStatus) -> ToolStatus {
    match status.code() {
        Some(code) => ToolStatus::Exited(code),
        None => ToolStatus::Terminated,
    }
}
