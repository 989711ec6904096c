//! sonar-history CLI library - exposed for integration tests

pub mod commands;
pub mod output;
pub mod progress;

use clap::{ArgAction, Parser};
use sonar_history_core::{
    parse_change_list, parse_stride, read_allow_list, ConfigError, ScanConfig, Settings,
};
use std::path::PathBuf;

/// Exit status of a whole invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Every selected revision was analysed successfully (or the plan was printed)
    Clean = 0,
    /// The scan ran to the end but some analyses failed
    AnalysisFailures = 1,
    /// Bad input; nothing was scanned
    ConfigError = 2,
    /// The scan stopped before the last revision
    Aborted = 3,
}

impl ScanStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Parser, Debug)]
#[command(name = "sonar-history")]
#[command(about = "Analyse a project's git history revision by revision with sonar-scanner", long_about = None)]
#[command(version = sonar_history_core::VERSION)]
pub struct Cli {
    /// Path to the project's git repository (e.g. "C:\...\project1\.git")
    #[arg(short = 'g', long = "git", value_name = "PATH")]
    pub git: PathBuf,

    /// Analyse only revisions since this commit
    #[arg(short, long, value_name = "REVISION")]
    pub since: Option<String>,

    /// Analyse only revisions until this commit (included)
    #[arg(short, long, value_name = "REVISION")]
    pub until: Option<String>,

    /// Sonar scanner properties file [default: sonar.properties]
    #[arg(short, long, value_name = "FILE")]
    pub properties: Option<PathBuf>,

    /// Use different properties files from these revisions on
    /// (e.g. --change properties1,properties2 hash1,hash2)
    #[arg(
        short,
        long,
        num_args = 2,
        value_names = ["FILES", "REVISIONS"],
        action = ArgAction::Set
    )]
    pub change: Option<Vec<String>>,

    /// Scan only every N-th revision (e.g. --every 10)
    #[arg(short, long, value_name = "N", default_value_t = 1, allow_negative_numbers = true)]
    pub every: i64,

    /// Scan only revisions listed in this file, one hash per line
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Analysis binary [default: sonar-scanner]
    #[arg(long, value_name = "PATH")]
    pub scanner: Option<PathBuf>,

    /// Per-revision timeout in seconds (0 = no timeout)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Append scanner output to this file [default: sonar-history.log]
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Clone the repository into this directory and scan the copy
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Print the revisions and analysis dates that would be scanned, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Output format for the final report
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Settings file (default: .sonar-history.toml in the current directory or above)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Increase diagnostic logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Json,
}

impl Cli {
    /// Load the settings file named on the command line, or search for one
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        match &self.settings {
            Some(path) => Settings::from_file(path),
            None => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                Settings::find_and_load(&cwd)
            }
        }
    }

    /// Settings with command-line flags applied on top
    pub fn effective_settings(&self, mut settings: Settings) -> Settings {
        if let Some(binary) = &self.scanner {
            settings.scanner.binary = binary.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.scanner.timeout_secs = timeout;
        }
        if let Some(log) = &self.log {
            settings.log.file = log.clone();
        }
        if let Some(properties) = &self.properties {
            settings.scanner.properties = properties.clone();
        }
        settings
    }

    /// Validate the flags and turn them into a [`ScanConfig`]
    pub fn scan_config(&self, settings: &Settings) -> Result<ScanConfig, ConfigError> {
        let stride = parse_stride(self.every)?;

        let overrides = match self.change.as_deref() {
            Some([files, revisions]) => parse_change_list(files, revisions)?,
            Some(other) => {
                return Err(ConfigError::MismatchedChangeList {
                    files: other.len(),
                    revisions: 0,
                })
            }
            None => Vec::new(),
        };

        let allow_list = match &self.file {
            Some(path) => Some(read_allow_list(path)?),
            None => None,
        };

        let config = ScanConfig {
            repository_path: self.git.clone(),
            since: self.since.clone(),
            until: self.until.clone(),
            stride,
            allow_list,
            base_config: settings.scanner.properties.clone(),
            overrides,
        };
        config.validate()?;
        Ok(config)
    }
}
