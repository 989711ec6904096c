//! Scan configuration and the `.sonar-history.toml` settings file

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Settings file looked up in the start directory and its ancestors
pub const SETTINGS_FILE: &str = ".sonar-history.toml";

/// Base properties file used when none is given
pub const DEFAULT_PROPERTIES: &str = "sonar.properties";

/// Switch to `file` from revision `revision` onwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigOverride {
    pub revision: String,
    pub file: PathBuf,
}

/// What to scan: repository, revision range, stride and properties files
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub repository_path: PathBuf,
    pub since: Option<String>,
    pub until: Option<String>,
    pub stride: usize,
    pub allow_list: Option<HashSet<String>>,
    pub base_config: PathBuf,
    /// In history order; consumed in list order, never sorted
    pub overrides: Vec<ConfigOverride>,
}

impl ScanConfig {
    /// Scan every revision of `repository_path` with the default properties file
    pub fn new(repository_path: impl Into<PathBuf>) -> Self {
        Self {
            repository_path: repository_path.into(),
            since: None,
            until: None,
            stride: 1,
            allow_list: None,
            base_config: PathBuf::from(DEFAULT_PROPERTIES),
            overrides: Vec::new(),
        }
    }

    /// Reject configurations no selection can be computed from
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stride < 1 {
            return Err(ConfigError::InvalidStride(self.stride as i64));
        }
        if let Some(o) = self.overrides.iter().find(|o| o.file.as_os_str().is_empty()) {
            return Err(ConfigError::EmptyOverrideFile {
                revision: o.revision.clone(),
            });
        }
        Ok(())
    }
}

/// Convert a signed stride argument, rejecting anything below one
pub fn parse_stride(every: i64) -> Result<usize, ConfigError> {
    if every < 1 {
        return Err(ConfigError::InvalidStride(every));
    }
    usize::try_from(every).map_err(|_| ConfigError::InvalidStride(every))
}

/// Pair up the two comma-separated lists given to `--change`
///
/// `files` and `revisions` must have the same number of entries, and no file
/// name may be empty. Pairs keep the order they were given in.
pub fn parse_change_list(files: &str, revisions: &str) -> Result<Vec<ConfigOverride>, ConfigError> {
    let files: Vec<&str> = files.split(',').collect();
    let revisions: Vec<&str> = revisions.split(',').collect();

    if files.len() != revisions.len() {
        return Err(ConfigError::MismatchedChangeList {
            files: files.len(),
            revisions: revisions.len(),
        });
    }

    files
        .into_iter()
        .zip(revisions)
        .map(|(file, revision)| {
            if file.trim().is_empty() {
                return Err(ConfigError::EmptyOverrideFile {
                    revision: revision.to_string(),
                });
            }
            Ok(ConfigOverride {
                revision: revision.trim().to_string(),
                file: PathBuf::from(file.trim()),
            })
        })
        .collect()
}

/// Read a newline-delimited list of revision ids; blank lines are ignored
pub fn read_allow_list(path: &Path) -> Result<HashSet<String>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::AllowList {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_allow_list(&contents))
}

pub fn parse_allow_list(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tool settings loaded from `.sonar-history.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub scanner: ScannerSettings,

    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Analysis binary, looked up on PATH when not absolute
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Extra arguments passed before the per-revision properties
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-revision timeout in seconds (0 = wait forever)
    #[serde(default)]
    pub timeout_secs: u64,

    /// Base properties file when `--properties` is not given
    #[serde(default = "default_properties")]
    pub properties: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Append-only file receiving the scanner output of every revision
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_binary() -> PathBuf {
    PathBuf::from(if cfg!(windows) {
        "sonar-scanner.bat"
    } else {
        "sonar-scanner"
    })
}

fn default_properties() -> PathBuf {
    PathBuf::from(DEFAULT_PROPERTIES)
}

fn default_log_file() -> PathBuf {
    PathBuf::from("sonar-history.log")
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            args: Vec::new(),
            timeout_secs: 0,
            properties: default_properties(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

impl ScannerSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Settings {
    /// Load settings from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find and load `.sonar-history.toml` from `start_dir` or its ancestors
    pub fn find_and_load(start_dir: &Path) -> Result<Self, ConfigError> {
        let mut current = start_dir;

        loop {
            let settings_path = current.join(SETTINGS_FILE);
            if settings_path.exists() {
                return Self::from_file(&settings_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Ok(Self::default())
    }
}
