//! Revision selection and properties-file resolution

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{ConfigOverride, ScanConfig};
use crate::error::ConfigError;
use crate::revision::Revision;

/// A revision chosen for analysis and the properties file active at it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedRevision {
    /// Position in the full history
    pub index: usize,
    pub id: String,
    pub config_file: PathBuf,
}

/// Result of [`select_revisions`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    pub revisions: Vec<SelectedRevision>,
    /// `since` was given but no revision has that id
    pub since_missing: bool,
    /// `until` was given but no revision has that id
    pub until_missing: bool,
    /// Overrides whose trigger was never reached, in list order
    pub unapplied: Vec<ConfigOverride>,
}

/// Pick the revisions to analyse and annotate each with its properties file
///
/// Bounds fall back to the first and last revision when their id is not in
/// history. Stride positions are counted from the `since` revision, which is
/// always kept; the allow-list then narrows the strided set.
pub fn select_revisions(history: &[Revision], config: &ScanConfig) -> Result<Selection, ConfigError> {
    config.validate()?;

    if history.is_empty() {
        return Ok(Selection {
            since_missing: config.since.is_some(),
            until_missing: config.until.is_some(),
            unapplied: config.overrides.clone(),
            ..Default::default()
        });
    }

    let since_index = find_index(history, config.since.as_deref());
    let until_index = find_index(history, config.until.as_deref());
    let since = since_index.unwrap_or(0);
    let until = until_index.unwrap_or(history.len() - 1);

    let candidates = history
        .iter()
        .enumerate()
        .skip(since)
        .take((until + 1).saturating_sub(since))
        .step_by(config.stride)
        .filter(|(_, rev)| {
            config
                .allow_list
                .as_ref()
                .map_or(true, |allowed| allowed.contains(&rev.id))
        });

    let (revisions, pending) = resolve_configs(candidates, &config.base_config, &config.overrides);

    Ok(Selection {
        revisions,
        since_missing: config.since.is_some() && since_index.is_none(),
        until_missing: config.until.is_some() && until_index.is_none(),
        unapplied: config.overrides[pending..].to_vec(),
    })
}

/// Walk the selection once, switching files as trigger revisions go by
///
/// Returns the annotated revisions and the index of the first override that
/// was never triggered.
fn resolve_configs<'a>(
    selected: impl Iterator<Item = (usize, &'a Revision)>,
    base: &Path,
    overrides: &[ConfigOverride],
) -> (Vec<SelectedRevision>, usize) {
    let mut active = base;
    let mut pending = 0;
    let mut revisions = Vec::new();

    for (index, rev) in selected {
        if let Some(next) = overrides.get(pending) {
            if next.revision == rev.id {
                active = next.file.as_path();
                pending += 1;
            }
        }
        revisions.push(SelectedRevision {
            index,
            id: rev.id.clone(),
            config_file: active.to_path_buf(),
        });
    }

    (revisions, pending)
}

fn find_index(history: &[Revision], id: Option<&str>) -> Option<usize> {
    let id = id?;
    history.iter().position(|rev| rev.id == id)
}
