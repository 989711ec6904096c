//! Tests for revision selection, properties resolution and scan planning

use chrono::{DateTime, Duration, FixedOffset};
use sonar_history_core::config::parse_allow_list;
use sonar_history_core::{
    parse_change_list, parse_stride, select_revisions, ConfigError, ConfigOverride, DateSmoother,
    Revision, ScanConfig, ScanPlan,
};
use std::collections::HashSet;
use std::path::PathBuf;

/// R1..Rn, one day apart
fn history(n: usize) -> Vec<Revision> {
    let base = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z").unwrap();
    (1..=n)
        .map(|i| Revision::new(format!("R{}", i), base + Duration::days(i as i64)))
        .collect()
}

fn ids(config: &ScanConfig, history: &[Revision]) -> Vec<String> {
    select_revisions(history, config)
        .unwrap()
        .revisions
        .into_iter()
        .map(|r| r.id)
        .collect()
}

fn override_at(revision: &str, file: &str) -> ConfigOverride {
    ConfigOverride {
        revision: revision.to_string(),
        file: PathBuf::from(file),
    }
}

#[test]
fn defaults_select_everything() {
    let config = ScanConfig::new("repo");
    assert_eq!(ids(&config, &history(4)), vec!["R1", "R2", "R3", "R4"]);
}

#[test]
fn stride_counts_from_since() {
    let mut config = ScanConfig::new("repo");
    config.since = Some("R3".to_string());
    config.stride = 2;
    assert_eq!(ids(&config, &history(10)), vec!["R3", "R5", "R7", "R9"]);
}

#[test]
fn until_is_inclusive() {
    let mut config = ScanConfig::new("repo");
    config.since = Some("R2".to_string());
    config.until = Some("R5".to_string());
    assert_eq!(ids(&config, &history(10)), vec!["R2", "R3", "R4", "R5"]);
}

#[test]
fn missing_bounds_fall_back_to_history_ends() {
    let mut config = ScanConfig::new("repo");
    config.since = Some("nope".to_string());
    config.until = Some("gone".to_string());

    let selection = select_revisions(&history(3), &config).unwrap();
    assert_eq!(selection.revisions.len(), 3);
    assert!(selection.since_missing);
    assert!(selection.until_missing);
}

#[test]
fn until_before_since_selects_nothing() {
    let mut config = ScanConfig::new("repo");
    config.since = Some("R5".to_string());
    config.until = Some("R2".to_string());
    assert!(ids(&config, &history(6)).is_empty());
}

#[test]
fn allow_list_intersects_stride_in_history_order() {
    let mut config = ScanConfig::new("repo");
    config.stride = 2;
    config.allow_list = Some(HashSet::from([
        "R9".to_string(),
        "R2".to_string(),
        "R3".to_string(),
        "R5".to_string(),
    ]));
    // Stride keeps R1, R3, R5, R7, R9; R2 is not on the stride.
    assert_eq!(ids(&config, &history(10)), vec!["R3", "R5", "R9"]);
}

#[test]
fn selection_keeps_history_indices() {
    let mut config = ScanConfig::new("repo");
    config.since = Some("R4".to_string());
    config.stride = 3;
    let selection = select_revisions(&history(10), &config).unwrap();
    let indices: Vec<usize> = selection.revisions.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![3, 6, 9]);
}

#[test]
fn override_switches_from_trigger_on() {
    let mut config = ScanConfig::new("repo");
    config.base_config = PathBuf::from("a.properties");
    config.overrides = vec![override_at("R5", "b.properties")];

    let selection = select_revisions(&history(7), &config).unwrap();
    let files: Vec<(String, String)> = selection
        .revisions
        .iter()
        .map(|r| (r.id.clone(), r.config_file.display().to_string()))
        .collect();

    for (id, file) in &files {
        let n: usize = id[1..].parse().unwrap();
        if n < 5 {
            assert_eq!(file, "a.properties", "{}", id);
        } else {
            assert_eq!(file, "b.properties", "{}", id);
        }
    }
    assert!(selection.unapplied.is_empty());
}

#[test]
fn overrides_apply_in_list_order() {
    let mut config = ScanConfig::new("repo");
    config.base_config = PathBuf::from("a.properties");
    config.overrides = vec![
        override_at("R2", "b.properties"),
        override_at("R4", "c.properties"),
    ];

    let selection = select_revisions(&history(5), &config).unwrap();
    let files: Vec<String> = selection
        .revisions
        .iter()
        .map(|r| r.config_file.display().to_string())
        .collect();
    assert_eq!(
        files,
        vec!["a.properties", "b.properties", "b.properties", "c.properties", "c.properties"]
    );
}

#[test]
fn out_of_order_overrides_are_not_sorted() {
    let mut config = ScanConfig::new("repo");
    config.base_config = PathBuf::from("a.properties");
    config.overrides = vec![
        override_at("R4", "c.properties"),
        override_at("R2", "b.properties"),
    ];

    let selection = select_revisions(&history(5), &config).unwrap();
    let files: Vec<String> = selection
        .revisions
        .iter()
        .map(|r| r.config_file.display().to_string())
        .collect();
    assert_eq!(
        files,
        vec!["a.properties", "a.properties", "a.properties", "c.properties", "c.properties"]
    );
    assert_eq!(selection.unapplied, vec![override_at("R2", "b.properties")]);
}

#[test]
fn trigger_skipped_by_stride_is_never_applied() {
    let mut config = ScanConfig::new("repo");
    config.stride = 2;
    config.base_config = PathBuf::from("a.properties");
    config.overrides = vec![override_at("R2", "b.properties")];

    let selection = select_revisions(&history(5), &config).unwrap();
    assert!(selection
        .revisions
        .iter()
        .all(|r| r.config_file == PathBuf::from("a.properties")));
    assert_eq!(selection.unapplied.len(), 1);
}

#[test]
fn zero_stride_is_rejected() {
    let mut config = ScanConfig::new("repo");
    config.stride = 0;
    assert!(matches!(
        select_revisions(&history(3), &config),
        Err(ConfigError::InvalidStride(0))
    ));
    assert!(matches!(parse_stride(0), Err(ConfigError::InvalidStride(0))));
    assert!(matches!(parse_stride(-3), Err(ConfigError::InvalidStride(-3))));
    assert_eq!(parse_stride(10).unwrap(), 10);
}

#[test]
fn empty_override_file_is_rejected() {
    let mut config = ScanConfig::new("repo");
    config.overrides = vec![override_at("R2", "")];
    assert!(matches!(
        select_revisions(&history(3), &config),
        Err(ConfigError::EmptyOverrideFile { .. })
    ));
}

#[test]
fn change_list_pairs_files_with_revisions() {
    let overrides = parse_change_list("my2.properties,my3.properties", "e589d2a,1e5fd9f").unwrap();
    assert_eq!(
        overrides,
        vec![
            override_at("e589d2a", "my2.properties"),
            override_at("1e5fd9f", "my3.properties"),
        ]
    );
}

#[test]
fn change_list_length_mismatch_is_rejected() {
    let err = parse_change_list("a.properties,b.properties", "e589d2a").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::MismatchedChangeList {
            files: 2,
            revisions: 1
        }
    ));
}

#[test]
fn change_list_empty_filename_is_rejected() {
    let err = parse_change_list("a.properties,", "e589d2a,1e5fd9f").unwrap_err();
    assert!(matches!(err, ConfigError::EmptyOverrideFile { revision } if revision == "1e5fd9f"));
}

#[test]
fn allow_list_ignores_blank_lines() {
    let ids = parse_allow_list("abc\n\n  def  \r\n\n");
    assert_eq!(ids, HashSet::from(["abc".to_string(), "def".to_string()]));
}

#[test]
fn plan_uses_dates_smoothed_over_full_history() {
    let mut revs = history(5);
    // R2 jumps far into the future and must be corrected even when not selected.
    revs[1].timestamp = DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z").unwrap();

    let mut config = ScanConfig::new("repo");
    config.stride = 2;

    let plan = ScanPlan::build(&revs, &config, &DateSmoother::default()).unwrap();
    let ids: Vec<&str> = plan.targets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["R1", "R3", "R5"]);

    let dates: Vec<DateTime<FixedOffset>> = plan.targets.iter().map(|t| t.timestamp).collect();
    assert_eq!(dates[0], revs[0].timestamp);
    assert_eq!(dates[1], revs[2].timestamp);
    assert_eq!(dates[2], revs[4].timestamp);
    assert!(plan.end_preserved);
    assert_eq!(plan.history_len, 5);
    assert_eq!(plan.corrected_count(), 0);
}

#[test]
fn plan_reports_corrected_targets() {
    let mut revs = history(3);
    revs[1].timestamp = DateTime::parse_from_rfc3339("2019-06-01T00:00:00Z").unwrap();

    let plan = ScanPlan::build(&revs, &ScanConfig::new("repo"), &DateSmoother::default()).unwrap();
    assert_eq!(plan.corrected_count(), 1);
    assert_eq!(
        plan.targets[1].timestamp,
        revs[0].timestamp + Duration::seconds(1)
    );
    assert_eq!(plan.targets[1].raw_timestamp, revs[1].timestamp);
}
