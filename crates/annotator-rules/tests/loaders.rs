//! Tests for loading rule set documents from disk.

use std::fs;
use std::path::PathBuf;

use annotator_model::AttributeValue;
use annotator_rules::{RuleSet, RulesError, default_rules_path};
use proptest::prelude::*;

fn bundled_rules_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../rules/metadata_annotator_rules.json")
}

fn unique_temp_file(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "metadata-annotator-{}-{}-{}.json",
        name,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    path
}

#[test]
fn bundled_rule_set_loads() {
    let rules = RuleSet::from_path(&bundled_rules_path()).expect("load bundled rules");

    assert_eq!(rules.version, Some(3));
    assert_eq!(
        rules.collection_short_name_paths.first().map(String::as_str),
        Some("/HDF5_GLOBAL/short_name")
    );
    assert_eq!(rules.mission_for("SPL3FTP"), Some("SMAP"));
    assert_eq!(rules.mission_for("ATL08"), Some("ICESat2"));
    assert!(!rules.overrides.is_empty());

    let global = &rules.overrides[0];
    assert_eq!(
        global.applicability.exact_path(),
        Some("/EASE2_global_projection")
    );
    let geotransform = global
        .attributes
        .iter()
        .find(|edit| edit.is_temporary())
        .expect("temporary geotransform edit");
    assert_eq!(geotransform.name, "_*master_geotransform");
    assert!(matches!(geotransform.value, Some(AttributeValue::Numbers(ref values)) if values.len() == 6));
}

#[test]
fn default_path_points_at_bundled_rules() {
    if std::env::var(annotator_rules::RULES_ENV_VAR).is_ok() {
        return;
    }
    let path = default_rules_path();
    assert!(path.ends_with("rules/metadata_annotator_rules.json"));
    assert!(path.exists());
}

#[test]
fn missing_file_reports_path() {
    let path = unique_temp_file("missing");
    let err = RuleSet::from_path(&path).expect_err("missing file");
    match err {
        RulesError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_json_is_a_parse_error() {
    let path = unique_temp_file("invalid");
    fs::write(&path, b"{\"CollectionShortNamePath\": [").unwrap();
    let err = RuleSet::from_path(&path).expect_err("invalid json");
    assert!(matches!(err, RulesError::Json(_)));
    fs::remove_file(&path).unwrap();
}

#[test]
fn unknown_keys_are_ignored() {
    let rules = RuleSet::from_json_str(
        r#"{
            "Identification": "varinfo configuration",
            "Version": 1,
            "CollectionShortNamePath": ["short_name"],
            "ExcludedScienceVariables": [{"Applicability": {"Mission": "SMAP"}, "VariablePattern": [".*"]}],
            "Mission": {"TEST\\d+": "Test"}
        }"#,
    )
    .expect("load rules");
    assert_eq!(rules.identification.as_deref(), Some("varinfo configuration"));
    assert!(rules.overrides.is_empty());
}

proptest! {
    #[test]
    fn mission_resolution_is_deterministic(short_name in "[A-Z0-9_]{1,12}") {
        let rules = RuleSet::from_path(&bundled_rules_path()).expect("load bundled rules");
        let first = rules.mission_for(&short_name).map(str::to_string);
        let again = RuleSet::from_path(&bundled_rules_path()).expect("reload bundled rules");
        prop_assert_eq!(first.as_deref(), again.mission_for(&short_name));
        prop_assert_eq!(first.as_deref(), rules.mission_for(&short_name));
    }
}
