//! End-to-end annotation runs over small in-memory trees.

use annotator_core::{AnnotateOptions, Annotator, ErrorKind, annotate};
use annotator_model::{AttributeValue, MetadataTree, TreeNode};
use annotator_rules::RuleSet;
use chrono::{DateTime, TimeZone, Utc};
use insta::assert_snapshot;

const TEST_RULES: &str = r#"{
    "Identification": "annotator integration test rules",
    "Version": 1,
    "CollectionShortNamePath": ["/HDF5_GLOBAL/short_name", "short_name"],
    "Mission": {"TEST\\d{2}": "TEST_MISSION", "OTHER\\d{2}": "OTHER_MISSION"},
    "MetadataOverrides": [
        {
            "Applicability": {"Mission": "TEST_MISSION", "ShortNamePath": "TEST01", "VariablePattern": "^/$"},
            "Attributes": [
                {"Name": "addition", "Value": "new root group value"},
                {"Name": "update", "Value": "corrected root group value"},
                {"Name": "delete", "Value": null}
            ]
        },
        {
            "Applicability": {"Mission": "TEST_MISSION", "ShortNamePath": "TEST01", "VariablePattern": "/variable_one"},
            "Attributes": [
                {"Name": "coordinates", "Value": "time lat lon"},
                {"Name": "grid_mapping", "Value": "/EASE2_polar_projection"}
            ]
        },
        {
            "Applicability": {"Mission": "TEST_MISSION", "ShortNamePath": "TEST01", "VariablePattern": "^/sub_group$"},
            "Attributes": [
                {"Name": "nested_addition", "Value": "new nested group value"},
                {"Name": "update", "Value": "corrected nested group value"},
                {"Name": "delete", "Value": null}
            ]
        },
        {
            "Applicability": {"Mission": "TEST_MISSION", "ShortNamePath": "TEST01", "VariablePattern": "/sub_group/variable_two"},
            "Attributes": [
                {"Name": "delete", "Value": null},
                {"Name": "grid_mapping", "Value": "/sub_group/crs"}
            ]
        },
        {
            "Applicability": {"Mission": "TEST_MISSION", "ShortNamePath": "TEST01", "VariablePattern": "/sub_group/crs"},
            "Attributes": [{"Name": "grid_mapping_name", "Value": "latitude_longitude"}]
        },
        {
            "Applicability": {"Mission": "TEST_MISSION", "ShortNamePath": "TEST01", "VariablePattern": "/EASE2_polar_projection"},
            "Attributes": [
                {"Name": "grid_mapping_name", "Value": "lambert_azimuthal_equal_area"},
                {"Name": "_*master_geotransform", "Value": [-9000000, 36000, 0, 9000000, 0, -36000]}
            ]
        },
        {
            "Applicability": {"Mission": "TEST_MISSION", "ShortNamePath": "TEST01", "VariablePattern": "/EASE2_global_projection"},
            "Attributes": [{"Name": "grid_mapping_name", "Value": "lambert_cylindrical_equal_area"}]
        },
        {
            "Applicability": {"Mission": "TEST_MISSION", "ShortNamePath": "TEST01"},
            "Attributes": [{"Name": "_*visited", "Value": true}],
            "_Description": "Applies to every path of a TEST01 file."
        }
    ]
}"#;

fn rules() -> RuleSet {
    RuleSet::from_json_str(TEST_RULES).expect("test rules")
}

fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 2, 3, 4, 5).single().expect("timestamp")
}

fn options() -> AnnotateOptions {
    AnnotateOptions {
        timestamp: Some(timestamp()),
        ..AnnotateOptions::default()
    }
}

fn sample_tree(short_name: &str) -> MetadataTree {
    MetadataTree::from_nodes(vec![
        TreeNode::group("/")
            .with_attribute("short_name", short_name)
            .with_attribute("update", "original value")
            .with_attribute("delete", "attribute should not exist"),
        TreeNode::variable("/variable_one")
            .with_attribute("coordinates", "original value")
            .with_attribute("units", "seconds since 2000-00-00T12:34:56"),
        TreeNode::group("/sub_group")
            .with_attribute("delete", "attribute should not exist")
            .with_attribute("update", "original value"),
        TreeNode::variable("/sub_group/variable_two")
            .with_attribute("coordinates", "time latitude longitude")
            .with_attribute("delete", "attribute needs to be deleted"),
        TreeNode::variable("/variable_three")
            .with_attribute("coordinates", "time latitude longitude")
            .with_attribute("notes", "this variable does not match any override rules"),
    ])
    .expect("sample tree")
}

fn text<'t>(tree: &'t MetadataTree, path: &str, name: &str) -> Option<&'t str> {
    tree.node(path)?.attributes.get_str(name)
}

#[test]
fn root_group_additions_updates_and_deletions() {
    let (tree, _) = annotate(sample_tree("TEST01"), &rules(), &options()).expect("annotate");
    assert_eq!(text(&tree, "/", "addition"), Some("new root group value"));
    assert_eq!(text(&tree, "/", "update"), Some("corrected root group value"));
    assert_eq!(text(&tree, "/", "delete"), None);
    assert_eq!(text(&tree, "/", "short_name"), Some("TEST01"));
}

#[test]
fn nested_group_and_variable_edits() {
    let (tree, _) = annotate(sample_tree("TEST01"), &rules(), &options()).expect("annotate");

    assert_eq!(text(&tree, "/sub_group", "nested_addition"), Some("new nested group value"));
    assert_eq!(text(&tree, "/sub_group", "update"), Some("corrected nested group value"));
    assert_eq!(text(&tree, "/sub_group", "delete"), None);

    assert_eq!(text(&tree, "/variable_one", "coordinates"), Some("time lat lon"));
    assert_eq!(text(&tree, "/variable_one", "units"), Some("seconds since 2000-00-00T12:34:56"));
    assert_eq!(text(&tree, "/variable_one", "grid_mapping"), Some("/EASE2_polar_projection"));

    assert_eq!(text(&tree, "/sub_group/variable_two", "delete"), None);
    assert_eq!(text(&tree, "/sub_group/variable_two", "grid_mapping"), Some("crs"));

    let untouched = tree.node("/variable_three").expect("variable_three");
    assert_eq!(
        untouched.attributes.names().collect::<Vec<_>>(),
        vec!["coordinates", "notes"]
    );
}

#[test]
fn referenced_grid_mappings_are_created_and_unreferenced_ones_are_not() {
    let (tree, report) = annotate(sample_tree("TEST01"), &rules(), &options()).expect("annotate");

    let polar = tree.node("/EASE2_polar_projection").expect("polar grid mapping");
    assert!(polar.is_variable());
    assert!(polar.attribute_only);
    assert!(polar.data.is_none());
    assert_eq!(
        polar.attributes.get_str("grid_mapping_name"),
        Some("lambert_azimuthal_equal_area")
    );

    assert!(tree.contains("/sub_group/crs"));
    assert!(!tree.contains("/EASE2_global_projection"));
    assert_eq!(report.created, vec!["/sub_group/crs", "/EASE2_polar_projection"]);
    assert_eq!(report.suppressed, vec!["/EASE2_global_projection"]);
}

#[test]
fn temporary_attributes_never_reach_the_output() {
    let (tree, report) = annotate(sample_tree("TEST01"), &rules(), &options()).expect("annotate");
    for node in tree.nodes() {
        assert!(
            node.attributes.names().all(|name| !name.starts_with("_*")),
            "{} kept a temporary attribute",
            node.path
        );
    }
    assert_eq!(report.temporary_stripped, 8);
}

#[test]
fn history_record_is_appended() {
    let (tree, report) = annotate(sample_tree("TEST01"), &rules(), &options()).expect("annotate");
    assert!(report.history_recorded);
    assert_eq!(
        text(&tree, "/", "history"),
        Some(
            format!(
                "2000-01-02T03:04:05+00:00 Metadata Annotator {}",
                env!("CARGO_PKG_VERSION")
            )
            .as_str()
        )
    );

    let quiet = AnnotateOptions {
        record_history: false,
        ..options()
    };
    let (tree, report) = annotate(sample_tree("TEST01"), &rules(), &quiet).expect("annotate");
    assert!(!report.history_recorded);
    assert_eq!(text(&tree, "/", "history"), None);
}

#[test]
fn other_collection_only_gains_history() {
    let input = sample_tree("OTHER01");
    let (mut tree, report) = annotate(input.clone(), &rules(), &options()).expect("annotate");
    assert!(report.updated.is_empty());
    assert!(report.created.is_empty());
    assert_eq!(
        report.identity.as_ref().map(|identity| identity.mission.as_str()),
        Some("OTHER_MISSION")
    );
    tree.root_mut().expect("root").attributes.remove("history");
    assert_eq!(tree, input);
}

#[test]
fn unmapped_collection_passes_through_unless_strict() {
    let input = sample_tree("UNKNOWN");
    let (tree, report) = annotate(input.clone(), &rules(), &options()).expect("annotate");
    assert_eq!(tree, input);
    assert!(report.identity.is_none());
    assert!(report.is_unchanged());

    let strict = AnnotateOptions {
        strict: true,
        ..options()
    };
    let err = annotate(input, &rules(), &strict).expect_err("strict");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn missing_short_name_is_a_configuration_error() {
    let tree = MetadataTree::from_nodes(vec![TreeNode::group("/").with_attribute("title", "no id")])
        .expect("tree");
    let err = annotate(tree, &rules(), &options()).expect_err("no short name");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn caller_supplied_short_name_wins_over_attributes() {
    let options = AnnotateOptions {
        short_name: Some("TEST01".to_string()),
        ..options()
    };
    let (tree, report) = annotate(sample_tree("OTHER01"), &rules(), &options).expect("annotate");
    assert_eq!(
        report.identity.map(|identity| identity.short_name),
        Some("TEST01".to_string())
    );
    assert_eq!(text(&tree, "/", "addition"), Some("new root group value"));
}

#[test]
fn short_name_probing_prefers_earlier_paths() {
    let tree = MetadataTree::from_nodes(vec![
        TreeNode::group("/").with_attribute("short_name", "OTHER01"),
        TreeNode::group("/HDF5_GLOBAL").with_attribute("short_name", "TEST01"),
    ])
    .expect("tree");
    let rules = rules();
    let identity = Annotator::new(&rules)
        .resolve(&tree, &AnnotateOptions::default())
        .expect("resolve");
    assert_eq!(identity.short_name, "TEST01");
    assert_eq!(identity.mission, "TEST_MISSION");
}

#[test]
fn mistyped_edit_aborts_the_run() {
    let rules = RuleSet::from_json_str(
        r#"{
            "CollectionShortNamePath": ["short_name"],
            "Mission": {"TEST\\d{2}": "TEST_MISSION"},
            "MetadataOverrides": [{
                "Applicability": {"Mission": "TEST_MISSION", "ShortNamePath": "TEST01", "VariablePattern": "/variable_one"},
                "Attributes": [{"Name": "grid_mapping", "Value": 42}]
            }]
        }"#,
    )
    .expect("rules");
    let err = annotate(sample_tree("TEST01"), &rules, &options()).expect_err("numeric grid_mapping");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("/variable_one"));
}

#[test]
fn report_summary() {
    let (_, mut report) = annotate(sample_tree("TEST01"), &rules(), &options()).expect("annotate");
    report.rules_fingerprint = "0123456789abcdef".to_string();
    assert_snapshot!(report.to_string(), @r"
    collection: TEST01 (TEST_MISSION)
    rules: v1 (0123456789ab)
    updated: 5 paths, 17 edits, 3 deletions
    created: /sub_group/crs
    created: /EASE2_polar_projection
    suppressed: /EASE2_global_projection
    temporary attributes removed: 8
    history: recorded
    ");
}

#[test]
fn created_grid_mapping_keeps_only_persisted_attributes() {
    let (tree, _) = annotate(sample_tree("TEST01"), &rules(), &options()).expect("annotate");
    let polar = tree.node("/EASE2_polar_projection").expect("polar grid mapping");
    assert_eq!(
        polar.attributes.iter().collect::<Vec<_>>(),
        vec![(
            "grid_mapping_name",
            &AttributeValue::text("lambert_azimuthal_equal_area")
        )]
    );
}
