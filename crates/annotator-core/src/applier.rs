//! Override application.
//!
//! Runs in two passes. Existing paths are edited first, in traversal order.
//! Literal paths named by matching overrides but absent from the file are
//! then created, but only once something in the tree refers to them; this
//! repeats until no further node becomes referenced.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, trace, warn};

use annotator_model::{MetadataTree, TreeNode, path};
use annotator_rules::{Override, RuleSet};

use crate::coerce::{REFERENCE_ATTRIBUTES, prepare_value, reference_tokens};
use crate::error::Result;
use crate::identity::CollectionIdentity;
use crate::matcher::collection_overrides;

/// What an override pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// Existing paths matched by at least one override.
    pub updated: Vec<String>,
    /// Attribute-only variables added to the tree.
    pub created: Vec<String>,
    /// Literal override targets left uncreated because nothing references them.
    pub suppressed: Vec<String>,
    /// Attribute values written.
    pub edits: usize,
    /// Attributes removed. Deleting an absent attribute is not counted.
    pub deletions: usize,
}

pub fn apply_overrides(
    tree: &mut MetadataTree,
    rules: &RuleSet,
    identity: &CollectionIdentity,
) -> Result<ApplyOutcome> {
    let overrides = collection_overrides(rules, identity);
    let mut outcome = ApplyOutcome::default();
    if overrides.is_empty() {
        debug!(short_name = %identity.short_name, "no overrides apply to collection");
        return Ok(outcome);
    }

    for node_path in tree.paths() {
        if apply_to_path(tree, &overrides, &node_path, &mut outcome)? {
            outcome.updated.push(node_path);
        }
    }
    propagate_dimension_renames(tree);

    let mut pending = creation_candidates(tree, &overrides);
    loop {
        let referenced = referenced_paths(tree, &pending);
        let (ready, waiting): (Vec<String>, Vec<String>) = pending
            .into_iter()
            .partition(|candidate| {
                referenced.contains(candidate) && parent_group_exists(tree, candidate)
            });
        pending = waiting;
        if ready.is_empty() {
            break;
        }
        for node_path in ready {
            let mut node = TreeNode::variable(node_path.as_str());
            node.attribute_only = true;
            tree.insert(node)?;
            apply_to_path(tree, &overrides, &node_path, &mut outcome)?;
            debug!(path = %node_path, "created attribute-only variable");
            outcome.created.push(node_path);
        }
        propagate_dimension_renames(tree);
    }

    for node_path in &pending {
        debug!(path = %node_path, "skipping unreferenced override target");
    }
    outcome.suppressed = pending;
    Ok(outcome)
}

/// Applies every matching override's edits to one existing node, in
/// declaration order, so later edits of the same attribute win.
///
/// Returns false when no override matched.
fn apply_to_path(
    tree: &mut MetadataTree,
    overrides: &[&Override],
    node_path: &str,
    outcome: &mut ApplyOutcome,
) -> Result<bool> {
    let matched: Vec<&Override> = overrides
        .iter()
        .copied()
        .filter(|rule| rule.applicability.path_matches(node_path))
        .collect();
    if matched.is_empty() {
        return Ok(false);
    }
    let Some(node) = tree.node_mut(node_path) else {
        return Ok(false);
    };

    for rule in matched {
        trace!(path = %node_path, rule = rule.index, "applying override");
        for edit in &rule.attributes {
            match &edit.value {
                Some(value) => {
                    let value = prepare_value(node_path, &edit.name, value.clone())?;
                    node.attributes.insert(edit.name.as_str(), value);
                    outcome.edits += 1;
                }
                None => {
                    if node.attributes.remove(&edit.name).is_some() {
                        outcome.deletions += 1;
                    } else {
                        trace!(path = %node_path, attribute = %edit.name, "attribute already absent");
                    }
                }
            }
        }
    }
    Ok(true)
}

/// Created nodes never fabricate their enclosing groups.
fn parent_group_exists(tree: &MetadataTree, node_path: &str) -> bool {
    path::parent(node_path)
        .and_then(|group| tree.node(group))
        .is_some_and(TreeNode::is_group)
}

/// Literal override targets missing from the tree, first mention first.
fn creation_candidates(tree: &MetadataTree, overrides: &[&Override]) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    for rule in overrides {
        let Some(exact) = rule.applicability.exact_path() else {
            continue;
        };
        let Ok(normalized) = path::normalize(exact) else {
            continue;
        };
        if !tree.contains(&normalized) && !candidates.contains(&normalized) {
            candidates.push(normalized);
        }
    }
    candidates
}

/// Pending creation targets that some node refers to.
///
/// A relative token binds to its nearest scope candidate that exists or is
/// pending; farther candidates stay unreferenced.
fn referenced_paths(tree: &MetadataTree, pending: &[String]) -> BTreeSet<String> {
    let mut referenced = BTreeSet::new();
    for node in tree.nodes() {
        let mut tokens: Vec<String> = Vec::new();
        for attribute in REFERENCE_ATTRIBUTES {
            if let Some(raw) = node.attributes.get_str(attribute) {
                tokens.extend(reference_tokens(raw).map(str::to_string));
            }
        }
        if node.is_variable() {
            tokens.extend(node.dimensions.iter().cloned());
        }
        for token in tokens {
            let target = tree
                .reference_candidates(&node.path, &token)
                .into_iter()
                .find(|candidate| tree.contains(candidate) || pending.contains(candidate));
            if let Some(target) = target.filter(|target| !tree.contains(target)) {
                referenced.insert(target);
            }
        }
    }
    referenced
}

/// Carries dimension sizes over to names assigned by a `dimensions` attribute.
///
/// Source files often declare placeholder dimensions (`dim0`, `dim1`); once a
/// rule names them positionally, the new names need sizes of their own.
fn propagate_dimension_renames(tree: &mut MetadataTree) {
    let mut sizes: Vec<(String, usize)> = Vec::new();
    let mut renamed: Vec<(String, Vec<String>)> = Vec::new();

    for node in tree.nodes().iter().filter(|node| node.is_variable()) {
        let names = node.dimension_names();
        if node.dimensions.is_empty() || names == node.dimensions {
            continue;
        }
        if names.len() != node.dimensions.len() {
            warn!(
                path = %node.path,
                declared = node.dimensions.len(),
                named = names.len(),
                "dimensions attribute does not match variable rank"
            );
            continue;
        }
        for (old, new) in node.dimensions.iter().zip(&names) {
            if old == new || tree.dimension_size(&node.path, new).is_some() {
                continue;
            }
            let found = tree.scope_groups(&node.path).into_iter().find_map(|group| {
                tree.dimensions
                    .get(&path::join(&group, old))
                    .map(|size| (group, *size))
            });
            if let Some((group, size)) = found {
                sizes.push((path::join(&group, new), size));
            }
        }
        renamed.push((node.path.clone(), names));
    }

    for (dimension_path, size) in sizes {
        trace!(dimension = %dimension_path, size, "sized renamed dimension");
        tree.set_dimension_size(&dimension_path, size);
    }
    for (node_path, names) in renamed {
        if let Some(node) = tree.node_mut(&node_path) {
            node.dimensions = names;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> CollectionIdentity {
        CollectionIdentity {
            short_name: "SPL3FTP".to_string(),
            mission: "SMAP".to_string(),
        }
    }

    fn rules() -> RuleSet {
        RuleSet::from_json_str(
            r#"{
                "CollectionShortNamePath": ["short_name"],
                "Mission": {"SPL3FT": "SMAP"},
                "MetadataOverrides": [
                    {
                        "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP", "VariablePattern": "/Global/surface_flag"},
                        "Attributes": [
                            {"Name": "dimensions", "Value": "am_pm y x"},
                            {"Name": "grid_mapping", "Value": "/Global/crs"}
                        ]
                    },
                    {
                        "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP", "VariablePattern": "/Global/crs"},
                        "Attributes": [{"Name": "grid_mapping_name", "Value": "lambert_cylindrical_equal_area"}]
                    },
                    {
                        "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP", "VariablePattern": "/Global/x"},
                        "Attributes": [{"Name": "grid_mapping", "Value": "/Global/x_crs"}]
                    },
                    {
                        "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP", "VariablePattern": "/Global/x_crs"},
                        "Attributes": [{"Name": "grid_mapping_name", "Value": "polar_stereographic"}]
                    },
                    {
                        "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP", "VariablePattern": "/Unused/crs"},
                        "Attributes": [{"Name": "grid_mapping_name", "Value": "latitude_longitude"}]
                    }
                ]
            }"#,
        )
        .expect("rules")
    }

    fn tree() -> MetadataTree {
        let mut tree = MetadataTree::from_nodes(vec![
            TreeNode::group("/").with_attribute("short_name", "SPL3FTP"),
            TreeNode::group("/Global"),
            TreeNode::variable("/Global/surface_flag")
                .with_dimensions(&["dim0", "dim1", "dim2"])
                .with_shape(&[2, 29, 52]),
        ])
        .expect("tree");
        tree.set_dimension_size("/Global/dim0", 2);
        tree.set_dimension_size("/Global/dim1", 29);
        tree.set_dimension_size("/Global/dim2", 52);
        tree
    }

    #[test]
    fn referenced_targets_are_created_to_a_fixed_point() {
        let mut tree = tree();
        let outcome = apply_overrides(&mut tree, &rules(), &identity()).expect("apply");

        assert_eq!(outcome.updated, vec!["/Global/surface_flag".to_string()]);
        assert_eq!(
            outcome.created,
            vec![
                "/Global/crs".to_string(),
                "/Global/x".to_string(),
                "/Global/x_crs".to_string(),
            ]
        );
        assert_eq!(outcome.suppressed, vec!["/Unused/crs".to_string()]);

        let crs = tree.node("/Global/crs").expect("crs");
        assert!(crs.attribute_only);
        assert!(crs.is_variable());
        assert_eq!(
            crs.attributes.get_str("grid_mapping_name"),
            Some("lambert_cylindrical_equal_area")
        );
        assert!(!tree.contains("/Unused"));
    }

    #[test]
    fn relative_reference_creates_only_the_nearest_target() {
        let rules = RuleSet::from_json_str(
            r#"{
                "CollectionShortNamePath": ["short_name"],
                "MetadataOverrides": [
                    {
                        "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP", "VariablePattern": "/g/data"},
                        "Attributes": [{"Name": "grid_mapping", "Value": "crs"}]
                    },
                    {
                        "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP", "VariablePattern": "/g/crs"},
                        "Attributes": [{"Name": "grid_mapping_name", "Value": "polar_stereographic"}]
                    },
                    {
                        "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP", "VariablePattern": "/crs"},
                        "Attributes": [{"Name": "grid_mapping_name", "Value": "latitude_longitude"}]
                    }
                ]
            }"#,
        )
        .expect("rules");
        let mut tree = MetadataTree::from_nodes(vec![
            TreeNode::group("/"),
            TreeNode::group("/g"),
            TreeNode::variable("/g/data"),
        ])
        .expect("tree");

        let outcome = apply_overrides(&mut tree, &rules, &identity()).expect("apply");

        assert_eq!(outcome.created, vec!["/g/crs".to_string()]);
        assert_eq!(outcome.suppressed, vec!["/crs".to_string()]);
        assert!(!tree.contains("/crs"));
    }

    #[test]
    fn nested_same_group_reference_is_written_bare() {
        let mut tree = tree();
        apply_overrides(&mut tree, &rules(), &identity()).expect("apply");
        let flag = tree.node("/Global/surface_flag").expect("surface_flag");
        assert_eq!(flag.attributes.get_str("grid_mapping"), Some("crs"));
    }

    #[test]
    fn renamed_dimensions_inherit_sizes() {
        let mut tree = tree();
        apply_overrides(&mut tree, &rules(), &identity()).expect("apply");
        assert_eq!(tree.dimension_size("/Global/surface_flag", "x"), Some(52));
        assert_eq!(tree.dimension_size("/Global/surface_flag", "y"), Some(29));
        let flag = tree.node("/Global/surface_flag").expect("surface_flag");
        assert_eq!(flag.dimensions, vec!["am_pm", "y", "x"]);
    }

    #[test]
    fn unmatched_collection_is_untouched() {
        let mut tree = tree();
        let before = tree.clone();
        let other = CollectionIdentity {
            short_name: "SPL3SMP".to_string(),
            mission: "SMAP".to_string(),
        };
        let outcome = apply_overrides(&mut tree, &rules(), &other).expect("apply");
        assert_eq!(outcome, ApplyOutcome::default());
        assert_eq!(tree, before);
    }

    #[test]
    fn type_mismatch_names_path_and_attribute() {
        let rules = RuleSet::from_json_str(
            r#"{
                "CollectionShortNamePath": ["short_name"],
                "MetadataOverrides": [{
                    "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP", "VariablePattern": "/Global/surface_flag"},
                    "Attributes": [{"Name": "units", "Value": [1, 2, 3]}]
                }]
            }"#,
        )
        .expect("rules");
        let mut tree = tree();
        let err = apply_overrides(&mut tree, &rules, &identity()).expect_err("array units");
        let message = err.to_string();
        assert!(message.contains("/Global/surface_flag"), "{message}");
        assert!(message.contains("units"), "{message}");
    }

    #[test]
    fn deletions_only_count_present_attributes() {
        let rules = RuleSet::from_json_str(
            r#"{
                "CollectionShortNamePath": ["short_name"],
                "MetadataOverrides": [{
                    "Applicability": {"Mission": "SMAP", "ShortNamePath": "SPL3FTP"},
                    "Attributes": [{"Name": "short_name", "Value": null}, {"Name": "absent", "Value": null}]
                }]
            }"#,
        )
        .expect("rules");
        let mut tree = tree();
        let outcome = apply_overrides(&mut tree, &rules, &identity()).expect("apply");
        assert_eq!(outcome.deletions, 1);
        assert_eq!(outcome.updated.len(), 3);
        assert!(!tree.root().expect("root").attributes.contains("short_name"));
    }
}
