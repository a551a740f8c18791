//! Collection short name and mission resolution.

use serde::{Deserialize, Serialize};
use tracing::debug;

use annotator_model::{AttributeValue, MetadataTree, path};
use annotator_rules::RuleSet;

use crate::error::{AnnotateError, Result};

/// The resolved identity of a file: which collection it belongs to and
/// which mission produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionIdentity {
    pub short_name: String,
    pub mission: String,
}

/// Probes attribute paths in priority order; the first one present yields the short name.
///
/// A bare name (`short_name`) addresses a root group attribute; a slashed path
/// (`/HDF5_GLOBAL/short_name`) addresses an attribute of a nested group.
pub fn resolve_short_name(tree: &MetadataTree, attribute_paths: &[String]) -> Result<String> {
    for attribute_path in attribute_paths {
        let (group, name) = split_attribute_path(attribute_path);
        let Some(value) = tree
            .node(&group)
            .and_then(|node| node.attributes.get(name))
        else {
            continue;
        };
        let short_name = match value {
            AttributeValue::Text(text) => text.trim().to_string(),
            other => {
                return Err(AnnotateError::validation(
                    &group,
                    name,
                    format!("collection short name must be a string, found {}", other.type_name()),
                ));
            }
        };
        debug!(attribute_path = %attribute_path, short_name = %short_name, "resolved short name");
        return Ok(short_name);
    }
    Err(AnnotateError::UnresolvedShortName {
        paths: attribute_paths.to_vec(),
    })
}

/// Maps a short name to its mission through the first matching pattern.
pub fn resolve_mission(rules: &RuleSet, short_name: &str) -> Result<String> {
    rules
        .mission_for(short_name)
        .map(str::to_string)
        .ok_or_else(|| AnnotateError::UnmappedMission {
            short_name: short_name.to_string(),
        })
}

pub fn resolve(tree: &MetadataTree, rules: &RuleSet) -> Result<CollectionIdentity> {
    let short_name = resolve_short_name(tree, &rules.collection_short_name_paths)?;
    identity_for(rules, short_name)
}

/// Identity for a short name supplied by the caller instead of the file.
pub fn identity_for(rules: &RuleSet, short_name: String) -> Result<CollectionIdentity> {
    let mission = resolve_mission(rules, &short_name)?;
    Ok(CollectionIdentity {
        short_name,
        mission,
    })
}

fn split_attribute_path(attribute_path: &str) -> (String, &str) {
    let trimmed = attribute_path.trim();
    match trimmed.rfind('/') {
        None => (path::ROOT.to_string(), trimmed),
        Some(0) => (path::ROOT.to_string(), &trimmed[1..]),
        Some(idx) => (trimmed[..idx].to_string(), &trimmed[idx + 1..]),
    }
}
