//! Attribute type checks and reference rewriting applied to every edit.

use annotator_model::{AttributeValue, ElementType, is_temporary, path};

use crate::error::{AnnotateError, Result};

pub const GRID_MAPPING: &str = "grid_mapping";
pub const COORDINATES: &str = "coordinates";
pub const DIMENSIONS: &str = "dimensions";
pub const STANDARD_NAME: &str = "standard_name";
pub const AXIS: &str = "axis";
pub const TYPE: &str = "type";

pub const MASTER_GEOTRANSFORM: &str = "master_geotransform";
pub const CORNER_POINT_OFFSETS: &str = "corner_point_offsets";
pub const SUBSET_INDEX_REFERENCE: &str = "subset_index_reference";

/// Attributes whose values name other nodes in the tree.
pub const REFERENCE_ATTRIBUTES: &[&str] = &[GRID_MAPPING, COORDINATES, DIMENSIONS];

const TEXT_ATTRIBUTES: &[&str] = &[
    GRID_MAPPING,
    COORDINATES,
    DIMENSIONS,
    STANDARD_NAME,
    AXIS,
    TYPE,
    "units",
    "long_name",
    "grid_mapping_name",
];

const TEXT_TEMPORARY_ATTRIBUTES: &[&str] = &[CORNER_POINT_OFFSETS, SUBSET_INDEX_REFERENCE];

/// Checks an edit value against the attribute it targets and rewrites
/// path-valued references, returning the value to store.
pub fn prepare_value(node_path: &str, name: &str, value: AttributeValue) -> Result<AttributeValue> {
    let bare = name.strip_prefix(annotator_model::TEMPORARY_PREFIX);
    match bare {
        Some(MASTER_GEOTRANSFORM) => check_geotransform(node_path, name, &value)?,
        Some(temporary) if TEXT_TEMPORARY_ATTRIBUTES.contains(&temporary) => {
            require_text(node_path, name, &value)?;
        }
        Some(_) => {}
        None if TEXT_ATTRIBUTES.contains(&name) => require_text(node_path, name, &value)?,
        None => {}
    }

    if name == TYPE
        && let AttributeValue::Text(raw) = &value
    {
        raw.parse::<ElementType>()
            .map_err(|error| AnnotateError::validation(node_path, name, error.to_string()))?;
    }
    if name == AXIS
        && let AttributeValue::Text(raw) = &value
        && !matches!(raw.as_str(), "X" | "Y" | "Z" | "T")
    {
        return Err(AnnotateError::validation(
            node_path,
            name,
            format!("axis must be one of X, Y, Z, T, found {raw:?}"),
        ));
    }

    if !is_temporary(name)
        && (name == GRID_MAPPING || name == COORDINATES)
        && let AttributeValue::Text(raw) = &value
    {
        return Ok(AttributeValue::Text(relativize_references(node_path, raw)));
    }
    Ok(value)
}

fn require_text(node_path: &str, name: &str, value: &AttributeValue) -> Result<()> {
    if value.as_str().is_some() {
        return Ok(());
    }
    Err(AnnotateError::validation(
        node_path,
        name,
        format!("expected a string, found {}", value.type_name()),
    ))
}

fn check_geotransform(node_path: &str, name: &str, value: &AttributeValue) -> Result<()> {
    match value.as_numbers() {
        Some(coefficients) if coefficients.len() == 6 => {
            if coefficients.iter().all(|coefficient| coefficient.is_finite()) {
                Ok(())
            } else {
                Err(AnnotateError::validation(
                    node_path,
                    name,
                    "geotransform coefficients must be finite",
                ))
            }
        }
        Some(coefficients) => Err(AnnotateError::validation(
            node_path,
            name,
            format!("expected 6 geotransform coefficients, found {}", coefficients.len()),
        )),
        None => Err(AnnotateError::validation(
            node_path,
            name,
            format!("expected a number sequence, found {}", value.type_name()),
        )),
    }
}

/// Rewrites absolute references to siblings of a nested node as bare names.
///
/// Only references from inside a non-root group to the same group are
/// shortened; root-scoped references stay fully qualified.
pub fn relativize_references(node_path: &str, raw: &str) -> String {
    let Some(group) = path::parent(node_path).filter(|group| *group != path::ROOT) else {
        return raw.to_string();
    };
    raw.split_whitespace()
        .map(|token| {
            let (target, suffix) = match token.strip_suffix(':') {
                Some(target) => (target, ":"),
                None => (token, ""),
            };
            if target.starts_with('/') && path::parent(target) == Some(group) {
                format!("{}{suffix}", path::name(target))
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Node names referenced by a path-valued attribute. CF `name:` keys in
/// extended grid mapping syntax are references too.
pub fn reference_tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split_whitespace()
        .map(|token| token.trim_end_matches(':'))
        .filter(|token| !token.is_empty())
}
