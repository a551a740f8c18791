//! Coordinate values for projection dimension variables that the source
//! file declares but does not store.
//!
//! A variable qualifies when its `standard_name` is a projection x or y
//! coordinate and its `grid_mapping` resolves to a grid-mapping variable
//! carrying `_*master_geotransform`. The start index of the (possibly
//! cropped) window comes from one of two temporary attributes:
//! `_*corner_point_offsets` reads the subset ranges recorded in history,
//! `_*subset_index_reference` reads the first value of another variable.
//! With neither, the window is assumed to start at the grid origin.

use serde::Serialize;
use tracing::{debug, warn};

use annotator_model::{ArrayData, ElementType, MetadataTree, TreeNode};

use crate::coerce::{
    CORNER_POINT_OFFSETS, GRID_MAPPING, MASTER_GEOTRANSFORM, STANDARD_NAME,
    SUBSET_INDEX_REFERENCE, TYPE, reference_tokens,
};
use crate::error::{AnnotateError, Result};
use crate::geotransform::{Axis, Geotransform};
use crate::history::{
    HISTORY_SUBSET_INDEX_RANGES, HistoryError, find_history, parse_subset_index_ranges,
    start_index_for_dimension,
};

/// One coordinate array written by the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedScale {
    pub path: String,
    pub axis: Axis,
    pub start_index: usize,
    pub length: usize,
}

/// How the start of the window is found.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StartIndex {
    Origin,
    History,
    Reference(String),
}

struct ScalePlan {
    path: String,
    axis: Axis,
    geotransform: Geotransform,
    start: StartIndex,
}

/// Writes coordinate arrays onto every qualifying dimension variable.
///
/// Must run after all attribute edits and before temporary attributes are
/// stripped. Variables that already store values are left alone.
pub fn synthesize_dimension_scales(tree: &mut MetadataTree) -> Result<Vec<SynthesizedScale>> {
    let mut plans = Vec::new();
    for node in tree.nodes().iter().filter(|node| node.is_variable()) {
        if let Some(plan) = plan_scale(tree, node)? {
            plans.push(plan);
        }
    }

    let mut synthesized = Vec::with_capacity(plans.len());
    for plan in plans {
        let start_index = resolve_start_index(tree, &plan)?;
        let length = dimension_length(tree, &plan.path)?;
        if start_index.checked_add(length).is_none() {
            return Err(window_overflow(&plan, start_index, length));
        }
        let values = plan
            .geotransform
            .dimension_scale(plan.axis, start_index, length);
        let element_type = output_element_type(tree, &plan.path)?;

        let Some(node) = tree.node_mut(&plan.path) else {
            continue;
        };
        node.data = Some(ArrayData::new(element_type, values));
        node.shape = vec![length];
        if node.dimensions.is_empty() {
            node.dimensions = vec![node.name().to_string()];
        }
        debug!(
            path = %plan.path,
            axis = %plan.axis,
            start_index,
            length,
            "synthesized dimension scale"
        );
        synthesized.push(SynthesizedScale {
            path: plan.path,
            axis: plan.axis,
            start_index,
            length,
        });
    }
    Ok(synthesized)
}

/// Checks the precondition for one variable; `None` when it does not apply.
fn plan_scale(tree: &MetadataTree, node: &TreeNode) -> Result<Option<ScalePlan>> {
    let corner_offsets = node.attributes.get_temporary(CORNER_POINT_OFFSETS);
    let index_reference = node.attributes.get_temporary(SUBSET_INDEX_REFERENCE);
    let configured = corner_offsets.is_some() || index_reference.is_some();

    let Some(axis) = node
        .attributes
        .get_str(STANDARD_NAME)
        .and_then(Axis::from_standard_name)
    else {
        if configured {
            warn!(path = %node.path, "start index configured on a variable that is not a projection coordinate");
        }
        return Ok(None);
    };
    let Some(geotransform) = grid_geotransform(tree, node)? else {
        if configured {
            warn!(path = %node.path, "start index configured but no grid mapping geotransform resolves");
        }
        return Ok(None);
    };
    if node.data.is_some() {
        debug!(path = %node.path, "dimension variable already stores values");
        return Ok(None);
    }

    let start = match (corner_offsets, index_reference) {
        (Some(_), Some(_)) => {
            return Err(AnnotateError::validation(
                &node.path,
                CORNER_POINT_OFFSETS,
                "both corner point offsets and a subset index reference are configured",
            ));
        }
        (Some(strategy), None) => match strategy.as_str() {
            Some(HISTORY_SUBSET_INDEX_RANGES) => StartIndex::History,
            _ => {
                return Err(AnnotateError::validation(
                    &node.path,
                    CORNER_POINT_OFFSETS,
                    format!("unsupported offset strategy {strategy}"),
                ));
            }
        },
        (None, Some(reference)) => match reference.as_str() {
            Some(reference) => StartIndex::Reference(reference.trim().to_string()),
            None => {
                return Err(AnnotateError::validation(
                    &node.path,
                    SUBSET_INDEX_REFERENCE,
                    format!("expected a variable name, found {}", reference.type_name()),
                ));
            }
        },
        (None, None) => StartIndex::Origin,
    };

    Ok(Some(ScalePlan {
        path: node.path.clone(),
        axis,
        geotransform,
        start,
    }))
}

/// Geotransform of the grid-mapping variable named by the first
/// `grid_mapping` token.
fn grid_geotransform(tree: &MetadataTree, node: &TreeNode) -> Result<Option<Geotransform>> {
    let Some(reference) = node
        .attributes
        .get_str(GRID_MAPPING)
        .and_then(|raw| reference_tokens(raw).next())
    else {
        return Ok(None);
    };
    let Some(grid_mapping) = tree
        .resolve_reference(&node.path, reference)
        .and_then(|resolved| tree.node(&resolved))
    else {
        return Ok(None);
    };
    let Some(value) = grid_mapping.attributes.get_temporary(MASTER_GEOTRANSFORM) else {
        return Ok(None);
    };
    value
        .as_numbers()
        .and_then(Geotransform::from_coefficients)
        .map(Some)
        .ok_or_else(|| {
            AnnotateError::validation(
                &grid_mapping.path,
                MASTER_GEOTRANSFORM,
                "expected 6 geotransform coefficients",
            )
        })
}

fn resolve_start_index(tree: &MetadataTree, plan: &ScalePlan) -> Result<usize> {
    match &plan.start {
        StartIndex::Origin => Ok(0),
        StartIndex::History => {
            let history_error = |error: HistoryError| AnnotateError::HistoryParse {
                path: plan.path.clone(),
                message: error.to_string(),
            };
            let history = find_history(tree, &plan.path)
                .ok_or_else(|| history_error(HistoryError::MissingHistory))?;
            let entries = parse_subset_index_ranges(history).map_err(history_error)?;
            start_index_for_dimension(tree, &entries, &plan.path).ok_or_else(|| {
                history_error(HistoryError::UncoveredDimension {
                    dimension: plan.path.clone(),
                })
            })
        }
        StartIndex::Reference(reference) => {
            let resolved = tree
                .resolve_reference(&plan.path, reference)
                .ok_or_else(|| AnnotateError::MissingReference {
                    path: plan.path.clone(),
                    reference: reference.clone(),
                })?;
            let first = tree
                .node(&resolved)
                .and_then(|node| node.data.as_ref())
                .and_then(ArrayData::first);
            match first {
                Some(value) if value >= 0.0 && value.fract() == 0.0 && value < usize::MAX as f64 => {
                    Ok(value as usize)
                }
                Some(value) => Err(AnnotateError::validation(
                    &resolved,
                    SUBSET_INDEX_REFERENCE,
                    format!("start index must be a non-negative integer, found {value}"),
                )),
                None => Err(AnnotateError::validation(
                    &resolved,
                    SUBSET_INDEX_REFERENCE,
                    "referenced variable stores no values",
                )),
            }
        }
    }
}

/// The window end must stay addressable; the error names the source of the start index.
fn window_overflow(plan: &ScalePlan, start_index: usize, length: usize) -> AnnotateError {
    let message = format!("window of {length} values starting at {start_index} overflows the grid index");
    match plan.start {
        StartIndex::History => AnnotateError::HistoryParse {
            path: plan.path.clone(),
            message,
        },
        StartIndex::Origin | StartIndex::Reference(_) => {
            AnnotateError::validation(&plan.path, SUBSET_INDEX_REFERENCE, message)
        }
    }
}

/// Length of a dimension variable: its own 1-D shape, else the size of its
/// first dimension, else the size of a dimension sharing its name.
fn dimension_length(tree: &MetadataTree, node_path: &str) -> Result<usize> {
    let Some(node) = tree.node(node_path) else {
        return Err(AnnotateError::MissingReference {
            path: node_path.to_string(),
            reference: node_path.to_string(),
        });
    };
    if let [length] = node.shape.as_slice()
        && *length > 0
    {
        return Ok(*length);
    }
    node.dimension_names()
        .first()
        .and_then(|name| tree.dimension_size(node_path, name))
        .or_else(|| tree.dimension_size(node_path, node.name()))
        .ok_or_else(|| {
            AnnotateError::validation(node_path, "dimensions", "cannot determine dimension length")
        })
}

fn output_element_type(tree: &MetadataTree, node_path: &str) -> Result<ElementType> {
    let Some(raw) = tree
        .node(node_path)
        .and_then(|node| node.attributes.get_str(TYPE))
    else {
        return Ok(ElementType::Float64);
    };
    raw.parse::<ElementType>()
        .map_err(|error| AnnotateError::validation(node_path, TYPE, error.to_string()))
}
