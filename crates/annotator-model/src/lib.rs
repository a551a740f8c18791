//! Metadata tree model for hierarchical scientific data files.
//!
//! Groups and variables are addressed by absolute slash-delimited paths,
//! as in NetCDF-4 and HDF-5. The tree only carries metadata: attributes,
//! declared dimensions, shapes and, for synthesized coordinate variables,
//! the computed array payload handed to the writer.

pub mod array;
pub mod attributes;
pub mod error;
pub mod path;
pub mod tree;
pub mod value;

pub use array::{ArrayData, ElementType};
pub use attributes::AttributeMap;
pub use error::{ModelError, Result};
pub use tree::{MetadataTree, NodeKind, TreeNode};
pub use value::AttributeValue;

/// Prefix marking an attribute as temporary: visible to the engine, never written.
pub const TEMPORARY_PREFIX: &str = "_*";

/// Returns true if the attribute name carries the temporary prefix.
pub fn is_temporary(name: &str) -> bool {
    name.starts_with(TEMPORARY_PREFIX)
}

/// Builds the working-tree name of a temporary attribute.
pub fn temporary_name(name: &str) -> String {
    format!("{TEMPORARY_PREFIX}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_prefix_detection() {
        assert!(is_temporary("_*master_geotransform"));
        assert!(!is_temporary("_FillValue"));
        assert!(!is_temporary("units"));
        assert_eq!(temporary_name("corner_point_offsets"), "_*corner_point_offsets");
    }
}
