//! In-memory group/variable tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::array::ArrayData;
use crate::attributes::AttributeMap;
use crate::error::{ModelError, Result};
use crate::path;
use crate::value::AttributeValue;

/// Name of the attribute some rule sets use to declare a variable's dimensions.
pub const DIMENSIONS_ATTRIBUTE: &str = "dimensions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group,
    Variable,
}

/// A group or variable in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub path: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub attributes: AttributeMap,
    /// Declared dimension names, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shape: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ArrayData>,
    /// Set on variables created from rules alone, with no payload in the source file.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub attribute_only: bool,
}

impl TreeNode {
    pub fn group(path: impl Into<String>) -> Self {
        Self::new(path.into(), NodeKind::Group)
    }

    pub fn variable(path: impl Into<String>) -> Self {
        Self::new(path.into(), NodeKind::Variable)
    }

    fn new(path: String, kind: NodeKind) -> Self {
        Self {
            path,
            kind,
            attributes: AttributeMap::new(),
            dimensions: Vec::new(),
            shape: Vec::new(),
            data: None,
            attribute_only: false,
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name, value.into());
        self
    }

    #[must_use]
    pub fn with_dimensions(mut self, names: &[&str]) -> Self {
        self.dimensions = names.iter().map(|name| (*name).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: &[usize]) -> Self {
        self.shape = shape.to_vec();
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: ArrayData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::Group
    }

    pub fn is_variable(&self) -> bool {
        self.kind == NodeKind::Variable
    }

    pub fn name(&self) -> &str {
        path::name(&self.path)
    }

    /// Dimension names of a variable.
    ///
    /// A `dimensions` attribute (whitespace separated) takes precedence over
    /// the names declared in the source file, since rule sets use it to
    /// correct placeholder names such as `dim0`.
    pub fn dimension_names(&self) -> Vec<String> {
        match self.attributes.get_str(DIMENSIONS_ATTRIBUTE) {
            Some(raw) if !raw.trim().is_empty() => {
                raw.split_whitespace().map(str::to_string).collect()
            }
            _ => self.dimensions.clone(),
        }
    }
}

/// The full set of groups and variables of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataTree {
    /// Dimension sizes keyed by absolute dimension path (`/group/name`).
    #[serde(default)]
    pub dimensions: BTreeMap<String, usize>,
    nodes: Vec<TreeNode>,
}

impl Default for MetadataTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataTree {
    /// An empty tree holding only the root group.
    pub fn new() -> Self {
        Self {
            dimensions: BTreeMap::new(),
            nodes: vec![TreeNode::group(path::ROOT)],
        }
    }

    /// Builds a tree from nodes in traversal order, adding the root group if missing.
    pub fn from_nodes(nodes: Vec<TreeNode>) -> Result<Self> {
        let mut tree = Self {
            dimensions: BTreeMap::new(),
            nodes: Vec::with_capacity(nodes.len() + 1),
        };
        for node in nodes {
            tree.insert(node)?;
        }
        if !tree.contains(path::ROOT) {
            tree.nodes.insert(0, TreeNode::group(path::ROOT));
        }
        Ok(tree)
    }

    /// Re-checks paths after deserialization.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for node in &self.nodes {
            let normalized = path::normalize(&node.path)?;
            if normalized != node.path {
                return Err(ModelError::InvalidPath {
                    path: node.path.clone(),
                    message: "path is not normalized".to_string(),
                });
            }
            if !seen.insert(node.path.as_str()) {
                return Err(ModelError::DuplicatePath {
                    path: node.path.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, mut node: TreeNode) -> Result<()> {
        node.path = path::normalize(&node.path)?;
        if self.contains(&node.path) {
            return Err(ModelError::DuplicatePath { path: node.path });
        }
        self.nodes.push(node);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    pub fn node(&self, path: &str) -> Option<&TreeNode> {
        self.nodes.iter().find(|node| node.path == path)
    }

    pub fn node_mut(&mut self, path: &str) -> Option<&mut TreeNode> {
        self.nodes.iter_mut().find(|node| node.path == path)
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.node(path::ROOT)
    }

    pub fn root_mut(&mut self) -> Option<&mut TreeNode> {
        self.node_mut(path::ROOT)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Paths in traversal order.
    pub fn paths(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.path.clone()).collect()
    }

    pub fn set_dimension_size(&mut self, dimension_path: &str, size: usize) {
        self.dimensions.insert(dimension_path.to_string(), size);
    }

    /// Groups searched when resolving names from `path`, nearest first.
    ///
    /// A group searches itself first; a variable starts at its parent group.
    pub fn scope_groups(&self, path: &str) -> Vec<String> {
        let mut groups = Vec::new();
        if self.node(path).is_some_and(TreeNode::is_group) {
            groups.push(path.to_string());
        }
        groups.extend(path::ancestors(path).into_iter().map(str::to_string));
        groups
    }

    /// Candidate absolute paths for a reference written on the node at `from`.
    pub fn reference_candidates(&self, from: &str, reference: &str) -> Vec<String> {
        if reference.starts_with('/') {
            return path::normalize(reference).into_iter().collect();
        }
        self.scope_groups(from)
            .iter()
            .map(|group| path::join(group, reference))
            .collect()
    }

    /// Resolves a relative or absolute reference to an existing node path.
    pub fn resolve_reference(&self, from: &str, reference: &str) -> Option<String> {
        self.reference_candidates(from, reference)
            .into_iter()
            .find(|candidate| self.contains(candidate))
    }

    /// Size of the dimension `name` as seen from `from`, searching enclosing groups.
    pub fn dimension_size(&self, from: &str, name: &str) -> Option<usize> {
        if name.starts_with('/') {
            return self.dimensions.get(name).copied();
        }
        self.scope_groups(from)
            .iter()
            .find_map(|group| self.dimensions.get(&path::join(group, name)).copied())
    }

    /// Removes temporary attributes from every node.
    pub fn strip_temporary_attributes(&mut self) -> usize {
        self.nodes
            .iter_mut()
            .map(|node| node.attributes.strip_temporary())
            .sum()
    }
}
