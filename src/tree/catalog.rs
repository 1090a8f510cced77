//! Immutable lookup table of decision nodes.
//!
//! A [`TreeCatalog`] is validated once at construction and never mutated
//! afterwards. Every `next_node_id` is guaranteed to resolve, so walkers
//! built on a catalog can only ever stand on existing nodes.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use super::types::DecisionNode;
use crate::error::{CatalogError, CatalogResult};

const BUILTIN_CATALOG: &str = include_str!("../../assets/default_catalog.json");

/// On-disk catalog layout.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    root: String,
    nodes: Vec<DecisionNode>,
}

/// Validated decision tree.
#[derive(Debug, Clone)]
pub struct TreeCatalog {
    nodes: Vec<DecisionNode>,
    index: HashMap<String, usize>,
    root_index: usize,
}

impl TreeCatalog {
    /// Build a catalog from nodes, validating every structural invariant.
    ///
    /// # Errors
    /// Returns [`CatalogError::Integrity`] on duplicate ids, a missing root,
    /// malformed leaves or branches, out-of-range confidences, or a dangling
    /// `next_node_id`.
    pub fn new(root_id: impl Into<String>, nodes: Vec<DecisionNode>) -> CatalogResult<Self> {
        let root_id = root_id.into();

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(integrity(format!("duplicate node id '{}'", node.id)));
            }
        }

        let root_index = *index
            .get(&root_id)
            .ok_or_else(|| integrity(format!("root node '{}' is not defined", root_id)))?;

        for node in &nodes {
            validate_shape(node)?;
        }

        for node in &nodes {
            for option in &node.options {
                match &option.next_node_id {
                    Some(next) if !index.contains_key(next) => {
                        return Err(integrity(format!(
                            "option '{}' of node '{}' points to unknown node '{}'",
                            option.id, node.id, next
                        )));
                    }
                    Some(_) => {}
                    None => warn!(
                        node_id = %node.id,
                        option_id = %option.id,
                        "Dead-end option: selecting it ends the session without a solution"
                    ),
                }
            }
        }

        Ok(Self {
            nodes,
            index,
            root_index,
        })
    }

    /// Parse and validate a catalog from its JSON form.
    pub fn from_json_str(json: &str) -> CatalogResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.root, file.nodes)
    }

    /// Load and validate a catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            nodes = catalog.len(),
            leaves = catalog.leaf_count(),
            "Decision tree catalog loaded"
        );
        Ok(catalog)
    }

    /// The bundled equipment fault tree.
    pub fn builtin() -> CatalogResult<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Look up a node by id.
    pub fn get_node(&self, id: &str) -> CatalogResult<&DecisionNode> {
        self.index
            .get(id)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| CatalogError::NotFound {
                node_id: id.to_string(),
            })
    }

    /// The designated root node.
    pub fn root(&self) -> &DecisionNode {
        &self.nodes[self.root_index]
    }

    /// Identifier of the root node.
    pub fn root_id(&self) -> &str {
        &self.root().id
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a constructed catalog, the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of leaf nodes.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf).count()
    }
}

fn integrity(message: String) -> CatalogError {
    CatalogError::Integrity { message }
}

fn validate_shape(node: &DecisionNode) -> CatalogResult<()> {
    if node.is_leaf {
        if node.solution.is_none() {
            return Err(integrity(format!("leaf '{}' has no solution", node.id)));
        }
        if !node.options.is_empty() {
            return Err(integrity(format!("leaf '{}' must not have options", node.id)));
        }
    } else {
        if node.options.is_empty() {
            return Err(integrity(format!(
                "node '{}' is not a leaf but has no options",
                node.id
            )));
        }
        if node.solution.is_some() {
            return Err(integrity(format!(
                "node '{}' is not a leaf but carries a solution",
                node.id
            )));
        }
    }

    if !(0.0..=1.0).contains(&node.confidence) {
        return Err(integrity(format!(
            "node '{}' confidence {} is outside [0, 1]",
            node.id, node.confidence
        )));
    }

    let mut seen = HashSet::new();
    for option in &node.options {
        if !(0.0..=1.0).contains(&option.confidence) {
            return Err(integrity(format!(
                "option '{}' of node '{}' confidence {} is outside [0, 1]",
                option.id, node.id, option.confidence
            )));
        }
        if !seen.insert(option.id.as_str()) {
            return Err(integrity(format!(
                "node '{}' has duplicate option id '{}'",
                node.id, option.id
            )));
        }
    }

    Ok(())
}
