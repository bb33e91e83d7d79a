//! Equality index for one (label, property) pair
//!
//! Keys are the canonical string form of the property value, so `30` and
//! `"30"` land in the same bucket. Each bucket keeps node ids in insertion
//! order without duplicates.

use crate::graph::{Label, Node, NodeId, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index for a specific property on a specific label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyIndex {
    /// Stringified value -> node ids
    entries: BTreeMap<String, Vec<NodeId>>,
}

impl PropertyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index by scanning every node carrying `label` and `property`
    pub fn build(nodes: &[Node], label: &Label, property: &str) -> Self {
        let mut index = Self::new();
        for node in nodes {
            index.index_node(node, label, property);
        }
        index
    }

    /// Add `node` if it carries `label` and `property`; true when the index changed
    pub fn index_node(&mut self, node: &Node, label: &Label, property: &str) -> bool {
        if !node.has_label(label) {
            return false;
        }
        match node.get_property(property) {
            Some(value) => self.insert(value, node.id.clone()),
            None => false,
        }
    }

    /// Insert a node id under `value`; true when it was not already present
    pub fn insert(&mut self, value: &PropertyValue, node_id: NodeId) -> bool {
        let ids = self.entries.entry(value.to_key_string()).or_default();
        if ids.contains(&node_id) {
            return false;
        }
        ids.push(node_id);
        true
    }

    /// Insert under an already stringified key
    pub(crate) fn insert_key(&mut self, key: String, node_id: NodeId) {
        let ids = self.entries.entry(key).or_default();
        if !ids.contains(&node_id) {
            ids.push(node_id);
        }
    }

    /// Node ids recorded for `value`
    pub fn get(&self, value: &PropertyValue) -> &[NodeId] {
        self.entries
            .get(&value.to_key_string())
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
