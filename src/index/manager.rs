//! Manager for persisted property indices
//!
//! Every index of a database lives in `indexes.json`, shaped
//! `{label: {property: {value: [node ids]}}}`. Reads are tolerant: a missing
//! file, label or property yields nothing, and malformed parts are logged and
//! skipped so a damaged index never blocks a query (callers fall back to a scan).

use super::property_index::PropertyIndex;
use crate::graph::{Label, Node, NodeId, PropertyValue};
use crate::persistence::storage::{read_json_value, write_json, INDEXES_FILE};
use crate::persistence::{GraphStorage, StorageResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Every index of one database, keyed by label then property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexCatalog {
    indexes: BTreeMap<String, BTreeMap<String, PropertyIndex>>,
}

impl IndexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw JSON document, dropping (and logging) malformed parts
    pub fn from_value(value: &Value) -> Self {
        let mut catalog = Self::new();
        let Some(labels) = value.as_object() else {
            warn!("Invalid index format: expected an object at the top level");
            return catalog;
        };

        for (label, props) in labels {
            let Some(props) = props.as_object() else {
                warn!("Invalid index format for label '{}': expected an object", label);
                continue;
            };
            for (prop, entries) in props {
                let Some(entries) = entries.as_object() else {
                    warn!("Invalid property index for prop '{}': expected an object", prop);
                    continue;
                };
                let index = catalog.entry(label, prop);
                for (key, ids) in entries {
                    let Some(ids) = ids.as_array() else {
                        warn!("Invalid id list in index {}.{} for '{}'", label, prop, key);
                        continue;
                    };
                    for id in ids.iter().filter_map(Value::as_str) {
                        index.insert_key(key.clone(), NodeId::new(id));
                    }
                }
            }
        }
        catalog
    }

    pub fn get(&self, label: &str, property: &str) -> Option<&PropertyIndex> {
        self.indexes.get(label).and_then(|props| props.get(property))
    }

    pub fn contains(&self, label: &str, property: &str) -> bool {
        self.get(label, property).is_some()
    }

    /// Replace the index for (label, property)
    pub fn set(&mut self, label: &str, property: &str, index: PropertyIndex) {
        self.indexes
            .entry(label.to_string())
            .or_default()
            .insert(property.to_string(), index);
    }

    fn entry(&mut self, label: &str, property: &str) -> &mut PropertyIndex {
        self.indexes
            .entry(label.to_string())
            .or_default()
            .entry(property.to_string())
            .or_default()
    }

    /// Defined (label, property) pairs, sorted
    pub fn definitions(&self) -> Vec<(Label, String)> {
        self.indexes
            .iter()
            .flat_map(|(label, props)| {
                props
                    .keys()
                    .map(move |prop| (Label::new(label.clone()), prop.clone()))
            })
            .collect()
    }

    /// Add `node` to every defined index it qualifies for; true when anything changed
    pub fn index_node(&mut self, node: &Node) -> bool {
        let mut changed = false;
        for (label, props) in self.indexes.iter_mut() {
            let label = Label::new(label.clone());
            for (prop, index) in props.iter_mut() {
                changed |= index.index_node(node, &label, prop);
            }
        }
        changed
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

/// Reads and writes the index file of one database directory
#[derive(Debug, Clone)]
pub struct IndexManager {
    dir: PathBuf,
    pretty: bool,
}

impl IndexManager {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEXES_FILE)
    }

    /// Load every index; unreadable or malformed content yields an empty catalog
    pub fn load(&self) -> IndexCatalog {
        match read_json_value(&self.index_path()) {
            Ok(Some(value)) => IndexCatalog::from_value(&value),
            Ok(None) => IndexCatalog::new(),
            Err(e) => {
                warn!("Ignoring unreadable index file: {}", e);
                IndexCatalog::new()
            }
        }
    }

    pub fn save(&self, catalog: &IndexCatalog) -> StorageResult<()> {
        write_json(&self.index_path(), catalog, self.pretty)
    }

    /// Build the (label, property) index from the full node collection and persist it
    ///
    /// Other indexes in the file are preserved. Returns the number of distinct
    /// values indexed.
    pub fn create_index(&self, label: &Label, property: &str) -> StorageResult<usize> {
        let nodes = GraphStorage::new(&self.dir).load_nodes()?;
        let index = PropertyIndex::build(&nodes, label, property);
        let distinct = index.len();

        let mut catalog = self.load();
        catalog.set(label.as_str(), property, index);
        self.save(&catalog)?;

        info!(
            "Index created for :{} on property '{}' ({} distinct values)",
            label, property, distinct
        );
        Ok(distinct)
    }

    /// Node ids recorded for `value`; empty when the file, label or property is absent
    pub fn find_nodes(&self, label: &Label, property: &str, value: &PropertyValue) -> Vec<NodeId> {
        let raw = match read_json_value(&self.index_path()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Ignoring unreadable index file: {}", e);
                return Vec::new();
            }
        };

        let Some(label_indexes) = raw.get(label.as_str()) else {
            return Vec::new();
        };
        if !label_indexes.is_object() {
            warn!("Invalid index format for label '{}': expected an object", label);
            return Vec::new();
        }
        let Some(prop_index) = label_indexes.get(property) else {
            return Vec::new();
        };
        if !prop_index.is_object() {
            warn!("Invalid property index for prop '{}': expected an object", property);
            return Vec::new();
        }

        let key = value.to_key_string();
        match prop_index.get(&key) {
            Some(Value::Array(ids)) => ids
                .iter()
                .filter_map(Value::as_str)
                .map(NodeId::new)
                .collect(),
            Some(_) => {
                warn!("Invalid id list in index {}.{} for '{}'", label, property, key);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Add freshly created nodes to every index already defined for their labels
    pub fn index_nodes(&self, nodes: &[Node]) -> StorageResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let mut catalog = self.load();
        if catalog.is_empty() {
            return Ok(());
        }

        let mut changed = false;
        for node in nodes {
            changed |= catalog.index_node(node);
        }
        if changed {
            debug!("Updated indexes for {} new nodes", nodes.len());
            self.save(&catalog)?;
        }
        Ok(())
    }

    pub fn has_index(&self, label: &Label, property: &str) -> bool {
        self.load().contains(label.as_str(), property)
    }

    pub fn list_indexes(&self) -> Vec<(Label, String)> {
        self.load().definitions()
    }
}
