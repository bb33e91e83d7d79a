//! Node implementation for the property graph
//!
//! A node carries an opaque id, an ordered list of labels and an
//! insertion-ordered property map. The serialized shape is exactly what ends up
//! in `nodes.json`.

use super::property::{properties_match, PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};

/// A node in the property graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Labels in creation order
    #[serde(default)]
    pub labels: Vec<Label>,

    /// Properties associated with this node
    #[serde(default)]
    pub properties: PropertyMap,
}

impl Node {
    /// Create a new node with a fresh id and a single label
    pub fn new(label: impl Into<Label>) -> Self {
        Node {
            id: NodeId::generate(),
            labels: vec![label.into()],
            properties: PropertyMap::new(),
        }
    }

    /// Create a new node with a fresh id, one label and the given properties
    pub fn with_properties(label: impl Into<Label>, properties: PropertyMap) -> Self {
        Node {
            id: NodeId::generate(),
            labels: vec![label.into()],
            properties,
        }
    }

    /// Build a node from existing parts (used when loading or in tests)
    pub fn from_parts(id: NodeId, labels: Vec<Label>, properties: PropertyMap) -> Self {
        Node {
            id,
            labels,
            properties,
        }
    }

    /// Add a label unless already present
    pub fn add_label(&mut self, label: impl Into<Label>) {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Set a property value
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.properties.insert(key.into(), value.into())
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Check if property exists
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// True when the node carries `label` (if given) and every required property
    pub fn matches(&self, label: Option<&Label>, required: &PropertyMap) -> bool {
        label.map_or(true, |l| self.has_label(l)) && properties_match(&self.properties, required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_node() {
        let node = Node::new("Person");
        assert_eq!(node.labels, vec![Label::new("Person")]);
        assert!(node.has_label(&Label::new("Person")));
        assert!(node.properties.is_empty());
    }

    #[test]
    fn test_labels_stay_ordered_and_unique() {
        let mut node = Node::new("Person");
        node.add_label("Employee");
        node.add_label("Person");
        assert_eq!(node.labels, vec![Label::new("Person"), Label::new("Employee")]);
    }

    #[test]
    fn test_properties() {
        let mut node = Node::new("Person");
        node.set_property("name", "Alice");
        node.set_property("age", 30i64);

        assert_eq!(node.get_property("name").unwrap().as_string(), Some("Alice"));
        assert_eq!(node.get_property("age").unwrap().as_integer(), Some(30));
        assert!(node.has_property("name"));
        assert!(!node.has_property("email"));
    }

    #[test]
    fn test_serialized_shape() {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "Alice".into());
        let node = Node::from_parts(NodeId::new("n1"), vec![Label::new("Person")], props);

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "n1", "labels": ["Person"], "properties": {"name": "Alice"}})
        );
    }

    #[test]
    fn test_matches_label_and_property_subset() {
        let mut node = Node::new("Person");
        node.set_property("name", "Alice");
        node.set_property("age", 30i64);

        let mut subset = PropertyMap::new();
        subset.insert("name".to_string(), "Alice".into());
        assert!(node.matches(Some(&Label::new("Person")), &subset));
        assert!(node.matches(None, &PropertyMap::new()));
        assert!(!node.matches(Some(&Label::new("City")), &subset));

        subset.insert("age".to_string(), 31i64.into());
        assert!(!node.matches(Some(&Label::new("Person")), &subset));
    }
}
