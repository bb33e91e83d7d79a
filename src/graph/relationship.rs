//! Relationship implementation for the property graph
//!
//! Relationships are directed from `start_node` to `end_node`. Endpoints are
//! plain id references and are not validated when stored.

use super::property::{properties_match, PropertyMap, PropertyValue};
use super::types::{NodeId, RelType, RelationshipId};
use serde::{Deserialize, Serialize};

/// A directed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier for this relationship
    pub id: RelationshipId,

    /// Source node ID
    pub start_node: NodeId,

    /// Target node ID
    pub end_node: NodeId,

    /// Relationship type
    #[serde(rename = "type")]
    pub rel_type: RelType,

    /// Properties associated with this relationship
    #[serde(default)]
    pub properties: PropertyMap,
}

impl Relationship {
    /// Create a new relationship with a fresh id
    pub fn new(start_node: NodeId, end_node: NodeId, rel_type: impl Into<RelType>) -> Self {
        Relationship {
            id: RelationshipId::generate(),
            start_node,
            end_node,
            rel_type: rel_type.into(),
            properties: PropertyMap::new(),
        }
    }

    /// Create a new relationship with properties
    pub fn with_properties(
        start_node: NodeId,
        end_node: NodeId,
        rel_type: impl Into<RelType>,
        properties: PropertyMap,
    ) -> Self {
        Relationship {
            id: RelationshipId::generate(),
            start_node,
            end_node,
            rel_type: rel_type.into(),
            properties,
        }
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

    /// True when the relationship has `rel_type` (if given) and every required property
    pub fn matches(&self, rel_type: Option<&RelType>, required: &PropertyMap) -> bool {
        rel_type.map_or(true, |t| &self.rel_type == t)
            && properties_match(&self.properties, required)
    }
}
