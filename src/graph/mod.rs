//! Property graph data model
//!
//! Nodes with ordered labels and properties, directed typed relationships, and
//! the scalar property values both carry.

pub mod node;
pub mod property;
pub mod relationship;
pub mod types;

// Re-export main types
pub use node::Node;
pub use property::{properties_match, PropertyMap, PropertyValue};
pub use relationship::Relationship;
pub use types::{Label, NodeId, RelType, RelationshipId};
