//! Property indexing
//!
//! Equality indexes keyed by (label, property), persisted per database.

pub mod manager;
pub mod property_index;

pub use manager::{IndexCatalog, IndexManager};
pub use property_index::PropertyIndex;
