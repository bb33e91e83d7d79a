//! Persistence layer
//!
//! - `storage`: whole-file JSON collections with atomic replacement
//! - `catalog`: named database directories under a root

pub mod catalog;
pub mod storage;

pub use catalog::{CatalogError, CatalogResult, DatabaseCatalog};
pub use storage::{
    GraphStorage, StorageError, StorageResult, INDEXES_FILE, NODES_FILE, PASSWORD_FILE,
    RELATIONSHIPS_FILE,
};
