//! Tessera Graph Store
//!
//! A single-node, file-persisted property graph store queried through a small
//! Cypher-style pattern language.
//!
//! # Architecture
//!
//! - `graph`: entity model (nodes, relationships, scalar property values)
//! - `persistence`: whole-file JSON storage and the named-database catalog
//! - `index`: label + property equality indexes kept in `indexes.json`
//! - `query`: PEG grammar, typed AST and the CREATE / MATCH handlers
//! - `lock`: per-resource mutual exclusion with scoped guards
//! - `transaction`: copy-based workspaces with commit / rollback
//! - `database`: the handle tying a directory, its config, locks and transaction together
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tessera::{Database, DatabaseConfig};
//!
//! let db = Database::open("databases/social", DatabaseConfig::default()).unwrap();
//! db.execute(r#"CREATE (a:Person {name: "Alice"})-[:KNOWS]->(b:Person {name: "Bob"})"#, true)
//!     .unwrap();
//!
//! let result = db.execute("MATCH (a:Person)-[:KNOWS]->(b:Person) RETURN a, b", true).unwrap();
//! assert_eq!(result.relationships.len(), 1);
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod graph;
pub mod index;
pub mod lock;
pub mod persistence;
pub mod query;
pub mod transaction;

// Re-export main types for convenience
pub use config::{ConfigError, DatabaseConfig};

pub use database::{execute_query, Database, DatabaseError, DatabaseResult};

pub use graph::{
    Label, Node, NodeId, PropertyMap, PropertyValue, RelType, Relationship, RelationshipId,
};

pub use index::{IndexCatalog, IndexManager, PropertyIndex};

pub use lock::{LockRegistry, ResourceGuard};

pub use persistence::{
    CatalogError, CatalogResult, DatabaseCatalog, GraphStorage, StorageError, StorageResult,
};

pub use query::{
    parse_properties, parse_statement, ExecutionError, ExecutionResult, ParseError, QueryResponse,
    QueryResult, Statement,
};

pub use transaction::{TransactionError, TransactionManager, TransactionResult, TransactionState};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, env!("CARGO_PKG_VERSION"));
    }
}
