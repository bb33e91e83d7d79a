//! Database handle
//!
//! Binds a database directory to its configuration, lock registry and
//! transaction manager. While a transaction is active every query runs against
//! the workspace copy. Queries hold the transaction gate for reading, so
//! `begin`, `commit` and `rollback` never switch directories under a running
//! query.

use crate::config::{ConfigError, DatabaseConfig};
use crate::graph::{Label, NodeId, PropertyValue};
use crate::index::IndexManager;
use crate::lock::{LockRegistry, ALL_COLLECTIONS, INDEXES, NODES};
use crate::persistence::{CatalogError, GraphStorage, StorageError};
use crate::query::{ExecutionError, ExecutionResult, QueryExecutor, QueryResponse, QueryResult};
use crate::transaction::{TransactionError, TransactionManager, TransactionResult};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::{info, warn};

/// Errors surfaced by the database handle
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Handle on one database directory
///
/// The handle is `Send + Sync`; threads that need mutual exclusion on writes
/// must share the same handle, since locks live in it.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    config: DatabaseConfig,
    locks: LockRegistry,
    transactions: TransactionManager,
    txn_gate: RwLock<()>,
}

impl Database {
    /// Open (creating if needed) the database at `path`
    ///
    /// A workspace left behind by a handle that is no longer running is
    /// rolled back; one still owned by a live handle is left alone.
    pub fn open(path: impl AsRef<Path>, config: DatabaseConfig) -> DatabaseResult<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path).map_err(|e| StorageError::io(&path, e))?;

        let transactions = TransactionManager::new(&path, &config.workspace_dir);
        transactions.recover_abandoned()?;

        info!("Opened database at {:?}", path);
        Ok(Self {
            path,
            config,
            locks: LockRegistry::new(),
            transactions,
            txn_gate: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Storage for the directory queries currently target
    pub fn storage(&self) -> GraphStorage {
        GraphStorage::new(self.transactions.target_dir()).with_pretty(self.config.pretty_json)
    }

    fn index_manager(&self) -> IndexManager {
        IndexManager::new(self.transactions.target_dir()).with_pretty(self.config.pretty_json)
    }

    /// Run a query, probing indexes when `use_index` is set
    pub fn execute(&self, query: &str, use_index: bool) -> ExecutionResult<QueryResult> {
        let _gate = self.txn_gate.read();
        let dir = self.transactions.target_dir();
        QueryExecutor::with_config(dir, &self.locks, &self.config).execute(query, use_index)
    }

    /// Run a query with the configured index preference
    pub fn query(&self, query: &str) -> ExecutionResult<QueryResult> {
        self.execute(query, self.config.use_index_by_default)
    }

    /// Run a query and return its wire response
    pub fn execute_response(&self, query: &str, use_index: bool) -> QueryResponse {
        self.execute(query, use_index).into()
    }

    pub fn begin(&self) -> TransactionResult<()> {
        let _gate = self.txn_gate.write();
        let _guards = self.locks.acquire_collections(&ALL_COLLECTIONS);
        self.transactions.begin()
    }

    pub fn commit(&self) -> TransactionResult<()> {
        let _gate = self.txn_gate.write();
        let _guards = self.locks.acquire_collections(&ALL_COLLECTIONS);
        self.transactions.commit()
    }

    pub fn rollback(&self) -> TransactionResult<()> {
        let _gate = self.txn_gate.write();
        let _guards = self.locks.acquire_collections(&ALL_COLLECTIONS);
        self.transactions.rollback()
    }

    pub fn in_transaction(&self) -> bool {
        self.transactions.is_active()
    }

    /// Build (or rebuild) the index on `label.property`
    pub fn create_index(&self, label: &Label, property: &str) -> DatabaseResult<usize> {
        let _gate = self.txn_gate.read();
        let _guards = self.locks.acquire_collections(&[NODES, INDEXES]);
        Ok(self.index_manager().create_index(label, property)?)
    }

    /// Raw index probe; an empty result means "no index entry", not "no nodes"
    pub fn find_nodes_with_index(
        &self,
        label: &Label,
        property: &str,
        value: &PropertyValue,
    ) -> Vec<NodeId> {
        let _gate = self.txn_gate.read();
        self.index_manager().find_nodes(label, property, value)
    }

    pub fn list_indexes(&self) -> Vec<(Label, String)> {
        let _gate = self.txn_gate.read();
        self.index_manager().list_indexes()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.transactions.is_active() {
            warn!("Database handle dropped with an active transaction; rolling back");
            if let Err(e) = self.transactions.rollback() {
                warn!("Rollback on drop failed: {}", e);
            }
        }
    }
}

// Handle-less callers share one lock registry per database directory
static SHARED_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<LockRegistry>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn shared_locks(path: &Path) -> Arc<LockRegistry> {
    let key = fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf());
    let mut registries = SHARED_LOCKS.lock();
    Arc::clone(registries.entry(key).or_default())
}

/// Run one query against the database directory at `database_path`
///
/// Never fails: errors come back as `{"error": ...}` responses.
pub fn execute_query(
    query: &str,
    database_path: impl AsRef<Path>,
    use_index: bool,
) -> QueryResponse {
    let path = database_path.as_ref();
    let locks = shared_locks(path);
    QueryExecutor::new(path, &locks)
        .execute(query, use_index)
        .into()
}
