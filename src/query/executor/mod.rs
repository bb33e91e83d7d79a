//! Statement execution against one database directory
//!
//! The executor owns no state besides paths and settings: every call reads the
//! collections it needs from disk and writes back whole files. Mutations take
//! the collection locks they rewrite from the shared [`LockRegistry`].

mod create;
mod matcher;

use super::ast::{CreateIndexClause, Statement};
use super::parser::{parse_statement, ParseError};
use super::result::QueryResult;
use crate::config::DatabaseConfig;
use crate::index::IndexManager;
use crate::lock::{LockRegistry, INDEXES, NODES};
use crate::persistence::{GraphStorage, StorageError};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Query rejected by the parser
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// WHERE references a variable the pattern does not bind
    #[error("Variable mismatch in WHERE clause")]
    VariableMismatch,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Runs statements against the collections of one directory
pub struct QueryExecutor<'a> {
    storage: GraphStorage,
    indexes: IndexManager,
    locks: &'a LockRegistry,
    maintain_indexes: bool,
}

impl<'a> QueryExecutor<'a> {
    /// Executor with default settings
    pub fn new(dir: &Path, locks: &'a LockRegistry) -> Self {
        Self::with_config(dir, locks, &DatabaseConfig::default())
    }

    pub fn with_config(dir: &Path, locks: &'a LockRegistry, config: &DatabaseConfig) -> Self {
        Self {
            storage: GraphStorage::new(dir).with_pretty(config.pretty_json),
            indexes: IndexManager::new(dir).with_pretty(config.pretty_json),
            locks,
            maintain_indexes: config.maintain_indexes,
        }
    }

    /// Parse and run one query string
    pub fn execute(&self, query: &str, use_index: bool) -> ExecutionResult<QueryResult> {
        let statement = parse_statement(query)?;
        self.execute_statement(&statement, use_index)
    }

    /// Run an already parsed statement
    pub fn execute_statement(
        &self,
        statement: &Statement,
        use_index: bool,
    ) -> ExecutionResult<QueryResult> {
        match statement {
            Statement::CreateIndex(clause) => {
                debug!("Dispatching CREATE INDEX on {:?}", self.storage.dir());
                self.create_index(clause)
            }
            Statement::Create(clause) => {
                debug!("Dispatching CREATE on {:?}", self.storage.dir());
                self.execute_create(clause)
            }
            Statement::Match(clause) => {
                debug!(
                    "Dispatching MATCH on {:?} (use_index={})",
                    self.storage.dir(),
                    use_index
                );
                self.execute_match(clause, use_index)
            }
        }
    }

    fn create_index(&self, clause: &CreateIndexClause) -> ExecutionResult<QueryResult> {
        let _guards = self.locks.acquire_collections(&[NODES, INDEXES]);
        self.indexes.create_index(&clause.label, &clause.property)?;
        Ok(QueryResult::new(format!(
            "Index created for :{} on property '{}'",
            clause.label, clause.property
        )))
    }
}
