//! Copy-based transactions
//!
//! A transaction works on copies of a database's collections in a workspace
//! directory. Commit copies them back over the primary files; rollback throws
//! them away.

pub mod manager;

pub use manager::{
    cleanup_transaction, TransactionError, TransactionManager, TransactionResult, TransactionState,
    TRANSACTION_FILES,
};
