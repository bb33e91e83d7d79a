//! Transaction state machine: Idle -> Active -> Idle
//!
//! The workspace carries an owner marker (process id and handle id). Only the
//! handle named in the marker may commit or discard it, and recovery on open
//! leaves workspaces whose owner is still running alone.

use crate::persistence::storage::write_atomic;
use crate::persistence::{StorageError, INDEXES_FILE, NODES_FILE, RELATIONSHIPS_FILE};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Files copied into and out of the workspace
pub const TRANSACTION_FILES: [&str; 3] = [NODES_FILE, RELATIONSHIPS_FILE, INDEXES_FILE];

/// Owner marker written into every workspace
pub const OWNER_FILE: &str = "owner.json";

// Handles in this process with a transaction in flight
static LIVE_HANDLES: LazyLock<Mutex<HashSet<String>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Transaction errors
#[derive(Error, Debug)]
pub enum TransactionError {
    /// A transaction (or a leftover workspace) is already present
    #[error("Transaction already active")]
    AlreadyActive,

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type TransactionResult<T> = Result<T, TransactionError>;

/// Transaction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct WorkspaceOwner {
    pid: u32,
    handle: String,
}

impl WorkspaceOwner {
    fn read(workspace: &Path) -> Option<Self> {
        let text = fs::read_to_string(workspace.join(OWNER_FILE)).ok()?;
        serde_json::from_str(&text).ok()
    }

    fn is_alive(&self) -> bool {
        if self.pid == process::id() {
            return LIVE_HANDLES.lock().contains(&self.handle);
        }
        process_alive(self.pid)
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// Without a cheap liveness check, assume the owner is still running.
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Single-transaction manager for one database directory
#[derive(Debug)]
pub struct TransactionManager {
    db_dir: PathBuf,
    workspace_name: String,
    workspace: PathBuf,
    owner: WorkspaceOwner,
    state: Mutex<TransactionState>,
}

impl TransactionManager {
    pub fn new(db_dir: impl AsRef<Path>, workspace_name: &str) -> Self {
        let db_dir = db_dir.as_ref().to_path_buf();
        let workspace = db_dir.join(workspace_name);
        Self {
            db_dir,
            workspace_name: workspace_name.to_string(),
            workspace,
            owner: WorkspaceOwner {
                pid: process::id(),
                handle: Uuid::new_v4().to_string(),
            },
            state: Mutex::new(TransactionState::Idle),
        }
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    pub fn workspace_path(&self) -> &Path {
        &self.workspace
    }

    /// Directory queries should target right now
    pub fn target_dir(&self) -> &Path {
        if self.is_active() {
            &self.workspace
        } else {
            &self.db_dir
        }
    }

    /// Copy the primary collections into a fresh workspace
    ///
    /// The workspace is assembled under a hidden name and renamed into place,
    /// so it never exists without its owner marker.
    pub fn begin(&self) -> TransactionResult<()> {
        let mut state = self.state.lock();
        if *state == TransactionState::Active || self.workspace.exists() {
            return Err(TransactionError::AlreadyActive);
        }

        let staging = self.db_dir.join(format!(
            ".{}.{}.tmp",
            self.workspace_name,
            Uuid::new_v4().simple()
        ));
        LIVE_HANDLES.lock().insert(self.owner.handle.clone());
        if let Err(e) = self.stage_workspace(&staging) {
            LIVE_HANDLES.lock().remove(&self.owner.handle);
            let _ = cleanup_transaction(&staging);
            if self.workspace.exists() {
                return Err(TransactionError::AlreadyActive);
            }
            return Err(e);
        }

        *state = TransactionState::Active;
        info!("Transaction started in {:?}", self.workspace);
        Ok(())
    }

    fn stage_workspace(&self, staging: &Path) -> TransactionResult<()> {
        fs::create_dir_all(staging).map_err(|e| StorageError::io(staging, e))?;
        let marker = serde_json::to_vec(&self.owner)
            .map_err(|e| StorageError::json(&staging.join(OWNER_FILE), e))?;
        write_atomic(&staging.join(OWNER_FILE), &marker)?;
        copy_files(&self.db_dir, staging)?;
        fs::rename(staging, &self.workspace).map_err(|e| StorageError::io(&self.workspace, e))?;
        Ok(())
    }

    /// True when the workspace on disk is the one this handle created
    fn owns_workspace(&self) -> bool {
        WorkspaceOwner::read(&self.workspace).is_some_and(|owner| owner == self.owner)
    }

    /// Return to Idle; drop the workspace only if it is ours or an unowned fragment
    fn finish(&self, state: &mut TransactionState) -> TransactionResult<()> {
        let result = match WorkspaceOwner::read(&self.workspace) {
            Some(owner) if owner != self.owner => Ok(()),
            _ => cleanup_transaction(&self.workspace),
        };
        *state = TransactionState::Idle;
        LIVE_HANDLES.lock().remove(&self.owner.handle);
        result
    }

    /// Copy the workspace collections over the primary files and drop the workspace
    ///
    /// Fails with `NoActiveTransaction` when the workspace was removed or
    /// replaced behind this handle's back; nothing is copied in that case.
    pub fn commit(&self) -> TransactionResult<()> {
        let mut state = self.state.lock();
        if *state != TransactionState::Active {
            return Err(TransactionError::NoActiveTransaction);
        }
        if !self.owns_workspace() {
            warn!(
                "Transaction workspace {:?} is gone or owned elsewhere; nothing committed",
                self.workspace
            );
            self.finish(&mut state)?;
            return Err(TransactionError::NoActiveTransaction);
        }

        copy_files(&self.workspace, &self.db_dir)?;
        self.finish(&mut state)?;
        info!("Transaction committed to {:?}", self.db_dir);
        Ok(())
    }

    /// Discard the workspace
    pub fn rollback(&self) -> TransactionResult<()> {
        let mut state = self.state.lock();
        if *state != TransactionState::Active {
            return Err(TransactionError::NoActiveTransaction);
        }

        self.finish(&mut state)?;
        info!("Transaction rolled back in {:?}", self.db_dir);
        Ok(())
    }

    /// Remove a workspace left behind by a handle that never finished its transaction
    ///
    /// Returns true when one was removed. A workspace whose owner is still
    /// running is left in place.
    pub fn recover_abandoned(&self) -> TransactionResult<bool> {
        let state = self.state.lock();
        if *state == TransactionState::Active || !self.workspace.exists() {
            return Ok(false);
        }
        if let Some(owner) = WorkspaceOwner::read(&self.workspace) {
            if owner.is_alive() {
                debug!(
                    "Workspace {:?} belongs to a running transaction (pid {})",
                    self.workspace, owner.pid
                );
                return Ok(false);
            }
        }
        warn!(
            "Rolling back abandoned transaction workspace {:?}",
            self.workspace
        );
        cleanup_transaction(&self.workspace)?;
        Ok(true)
    }
}

/// Remove every file in a workspace, then the workspace itself
pub fn cleanup_transaction(workspace: &Path) -> TransactionResult<()> {
    let entries = match fs::read_dir(workspace) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StorageError::io(workspace, e).into()),
    };

    for entry in entries {
        let path = entry.map_err(|e| StorageError::io(workspace, e))?.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| StorageError::io(&path, e))?;
    }
    fs::remove_dir(workspace).map_err(|e| StorageError::io(workspace, e))?;
    debug!("Removed workspace {:?}", workspace);
    Ok(())
}

fn copy_files(from: &Path, to: &Path) -> TransactionResult<()> {
    for name in TRANSACTION_FILES {
        let src = from.join(name);
        let bytes = match fs::read(&src) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StorageError::io(&src, e).into()),
        };
        write_atomic(&to.join(name), &bytes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TransactionManager) {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(NODES_FILE), "[]").unwrap();
        let manager = TransactionManager::new(temp_dir.path(), "transaction_temp");
        (temp_dir, manager)
    }

    #[test]
    fn test_begin_copies_existing_files() {
        let (temp_dir, manager) = setup();
        manager.begin().unwrap();

        assert!(manager.is_active());
        let workspace = temp_dir.path().join("transaction_temp");
        assert_eq!(manager.target_dir(), workspace.as_path());
        assert!(workspace.join(NODES_FILE).exists());
        // Missing primary files are skipped
        assert!(!workspace.join(RELATIONSHIPS_FILE).exists());
    }

    #[test]
    fn test_second_begin_rejected() {
        let (_temp_dir, manager) = setup();
        manager.begin().unwrap();
        assert!(matches!(manager.begin(), Err(TransactionError::AlreadyActive)));
    }

    #[test]
    fn test_commit_and_rollback_require_active() {
        let (_temp_dir, manager) = setup();
        assert!(matches!(
            manager.commit(),
            Err(TransactionError::NoActiveTransaction)
        ));
        assert!(matches!(
            manager.rollback(),
            Err(TransactionError::NoActiveTransaction)
        ));
    }

    #[test]
    fn test_commit_copies_back() {
        let (temp_dir, manager) = setup();
        manager.begin().unwrap();
        fs::write(manager.workspace_path().join(NODES_FILE), "[1]").unwrap();
        fs::write(manager.workspace_path().join(RELATIONSHIPS_FILE), "[2]").unwrap();

        manager.commit().unwrap();
        assert_eq!(manager.state(), TransactionState::Idle);
        assert_eq!(fs::read_to_string(temp_dir.path().join(NODES_FILE)).unwrap(), "[1]");
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(RELATIONSHIPS_FILE)).unwrap(),
            "[2]"
        );
        assert!(!manager.workspace_path().exists());
    }

    #[test]
    fn test_rollback_discards() {
        let (temp_dir, manager) = setup();
        manager.begin().unwrap();
        fs::write(manager.workspace_path().join(NODES_FILE), "[1]").unwrap();

        manager.rollback().unwrap();
        assert_eq!(fs::read_to_string(temp_dir.path().join(NODES_FILE)).unwrap(), "[]");
        assert!(!manager.workspace_path().exists());
    }

    #[test]
    fn test_abandoned_workspace_blocks_begin_until_recovered() {
        let (temp_dir, manager) = setup();
        let workspace = temp_dir.path().join("transaction_temp");
        fs::create_dir_all(&workspace).unwrap();
        fs::write(workspace.join(NODES_FILE), "[]").unwrap();

        assert!(matches!(manager.begin(), Err(TransactionError::AlreadyActive)));
        assert!(manager.recover_abandoned().unwrap());
        assert!(!workspace.exists());
        assert!(!manager.recover_abandoned().unwrap());
        manager.begin().unwrap();
    }

    #[test]
    fn test_begin_writes_owner_marker() {
        let (_temp_dir, manager) = setup();
        manager.begin().unwrap();
        let owner = WorkspaceOwner::read(manager.workspace_path()).unwrap();
        assert_eq!(owner, manager.owner);
        assert!(owner.is_alive());

        manager.commit().unwrap();
        assert!(!owner.is_alive());
    }

    #[test]
    fn test_live_workspace_survives_recovery() {
        let (temp_dir, manager) = setup();
        manager.begin().unwrap();
        fs::write(manager.workspace_path().join(NODES_FILE), "[1]").unwrap();

        let other = TransactionManager::new(temp_dir.path(), "transaction_temp");
        assert!(!other.recover_abandoned().unwrap());
        assert!(manager.workspace_path().exists());
        assert!(matches!(other.begin(), Err(TransactionError::AlreadyActive)));

        manager.commit().unwrap();
        assert_eq!(fs::read_to_string(temp_dir.path().join(NODES_FILE)).unwrap(), "[1]");
    }

    #[test]
    fn test_workspace_of_finished_handle_is_recovered() {
        let (temp_dir, manager) = setup();
        let workspace = temp_dir.path().join("transaction_temp");
        fs::create_dir_all(&workspace).unwrap();
        let marker = WorkspaceOwner {
            pid: process::id(),
            handle: "finished-handle".to_string(),
        };
        fs::write(workspace.join(OWNER_FILE), serde_json::to_vec(&marker).unwrap()).unwrap();

        assert!(manager.recover_abandoned().unwrap());
        assert!(!workspace.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_workspace_of_exited_process_is_recovered() {
        let (temp_dir, manager) = setup();
        let workspace = temp_dir.path().join("transaction_temp");
        fs::create_dir_all(&workspace).unwrap();
        let marker = WorkspaceOwner {
            pid: u32::MAX,
            handle: "exited".to_string(),
        };
        fs::write(workspace.join(OWNER_FILE), serde_json::to_vec(&marker).unwrap()).unwrap();

        assert!(manager.recover_abandoned().unwrap());
    }

    #[test]
    fn test_commit_refuses_removed_workspace() {
        let (temp_dir, manager) = setup();
        manager.begin().unwrap();
        fs::remove_dir_all(manager.workspace_path()).unwrap();
        // A later write recreates the directory without a marker
        fs::create_dir_all(manager.workspace_path()).unwrap();
        fs::write(manager.workspace_path().join(NODES_FILE), "[9]").unwrap();

        assert!(matches!(
            manager.commit(),
            Err(TransactionError::NoActiveTransaction)
        ));
        assert_eq!(manager.state(), TransactionState::Idle);
        assert_eq!(fs::read_to_string(temp_dir.path().join(NODES_FILE)).unwrap(), "[]");
        assert!(!manager.workspace_path().exists());
    }

    #[test]
    fn test_commit_leaves_foreign_workspace_alone() {
        let (temp_dir, manager) = setup();
        manager.begin().unwrap();
        fs::remove_dir_all(manager.workspace_path()).unwrap();

        let other = TransactionManager::new(temp_dir.path(), "transaction_temp");
        other.begin().unwrap();
        assert!(matches!(
            manager.commit(),
            Err(TransactionError::NoActiveTransaction)
        ));
        assert!(other.workspace_path().exists());
        other.rollback().unwrap();
    }

    #[test]
    fn test_cleanup_missing_workspace_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        cleanup_transaction(&temp_dir.path().join("nope")).unwrap();
    }
}
