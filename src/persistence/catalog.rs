//! Named database directories under a common root
//!
//! A database is a directory holding `nodes.json`, `relationships.json`,
//! `indexes.json` and `password.txt`. The catalog only creates and locates
//! these directories; verifying the password digest is left to callers.

use super::storage::{
    write_atomic, StorageError, INDEXES_FILE, NODES_FILE, PASSWORD_FILE, RELATIONSHIPS_FILE,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Name is empty or contains path separators
    #[error("Invalid database name: {0}")]
    InvalidName(String),

    /// Database already exists
    #[error("Database already exists: {0}")]
    AlreadyExists(String),

    /// Database not found
    #[error("Database not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Creates, opens and lists databases below a root directory
#[derive(Debug, Clone)]
pub struct DatabaseCatalog {
    root: PathBuf,
}

impl DatabaseCatalog {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a database with this name lives in (whether or not it exists)
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create a new database with empty collections and the given password digest
    pub fn create_database(&self, name: &str, password_digest: &str) -> CatalogResult<PathBuf> {
        validate_name(name)?;
        let path = self.path_for(name);
        if path.exists() {
            return Err(CatalogError::AlreadyExists(name.to_string()));
        }
        fs::create_dir_all(&path).map_err(|e| StorageError::io(&path, e))?;

        write_atomic(&path.join(NODES_FILE), b"[]")?;
        write_atomic(&path.join(RELATIONSHIPS_FILE), b"[]")?;
        write_atomic(&path.join(INDEXES_FILE), b"{}")?;
        write_atomic(&path.join(PASSWORD_FILE), password_digest.as_bytes())?;

        info!("Created database '{}' at {:?}", name, path);
        Ok(path)
    }

    /// Path of an existing database
    pub fn open(&self, name: &str) -> CatalogResult<PathBuf> {
        validate_name(name)?;
        let path = self.path_for(name);
        if !path.is_dir() {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    /// Stored password digest of an existing database
    pub fn password_digest(&self, name: &str) -> CatalogResult<String> {
        let path = self.open(name)?.join(PASSWORD_FILE);
        let digest = fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))?;
        Ok(digest.trim().to_string())
    }

    /// Names of every database under the root, sorted
    pub fn list(&self) -> CatalogResult<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.root, e).into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> CatalogResult<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(CatalogError::InvalidName(name.to_string()));
    }
    Ok(())
}
