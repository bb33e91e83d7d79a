//! Whole-file JSON storage for the node and relationship collections
//!
//! Each collection lives in a single file inside the database directory and is
//! rewritten in full on every save. Saves write a sibling temporary file and
//! rename it over the target, so a concurrent reader sees either the old or
//! the new collection.

use crate::graph::{Node, Relationship};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// File holding the node collection
pub const NODES_FILE: &str = "nodes.json";
/// File holding the relationship collection
pub const RELATIONSHIPS_FILE: &str = "relationships.json";
/// File holding every property index of a database
pub const INDEXES_FILE: &str = "indexes.json";
/// File holding the password digest written at database creation
pub const PASSWORD_FILE: &str = "password.txt";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON encoding or decoding error
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        StorageError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File-backed storage for one database directory
#[derive(Debug, Clone)]
pub struct GraphStorage {
    dir: PathBuf,
    pretty: bool,
}

impl GraphStorage {
    /// Storage rooted at `dir`, writing indented JSON
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            pretty: true,
        }
    }

    /// Choose between indented and compact JSON output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Database directory this storage reads and writes
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn nodes_path(&self) -> PathBuf {
        self.dir.join(NODES_FILE)
    }

    pub fn relationships_path(&self) -> PathBuf {
        self.dir.join(RELATIONSHIPS_FILE)
    }

    /// Load every node; a missing file means an empty collection
    pub fn load_nodes(&self) -> StorageResult<Vec<Node>> {
        load_collection(&self.nodes_path())
    }

    /// Overwrite the node collection
    pub fn save_nodes(&self, nodes: &[Node]) -> StorageResult<()> {
        debug!("Saving {} nodes to {:?}", nodes.len(), self.dir);
        write_json(&self.nodes_path(), nodes, self.pretty)
    }

    /// Load every relationship; a missing file means an empty collection
    pub fn load_relationships(&self) -> StorageResult<Vec<Relationship>> {
        load_collection(&self.relationships_path())
    }

    /// Overwrite the relationship collection
    pub fn save_relationships(&self, relationships: &[Relationship]) -> StorageResult<()> {
        debug!(
            "Saving {} relationships to {:?}",
            relationships.len(),
            self.dir
        );
        write_json(&self.relationships_path(), relationships, self.pretty)
    }
}

/// Read a JSON file into a raw value
///
/// Returns `None` when the file does not exist or holds only whitespace.
pub(crate) fn read_json_value(path: &Path) -> StorageResult<Option<serde_json::Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| StorageError::json(path, e))
}

fn load_collection<T: DeserializeOwned>(path: &Path) -> StorageResult<Vec<T>> {
    match read_json_value(path)? {
        None => Ok(Vec::new()),
        // Freshly created databases may carry an empty object placeholder
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value).map_err(|e| StorageError::json(path, e)),
    }
}

/// Serialize `value` and atomically replace `path` with it
pub(crate) fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> StorageResult<()> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .map_err(|e| StorageError::json(path, e))?;
    write_atomic(path, &bytes)
}

/// Write `bytes` to a temporary sibling of `path`, then rename it into place
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(StorageError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_are_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = GraphStorage::new(temp_dir.path().join("db"));
        assert!(storage.load_nodes().unwrap().is_empty());
        assert!(storage.load_relationships().unwrap().is_empty());
    }

    #[test]
    fn test_placeholder_and_blank_files_are_empty() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(NODES_FILE), "{}").unwrap();
        fs::write(temp_dir.path().join(RELATIONSHIPS_FILE), "  \n").unwrap();

        let storage = GraphStorage::new(temp_dir.path());
        assert!(storage.load_nodes().unwrap().is_empty());
        assert!(storage.load_relationships().unwrap().is_empty());
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let storage = GraphStorage::new(temp_dir.path().join("nested").join("db"));

        let mut alice = Node::new("Person");
        alice.set_property("name", "Alice");
        alice.set_property("score", 9.5);
        let bob = Node::new("Person");
        let rel = Relationship::new(alice.id.clone(), bob.id.clone(), "KNOWS");

        storage.save_nodes(&[alice.clone(), bob.clone()]).unwrap();
        storage.save_relationships(&[rel.clone()]).unwrap();

        assert_eq!(storage.load_nodes().unwrap(), vec![alice, bob]);
        assert_eq!(storage.load_relationships().unwrap(), vec![rel]);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let storage = GraphStorage::new(temp_dir.path()).with_pretty(false);
        storage.save_nodes(&[Node::new("A")]).unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![NODES_FILE.to_string()]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(NODES_FILE), "[{").unwrap();
        let storage = GraphStorage::new(temp_dir.path());
        assert!(matches!(storage.load_nodes(), Err(StorageError::Json { .. })));
    }

    #[test]
    fn test_loads_externally_written_ids() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(NODES_FILE),
            r#"[{"id": "abc", "labels": ["City"], "properties": {"name": "Paris"}}]"#,
        )
        .unwrap();
        let nodes = GraphStorage::new(temp_dir.path()).load_nodes().unwrap();
        assert_eq!(nodes[0].id, NodeId::new("abc"));
    }
}
