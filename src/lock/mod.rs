//! Per-resource mutual exclusion
//!
//! A [`LockRegistry`] maps resource ids to mutexes, created on first use and
//! kept for the registry's lifetime. Acquiring returns a [`ResourceGuard`] that
//! owns its lock, so release happens on drop along every exit path.
//!
//! Mutating query handlers lock the collection resources they rewrite
//! ([`NODES`], [`RELATIONSHIPS`], [`INDEXES`]) in that order.

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Resource id of the node collection
pub const NODES: &str = "nodes";
/// Resource id of the relationship collection
pub const RELATIONSHIPS: &str = "relationships";
/// Resource id of the index file
pub const INDEXES: &str = "indexes";

/// Every collection resource, in acquisition order
pub const ALL_COLLECTIONS: [&str; 3] = [NODES, RELATIONSHIPS, INDEXES];

/// Lock table keyed by resource id
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, resource_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(resource_id.to_string()).or_default())
    }

    /// Block until the lock for `resource_id` is held
    pub fn acquire(&self, resource_id: &str) -> ResourceGuard {
        // The table mutex is released before blocking on the resource itself
        let lock = self.lock_for(resource_id);
        let guard = lock.lock_arc();
        trace!("Acquired lock on '{}'", resource_id);
        ResourceGuard {
            resource_id: resource_id.to_string(),
            _guard: guard,
        }
    }

    /// Take the lock only if it is free
    pub fn try_acquire(&self, resource_id: &str) -> Option<ResourceGuard> {
        let lock = self.lock_for(resource_id);
        let guard = lock.try_lock_arc()?;
        Some(ResourceGuard {
            resource_id: resource_id.to_string(),
            _guard: guard,
        })
    }

    /// Acquire several resources in sorted order, skipping duplicates
    pub fn acquire_many(&self, resource_ids: &[&str]) -> Vec<ResourceGuard> {
        let mut ids: Vec<&str> = resource_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|id| self.acquire(id)).collect()
    }

    /// Acquire the given collection resources in the fixed collection order
    pub(crate) fn acquire_collections(&self, resource_ids: &[&str]) -> Vec<ResourceGuard> {
        ALL_COLLECTIONS
            .iter()
            .filter(|id| resource_ids.contains(id))
            .map(|id| self.acquire(id))
            .collect()
    }

    /// Number of resources registered so far
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRegistry")
            .field("resources", &self.len())
            .finish()
    }
}

/// Exclusive hold on one resource, released when dropped
pub struct ResourceGuard {
    resource_id: String,
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl ResourceGuard {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Release the lock now
    pub fn release(self) {
        trace!("Released lock on '{}'", self.resource_id);
    }
}

impl fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("resource_id", &self.resource_id)
            .finish()
    }
}
