//! Storage abstraction layer for Glaive.
//!
//! The index layer treats its storage backend as a black box that hands out
//! fixed-size slots (one per term, posting or record) and scoped handles
//! (one per open cursor). Backends can be swapped without touching the
//! dictionary, posting store or cursors.
//!
//! # Architecture
//!
//! - **Storage trait**: slot reservation and handle bookkeeping
//! - **StorageConfig enum**: type-safe configuration for supported backends
//! - **StorageFactory**: helper for constructing concrete storage instances
//!
//! # Example
//!
//! ```
//! use glaive::storage::memory::MemoryStorageConfig;
//! use glaive::storage::{SlotKind, StorageConfig, StorageFactory};
//!
//! # fn main() -> glaive::error::Result<()> {
//! let config = MemoryStorageConfig {
//!     max_posting_slots: Some(2),
//!     ..Default::default()
//! };
//! let storage = StorageFactory::create(StorageConfig::Memory(config))?;
//!
//! storage.reserve(&[(SlotKind::Posting, 2)])?;
//! assert!(storage.reserve(&[(SlotKind::Posting, 1)]).is_err());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod memory;

/// Kind of fixed-size slot handed out by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// One lexicon entry.
    Term,
    /// One posting in a posting list.
    Posting,
    /// One record of a keyed table.
    Record,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Term => write!(f, "term"),
            SlotKind::Posting => write!(f, "posting"),
            SlotKind::Record => write!(f, "record"),
        }
    }
}

/// A scoped storage handle owned by exactly one cursor.
///
/// Handles are not `Clone`: releasing one consumes it, so a handle can be
/// given back to the backend at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct StorageHandle {
    id: u64,
    label: String,
}

impl StorageHandle {
    pub(crate) fn new(id: u64, label: String) -> Self {
        StorageHandle { id, label }
    }

    /// Backend-assigned handle id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// What the handle was acquired for (table or index name).
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Slot and handle usage of a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Term slots in use.
    pub term_slots: usize,
    /// Posting slots in use.
    pub posting_slots: usize,
    /// Record slots in use.
    pub record_slots: usize,
    /// Handles acquired and not yet released.
    pub open_handles: usize,
    /// Handles acquired over the lifetime of the backend.
    pub handles_acquired: u64,
}

impl StorageStats {
    /// Slots in use for the given kind.
    pub fn slots(&self, kind: SlotKind) -> usize {
        match kind {
            SlotKind::Term => self.term_slots,
            SlotKind::Posting => self.posting_slots,
            SlotKind::Record => self.record_slots,
        }
    }
}

/// A trait for storage backends the index layer allocates from.
pub trait Storage: Send + Sync + fmt::Debug {
    /// Reserve slots for every `(kind, count)` request.
    ///
    /// Reservation is all-or-nothing: when any request cannot be satisfied
    /// this returns [`crate::error::GlaiveError::StorageExhausted`] and
    /// nothing is reserved.
    fn reserve(&self, requests: &[(SlotKind, usize)]) -> Result<()>;

    /// Give `count` slots of `kind` back to the backend.
    fn release(&self, kind: SlotKind, count: usize);

    /// Acquire a scoped handle for a cursor.
    fn acquire_handle(&self, label: &str) -> Result<StorageHandle>;

    /// Release a handle acquired from this backend.
    fn release_handle(&self, handle: StorageHandle) -> Result<()>;

    /// Current usage.
    fn stats(&self) -> StorageStats;
}

/// A handle slot owned by a cursor.
///
/// [`ScopedHandle::release`] gives the handle back at most once; a release
/// failure is logged and swallowed so closing a cursor can never fail.
/// Dropping the slot releases the handle if the owner did not.
#[derive(Debug)]
pub struct ScopedHandle {
    storage: Arc<dyn Storage>,
    handle: Option<StorageHandle>,
}

impl ScopedHandle {
    /// Acquire a handle from `storage`.
    pub fn acquire(storage: Arc<dyn Storage>, label: &str) -> Result<Self> {
        let handle = storage.acquire_handle(label)?;
        Ok(ScopedHandle {
            storage,
            handle: Some(handle),
        })
    }

    /// Whether the handle is still held.
    pub fn is_held(&self) -> bool {
        self.handle.is_some()
    }

    /// Release the handle. Idempotent.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            let (id, label) = (handle.id(), handle.label().to_string());
            if let Err(e) = self.storage.release_handle(handle) {
                warn!("failed to release storage handle {id} for {label}: {e}");
            }
        }
    }
}

impl Drop for ScopedHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// In-memory backend with optional capacity limits.
    Memory(memory::MemoryStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory(memory::MemoryStorageConfig::default())
    }
}

/// Factory for creating storage backends from configuration.
pub struct StorageFactory;

impl StorageFactory {
    /// Create a storage backend.
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::Memory(memory_config) => {
                Ok(Arc::new(memory::MemoryStorage::new(memory_config)))
            }
        }
    }
}
