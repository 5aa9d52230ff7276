//! In-memory storage implementation.

use ahash::AHashSet;
use log::trace;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::storage::{SlotKind, Storage, StorageHandle, StorageStats};

/// Capacity limits for [`MemoryStorage`]. `None` means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStorageConfig {
    /// Maximum number of term slots.
    pub max_term_slots: Option<usize>,
    /// Maximum number of posting slots.
    pub max_posting_slots: Option<usize>,
    /// Maximum number of record slots.
    pub max_record_slots: Option<usize>,
    /// Maximum number of simultaneously open handles.
    pub max_open_handles: Option<usize>,
}

impl MemoryStorageConfig {
    fn limit(&self, kind: SlotKind) -> Option<usize> {
        match kind {
            SlotKind::Term => self.max_term_slots,
            SlotKind::Posting => self.max_posting_slots,
            SlotKind::Record => self.max_record_slots,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    stats: StorageStats,
    open: AHashSet<u64>,
    next_handle_id: u64,
}

/// An in-memory storage backend that only does slot accounting.
///
/// The index structures themselves live in ordinary Rust collections; this
/// backend decides whether they may grow and tracks the handles cursors hold.
#[derive(Debug)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
    config: MemoryStorageConfig,
}

impl MemoryStorage {
    /// Create a new memory storage.
    pub fn new(config: MemoryStorageConfig) -> Self {
        MemoryStorage {
            state: Mutex::new(MemoryState::default()),
            config,
        }
    }

    /// Create a new memory storage without capacity limits.
    pub fn new_default() -> Self {
        Self::new(MemoryStorageConfig::default())
    }

    /// The configuration this backend was created with.
    pub fn config(&self) -> &MemoryStorageConfig {
        &self.config
    }
}

fn slots_mut(stats: &mut StorageStats, kind: SlotKind) -> &mut usize {
    match kind {
        SlotKind::Term => &mut stats.term_slots,
        SlotKind::Posting => &mut stats.posting_slots,
        SlotKind::Record => &mut stats.record_slots,
    }
}

impl Storage for MemoryStorage {
    fn reserve(&self, requests: &[(SlotKind, usize)]) -> Result<()> {
        let mut state = self.state.lock();

        // Check everything first so a failed request reserves nothing.
        for kind in [SlotKind::Term, SlotKind::Posting, SlotKind::Record] {
            let requested: usize = requests
                .iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, count)| *count)
                .sum();
            if let Some(limit) = self.config.limit(kind) {
                let used = state.stats.slots(kind);
                if used.saturating_add(requested) > limit {
                    return Err(GlaiveError::storage_exhausted(format!(
                        "{requested} {kind} slot(s) requested, {used} of {limit} in use"
                    )));
                }
            }
        }

        for &(kind, count) in requests {
            *slots_mut(&mut state.stats, kind) += count;
        }
        Ok(())
    }

    fn release(&self, kind: SlotKind, count: usize) {
        let mut state = self.state.lock();
        let slots = slots_mut(&mut state.stats, kind);
        *slots = slots.saturating_sub(count);
    }

    fn acquire_handle(&self, label: &str) -> Result<StorageHandle> {
        let mut state = self.state.lock();
        if let Some(limit) = self.config.max_open_handles {
            if state.open.len() >= limit {
                return Err(GlaiveError::storage_exhausted(format!(
                    "cannot open handle for {label}: {limit} handle(s) already open"
                )));
            }
        }

        state.next_handle_id += 1;
        let id = state.next_handle_id;
        state.open.insert(id);
        state.stats.open_handles = state.open.len();
        state.stats.handles_acquired += 1;
        trace!("acquired storage handle {id} for {label}");

        Ok(StorageHandle::new(id, label.to_string()))
    }

    fn release_handle(&self, handle: StorageHandle) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open.remove(&handle.id()) {
            return Err(GlaiveError::storage(format!(
                "handle {} for {} is not open",
                handle.id(),
                handle.label()
            )));
        }
        state.stats.open_handles = state.open.len();
        trace!("released storage handle {} for {}", handle.id(), handle.label());
        Ok(())
    }

    fn stats(&self) -> StorageStats {
        self.state.lock().stats.clone()
    }
}
