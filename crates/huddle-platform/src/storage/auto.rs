//! Pick the storage backend.
//!
//! Priority for `Auto`: localStorage → Memory (fallback).

use std::rc::Rc;
use huddle_core::ports::KeyValuePort;
use huddle_types::config::StorageBackendType;
use super::{LocalStorage, MemoryStorage};

/// Open the requested backend, degrading to memory when it is unavailable.
/// Returns a trait object so callers are backend-agnostic.
pub fn open_storage(backend: StorageBackendType) -> Rc<dyn KeyValuePort> {
    if backend == StorageBackendType::Memory {
        log::info!("Storage backend: memory");
        return Rc::new(MemoryStorage::new());
    }
    match LocalStorage::open() {
        Ok(local) => {
            log::info!("Storage backend: localStorage");
            Rc::new(local)
        }
        Err(e) => {
            log::warn!("localStorage unavailable ({}), falling back to memory", e);
            Rc::new(MemoryStorage::new())
        }
    }
}
