//! `window.localStorage` backend.
//! Persistent across page reloads, scoped to the origin, string values only.

use huddle_core::ports::KeyValuePort;
use huddle_types::{HuddleError, Result};

pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| HuddleError::Storage("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| HuddleError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| HuddleError::Storage("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValuePort for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| HuddleError::Storage(format!("{:?}", e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Fails when the origin quota is exhausted
        self.storage
            .set_item(key, value)
            .map_err(|e| HuddleError::Storage(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| HuddleError::Storage(format!("{:?}", e)))
    }

    fn backend_name(&self) -> &str {
        "localStorage"
    }
}
