//! Persisted client configuration.
//!
//! Config lives next to the history in device storage. A missing or
//! unreadable entry yields the defaults; it is never fatal at startup.

use huddle_core::ports::KeyValuePort;
use huddle_types::{config::HuddleConfig, Result};

pub const CONFIG_STORAGE_KEY: &str = "huddle:config";

pub fn load_config(storage: &dyn KeyValuePort) -> HuddleConfig {
    let raw = match storage.get(CONFIG_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return HuddleConfig::default(),
        Err(e) => {
            log::warn!("Could not read config: {}", e);
            return HuddleConfig::default();
        }
    };
    match serde_json::from_str::<HuddleConfig>(&raw) {
        Ok(config) => {
            log::info!("Config restored from {}", storage.backend_name());
            config
        }
        Err(e) => {
            log::warn!("Ignoring unreadable config: {}", e);
            HuddleConfig::default()
        }
    }
}

pub fn save_config(storage: &dyn KeyValuePort, config: &HuddleConfig) -> Result<()> {
    let json = serde_json::to_string(config)?;
    storage.set(CONFIG_STORAGE_KEY, &json)?;
    log::info!("Config saved");
    Ok(())
}
