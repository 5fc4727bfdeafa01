//! Store Registry
//!
//! Process-scoped, init-once owner of the shared store. Every cache layer
//! built from a (re)loaded configuration asks the registry for its store and
//! receives the same handle, so cached responses survive reloads.

use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{MemoryStore, SharedStore};
use crate::config::{Config, StoreEnv};
use crate::error::{CacheError, Result};

/// The settings that shape the store itself and cannot change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StoreSettings {
    max_size: u64,
    store_env: StoreEnv,
}

impl From<&Config> for StoreSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_size: config.max_size,
            store_env: config.store_env,
        }
    }
}

#[derive(Debug)]
struct Provisioned {
    settings: StoreSettings,
    store: SharedStore,
}

/// Holds at most one store for the lifetime of the process.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    slot: Mutex<Option<Provisioned>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store for `config`, creating it on first use.
    ///
    /// Later calls must carry the same store settings (`max_size`,
    /// `store_env`); settings that only affect request handling, such as the
    /// default TTL, may change freely between reloads.
    pub fn provision(&self, config: &Config) -> Result<SharedStore> {
        config.validate()?;
        let settings = StoreSettings::from(config);

        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CacheError::Internal("store registry lock poisoned".to_string()))?;

        if let Some(provisioned) = slot.as_ref() {
            if provisioned.settings != settings {
                return Err(CacheError::Config(
                    "the configuration of the cache store cannot be changed without restarting the server"
                        .to_string(),
                ));
            }
            debug!("Reusing provisioned cache store");
            return Ok(provisioned.store.clone());
        }

        let store = Arc::new(RwLock::new(MemoryStore::new(settings.max_size)));
        info!(
            "Cache store provisioned: env={}, max_size={} bytes",
            settings.store_env, settings.max_size
        );
        *slot = Some(Provisioned {
            settings,
            store: store.clone(),
        });
        Ok(store)
    }

    /// Returns true once a store has been provisioned.
    pub fn is_provisioned(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Releases the registry's handle; called on process shutdown.
    pub fn teardown(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            if slot.take().is_some() {
                info!("Cache store released");
            }
        }
    }
}
