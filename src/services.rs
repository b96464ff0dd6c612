//! Composition root: the one settings store and messenger of the process
//!
//! The store is built on first use. Concurrent first callers block until the
//! single construction finishes and then share the same instance.

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

use crate::config::{CodecRegistry, ConfigPaths, SettingsStore};
use crate::data::DataLocator;
use crate::messaging::Messenger;

pub type SharedStore = Arc<Mutex<SettingsStore>>;

pub struct Services {
    paths: ConfigPaths,
    resource_dir: Option<PathBuf>,
    store: OnceCell<SharedStore>,
    messenger: Arc<Messenger>,
}

impl Services {
    pub fn new(paths: ConfigPaths, resource_dir: Option<PathBuf>) -> Self {
        Self {
            paths,
            resource_dir,
            store: OnceCell::new(),
            messenger: Arc::new(Messenger::new()),
        }
    }

    /// The settings store, built on first call.
    /// A failed build is returned to the caller and retried on the next call.
    pub fn store(&self) -> Result<SharedStore> {
        self.store
            .get_or_try_init(|| {
                info!(dir = %self.paths.settings_dir().display(), "Initializing settings store");
                let data = match &self.resource_dir {
                    Some(dir) => DataLocator::with_resource_directory(dir.clone()),
                    None => DataLocator::locate(self.paths.settings_dir()),
                };
                let store =
                    SettingsStore::open(self.paths.clone(), data, CodecRegistry::with_defaults())?;
                Ok::<_, anyhow::Error>(Arc::new(Mutex::new(store)))
            })
            .cloned()
    }

    pub fn messenger(&self) -> Arc<Messenger> {
        Arc::clone(&self.messenger)
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }
}

/// Lock the store, recovering from a poisoned lock
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, SettingsStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
