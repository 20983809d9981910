pub mod disk;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

/// A thread-safe key-value store that can hold multiple collections.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Arc<Keyspace>>,
}

impl KeyValueStore {
    /// Opens the on-disk keyspace under `data_path`. Persistent collections are
    /// unavailable if the keyspace cannot be opened.
    pub fn open(data_path: &Path) -> Self {
        let keyspace = match fjall::Config::new(data_path.join("drafts")).open() {
            Ok(keyspace) => Some(Arc::new(keyspace)),
            Err(e) => {
                warn!(error = %e, path = %data_path.display(), "Failed to open local store");
                None
            }
        };

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    /// A store without a disk backend; every collection lives in memory.
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }
}

impl Store for KeyValueStore {
    fn get_collection(&self, name: &str, persist: bool) -> Option<Arc<dyn KeyValueCollection>> {
        if let Some(existing) = self.collections.read().ok()?.get(name) {
            return Some(Arc::clone(existing));
        }

        let mut collections = self.collections.write().ok()?;
        if let Some(existing) = collections.get(name) {
            return Some(Arc::clone(existing));
        }

        let collection: Arc<dyn KeyValueCollection> = if persist {
            let keyspace = self.keyspace.as_ref()?;
            let partition = keyspace
                .open_partition(name, PartitionCreateOptions::default())
                .map_err(|e| warn!(error = %e, collection = name, "Failed to open partition"))
                .ok()?;
            Arc::new(DiskCollection::new(Arc::clone(keyspace), partition))
        } else {
            Arc::new(MemoryCollection::new())
        };

        debug!(collection = name, persist, "Opened collection");
        collections.insert(name.to_string(), Arc::clone(&collection));
        Some(collection)
    }
}
