//! Key-value persistence for the stored credential.
//!
//! The session store only needs `get`, `set` and `remove` on string values.
//! Three backends are provided:
//! - `MemoryStore`: process-local, used in tests and for throwaway sessions
//! - `FileStore`: a JSON object on disk in the cache directory
//! - `KeyringStore`: the OS keychain via the `keyring` crate
//!
//! Backends report I/O failures as errors; the session store logs them and
//! carries on as if the value were absent.

pub mod file;
pub mod keychain;
pub mod memory;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use self::file::FileStore;
pub use self::keychain::KeyringStore;
pub use self::memory::MemoryStore;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Which backend holds the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Keyring,
}

/// File name of the `FileStore` inside the cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Service name used for keychain entries
const KEYRING_SERVICE: &str = "nyc360";

/// Open the configured backend.
pub fn open(backend: StorageBackend, cache_dir: &Path) -> Arc<dyn KeyValueStore> {
    match backend {
        StorageBackend::Memory => Arc::new(MemoryStore::default()),
        StorageBackend::File => Arc::new(FileStore::new(cache_dir.join(CREDENTIALS_FILE))),
        StorageBackend::Keyring => Arc::new(KeyringStore::new(KEYRING_SERVICE)),
    }
}
