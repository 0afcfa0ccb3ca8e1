use std::collections::HashMap;

use anyhow::Context;
use parking_lot::Mutex;

/// Where the board keeps its state between sessions
///
/// Values are JSON documents, keyed by name.
pub trait KvBackend: Send + Sync {
    /// `Ok(None)` if there is nothing under `key`
    fn load(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;

    fn store(&self, key: &str, value: &serde_json::Value) -> anyhow::Result<()>;

    fn remove(&self, key: &str);
}

/// In-process backend, forgetting everything on drop
#[derive(Debug, Default)]
pub struct MemoryKv {
    values: Mutex<HashMap<String, serde_json::Value>>,
    fail_writes: Mutex<bool>,
}

impl MemoryKv {
    pub fn new() -> MemoryKv {
        MemoryKv::default()
    }

    /// Make every subsequent `store` fail, until called again with `false`
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Put raw data under `key`, bypassing write failures
    pub fn seed(&self, key: &str, value: serde_json::Value) {
        self.values.lock().insert(String::from(key), value);
    }
}

impl KvBackend for MemoryKv {
    fn load(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn store(&self, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        if *self.fail_writes.lock() {
            anyhow::bail!("simulated write failure for key {key:?}");
        }
        self.values.lock().insert(String::from(key), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

/// The browser's `localStorage`
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageKv;

#[cfg(target_arch = "wasm32")]
impl KvBackend for LocalStorageKv {
    fn load(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        use gloo_storage::{errors::StorageError, LocalStorage, Storage};
        match LocalStorage::get(key) {
            Ok(v) => Ok(Some(v)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("{e}"))
                .with_context(|| format!("reading key {key:?} from local storage")),
        }
    }

    fn store(&self, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        use gloo_storage::{LocalStorage, Storage};
        LocalStorage::set(key, value)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("writing key {key:?} to local storage"))
    }

    fn remove(&self, key: &str) {
        use gloo_storage::{LocalStorage, Storage};
        LocalStorage::delete(key);
    }
}

/// Load `key` and parse it as a `T`
pub(crate) fn load_as<T: serde::de::DeserializeOwned>(
    backend: &impl KvBackend,
    key: &str,
) -> anyhow::Result<Option<T>> {
    backend
        .load(key)?
        .map(|v| {
            serde_json::from_value(v)
                .with_context(|| format!("parsing value of key {key:?}"))
        })
        .transpose()
}
