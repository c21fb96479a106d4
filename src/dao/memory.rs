//! In-memory [`StateStore`] backend for tests and headless previews.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::dao::{
    storage::StorageResult,
    store::{StateStore, merge_blobs},
};

/// Volatile store keeping blobs in a process-local map.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let entries = self.entries.clone();
        let key = key.to_owned();
        Box::pin(async move {
            let guard = entries.lock().await;
            Ok(guard.get(&key).cloned())
        })
    }

    fn set(&self, key: &str, blob: String) -> BoxFuture<'static, StorageResult<()>> {
        let entries = self.entries.clone();
        let key = key.to_owned();
        Box::pin(async move {
            entries.lock().await.insert(key, blob);
            Ok(())
        })
    }

    fn merge(&self, key: &str, patch: String) -> BoxFuture<'static, StorageResult<()>> {
        let entries = self.entries.clone();
        let key = key.to_owned();
        Box::pin(async move {
            let mut guard = entries.lock().await;
            let merged = merge_blobs(guard.get(&key).map(String::as_str), &patch);
            guard.insert(key, merged);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemoryStore::new();
        store.set("k", r#"{"a":1}"#.into()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn merge_patches_existing_blob() {
        let store = MemoryStore::new();
        store.set("k", r#"{"a":1,"b":2}"#.into()).await.unwrap();
        store.merge("k", r#"{"b":3}"#.into()).await.unwrap();
        let raw = store.get("k").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], 3);
    }
}
