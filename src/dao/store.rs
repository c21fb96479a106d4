use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use serde_json::Value;

/// Abstraction over durable storage of string-keyed JSON blobs.
///
/// The core persists one blob per logical key and never reads it back except
/// at startup, so the contract is deliberately small: whole-blob get/set plus
/// a shallow merge used to patch a single field without rewriting the rest.
pub trait StateStore: Send + Sync {
    /// Fetch the blob stored under `key`, if any.
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Overwrite the blob stored under `key`.
    fn set(&self, key: &str, blob: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Shallow-merge `patch` into the blob stored under `key`.
    ///
    /// Top-level keys in `patch` replace the matching keys in the stored
    /// object; all other stored fields are left untouched. When nothing is
    /// stored yet (or the stored blob is not a JSON object) the patch becomes
    /// the new blob.
    fn merge(&self, key: &str, patch: String) -> BoxFuture<'static, StorageResult<()>>;
}

/// Shallow JSON-object merge shared by the store backends.
pub(crate) fn merge_blobs(existing: Option<&str>, patch: &str) -> String {
    let Ok(Value::Object(patch_map)) = serde_json::from_str::<Value>(patch) else {
        return patch.to_owned();
    };

    let base = existing.and_then(|raw| serde_json::from_str::<Value>(raw).ok());
    let Some(Value::Object(mut base_map)) = base else {
        return patch.to_owned();
    };

    for (key, value) in patch_map {
        base_map.insert(key, value);
    }
    Value::Object(base_map).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(raw: &str) -> Value {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn merge_overwrites_only_patched_keys() {
        let existing = r#"{"p1":3,"p2":7,"history":[1,2]}"#;
        let merged = merge_blobs(Some(existing), r#"{"history":[]}"#);
        assert_eq!(parsed(&merged), json!({"p1":3,"p2":7,"history":[]}));
    }

    #[test]
    fn merge_into_empty_store_keeps_patch() {
        let merged = merge_blobs(None, r#"{"history":[]}"#);
        assert_eq!(parsed(&merged), json!({"history":[]}));
    }

    #[test]
    fn merge_over_corrupt_blob_keeps_patch() {
        let merged = merge_blobs(Some("not json"), r#"{"history":[]}"#);
        assert_eq!(parsed(&merged), json!({"history":[]}));
    }
}
