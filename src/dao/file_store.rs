//! File-backed [`StateStore`] backend: one JSON file per key under a root
//! directory, written atomically via a temp file and rename.

use std::{io::ErrorKind, path::PathBuf};

use futures::future::BoxFuture;
use tokio::fs;

use crate::dao::{
    storage::{StorageError, StorageResult},
    store::{StateStore, merge_blobs},
};

/// Durable store persisting each key as `<root>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

async fn read_blob(path: &PathBuf) -> StorageResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StorageError::unavailable(
            format!("reading {}", path.display()),
            err,
        )),
    }
}

async fn write_blob(root: &PathBuf, path: &PathBuf, blob: &str) -> StorageResult<()> {
    fs::create_dir_all(root).await.map_err(|err| {
        StorageError::unavailable(format!("creating {}", root.display()), err)
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, blob).await.map_err(|err| {
        StorageError::unavailable(format!("writing {}", tmp.display()), err)
    })?;
    fs::rename(&tmp, path).await.map_err(|err| {
        StorageError::unavailable(format!("renaming into {}", path.display()), err)
    })
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let path = self.blob_path(key);
        Box::pin(async move { read_blob(&path).await })
    }

    fn set(&self, key: &str, blob: String) -> BoxFuture<'static, StorageResult<()>> {
        let root = self.root.clone();
        let path = self.blob_path(key);
        Box::pin(async move { write_blob(&root, &path, &blob).await })
    }

    fn merge(&self, key: &str, patch: String) -> BoxFuture<'static, StorageResult<()>> {
        let root = self.root.clone();
        let path = self.blob_path(key);
        Box::pin(async move {
            let existing = read_blob(&path).await?;
            let merged = merge_blobs(existing.as_deref(), &patch);
            write_blob(&root, &path, &merged).await
        })
    }
}
