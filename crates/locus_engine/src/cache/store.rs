use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use futures::{
    FutureExt,
    future::{self, BoxFuture},
};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::error::LocusError;

/// Durable string key/value storage backing the cache.
pub trait PersistentStore: Send + Sync {
    fn get_string<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, LocusError>>;

    fn set_string<'a>(&'a self, key: &'a str, value: String)
    -> BoxFuture<'a, Result<(), LocusError>>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<FxHashMap<String, String>>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

impl PersistentStore for MemoryStore {
    fn get_string<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, LocusError>> {
        let value = self.entries.lock().get(key).cloned();
        future::ready(Ok(value)).boxed()
    }

    fn set_string<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> BoxFuture<'a, Result<(), LocusError>> {
        self.entries.lock().insert(key.to_string(), value);
        future::ready(Ok(())).boxed()
    }
}

/// One `<key>.json` file per entry inside a cache folder.
pub struct FileStore {
    folder: PathBuf,
}

impl FileStore {
    pub fn new(folder: impl AsRef<Path>) -> Result<Self, LocusError> {
        let folder = folder.as_ref();

        if !folder.is_dir() {
            return Err(LocusError::Store(format!(
                "Path {} is not a directory",
                folder.display()
            )));
        }

        Ok(Self {
            folder: folder.to_path_buf(),
        })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.folder.join(format!("{}.json", key))
    }

    async fn read(&self, key: &str) -> Result<Option<String>, LocusError> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(LocusError::Store(error.to_string())),
        }
    }

    async fn write(&self, key: &str, value: String) -> Result<(), LocusError> {
        let folder = self.folder.clone();
        let path = self.path(key);

        // Readers never observe a half-written file, and concurrent writers
        // of one key each get their own temporary file.
        tokio::task::spawn_blocking(move || {
            let mut tmp = NamedTempFile::new_in(&folder)?;
            tmp.write_all(value.as_bytes())?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|e| LocusError::Store(e.to_string()))?
        .map_err(|e| LocusError::Store(e.to_string()))
    }
}

impl PersistentStore for FileStore {
    fn get_string<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, LocusError>> {
        self.read(key).boxed()
    }

    fn set_string<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> BoxFuture<'a, Result<(), LocusError>> {
        self.write(key, value).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::default();

        assert_eq!(store.get_string("a").await.unwrap(), None);

        store.set_string("a", "1".to_string()).await.unwrap();
        store.set_string("a", "2".to_string()).await.unwrap();

        assert_eq!(store.get_string("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_file_store() {
        let folder = tempfile::tempdir().unwrap();
        let store = FileStore::new(folder.path()).unwrap();

        assert_eq!(store.get_string("matrix-abc").await.unwrap(), None);

        store
            .set_string("matrix-abc", "{}".to_string())
            .await
            .unwrap();

        assert_eq!(
            store.get_string("matrix-abc").await.unwrap().as_deref(),
            Some("{}")
        );
        assert!(folder.path().join("matrix-abc.json").is_file());

        // Survives a new handle on the same folder
        let reopened = FileStore::new(folder.path()).unwrap();
        assert!(reopened.get_string("matrix-abc").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_store_concurrent_writes_to_one_key() {
        let folder = tempfile::tempdir().unwrap();
        let store = FileStore::new(folder.path()).unwrap();
        let first = "a".repeat(64 * 1024);
        let second = "b".repeat(64 * 1024);

        let (a, b) = tokio::join!(
            store.set_string("candidate-abc", first.clone()),
            store.set_string("candidate-abc", second.clone()),
        );
        a.unwrap();
        b.unwrap();

        let stored = store.get_string("candidate-abc").await.unwrap().unwrap();
        assert!(stored == first || stored == second);

        let files: Vec<_> = std::fs::read_dir(folder.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(files, vec!["candidate-abc.json"]);
    }

    #[test]
    fn test_file_store_requires_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();

        assert!(matches!(
            FileStore::new(file.path()),
            Err(LocusError::Store(_))
        ));
    }
}
