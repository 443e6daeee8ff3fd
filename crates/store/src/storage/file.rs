//! File-backed storage backend.
//!
//! Each slot is a file named after its escaped key, with a `.json` suffix.
//! Every write goes to its own uniquely named temporary file in the same
//! directory and is then renamed into place, so neither a reader nor a
//! concurrent writer ever sees a half-written slot.

use std::fmt::Write as _;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{KeyValueStore, StorageError};

const SLOT_EXTENSION: &str = "json";

/// Storage keeping one file per slot under a base directory.
///
/// The directory is created on first write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    /// Create a file store rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The directory holding the slot files.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file backing `key`.
    #[must_use]
    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{SLOT_EXTENSION}", escape_key(key)))
    }
}

/// Escape a key into a portable file name.
///
/// Bytes outside `[A-Za-z0-9._-]` become `%XX`, which keeps distinct keys
/// distinct and rules out path separators.
fn escape_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            name.push(char::from(byte));
        } else {
            let _ = write!(name, "%{byte:02X}");
        }
    }
    name
}

/// Write `contents` to a fresh temporary file in `dir` and rename it to `path`.
fn write_atomically(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".slot-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileStorage {
    #[instrument(skip(self), fields(dir = %self.base_dir.display()))]
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.slot_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, value), fields(dir = %self.base_dir.display(), bytes = value.len()))]
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let path = self.slot_path(key);
        let dir = self.base_dir.clone();
        let target = path.clone();
        let value = value.to_owned();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, value.as_bytes()))
            .await
            .map_err(|e| StorageError::Unavailable(format!("write task failed: {e}")))??;

        debug!(path = %path.display(), "Wrote slot");
        Ok(())
    }

    #[instrument(skip(self), fields(dir = %self.base_dir.display()))]
    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.slot_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_key() {
        assert_eq!(escape_key("pocket-cart:products"), "pocket-cart%3Aproducts");
        assert_eq!(escape_key("@Go/../x"), "%40Go%2F..%2Fx");
        assert_eq!(escape_key("plain_key.v1"), "plain_key.v1");
    }

    #[test]
    fn test_slot_path_stays_in_base_dir() {
        let storage = FileStorage::new("/data/carts");
        let path = storage.slot_path("../../etc/passwd");
        assert_eq!(path.parent(), Some(Path::new("/data/carts")));
    }

    #[tokio::test]
    async fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("not-yet-created"));

        assert_eq!(storage.get_item("k").await.unwrap(), None);
        storage.remove_item("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("slots"));

        storage.set_item("ns:products", "[1]").await.unwrap();
        storage.set_item("ns:products", "[1,2]").await.unwrap();

        assert_eq!(
            storage.get_item("ns:products").await.unwrap().as_deref(),
            Some("[1,2]")
        );
        assert!(storage.slot_path("ns:products").exists());

        // No temporary files left behind
        let leftovers: Vec<_> = std::fs::read_dir(storage.base_dir())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_remove_clears_slot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.set_item("k", "v").await.unwrap();
        storage.remove_item("k").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_second_instance_sees_writes() {
        let dir = tempfile::tempdir().unwrap();
        FileStorage::new(dir.path()).set_item("k", "v").await.unwrap();

        let reopened = FileStorage::new(dir.path());
        assert_eq!(reopened.get_item("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_never_leave_partial_slot() {
        let dir = tempfile::tempdir().unwrap();
        let payloads: Vec<String> = (b'a'..=b'h')
            .map(|c| String::from(char::from(c)).repeat(256 * 1024))
            .collect();

        let writers: Vec<_> = payloads
            .iter()
            .cloned()
            .map(|payload| {
                // Separate instances, as two processes would have
                let storage = FileStorage::new(dir.path());
                tokio::spawn(async move {
                    for _ in 0..4 {
                        storage.set_item("ns:products", &payload).await.unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let saved = FileStorage::new(dir.path())
            .get_item("ns:products")
            .await
            .unwrap()
            .unwrap();
        assert!(payloads.contains(&saved));

        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
