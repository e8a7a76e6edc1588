//! Last-seen status records, one per (username, application number).

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use casewatch_common::error::AppError;
use casewatch_common::types::{StateKey, StatusRecord};

/// Durable storage for the previous snapshot of each tracked application.
///
/// `save` fully replaces whatever was stored under the key.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, key: &StateKey) -> Result<Option<StatusRecord>, AppError>;

    async fn save(&self, key: &StateKey, record: &StatusRecord) -> Result<(), AppError>;
}

/// One JSON file per key: `status_{username}_{application}.json`.
///
/// Writes go to a temp file in the same directory which is then renamed over
/// the target, so a crash mid-write leaves the old record intact.
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Distinct keys always map to distinct files. Plain email-style
    /// usernames keep their legacy file names.
    pub fn path_for(&self, key: &StateKey) -> PathBuf {
        self.dir.join(format!(
            "status_{}_{}.json",
            encode_part(&key.username, true),
            encode_part(&key.application_number, false)
        ))
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9@.+=,-]` (and `_` when
/// `keep_underscore`). `%` and path separators are always encoded.
///
/// The application part never carries a raw `_`, so the last `_` in a file
/// stem is always the separator and the mapping is reversible. Every name
/// starts with `status_`, so `.` and `..` never stand alone.
fn encode_part(part: &str, keep_underscore: bool) -> String {
    let mut out = String::with_capacity(part.len());
    for byte in part.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'@' | b'.' | b'+' | b'=' | b',' | b'-')
            || (keep_underscore && byte == b'_');
        if keep {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self, key: &StateKey) -> Result<Option<StatusRecord>, AppError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        match serde_json::from_slice::<StatusRecord>(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // An unreadable record is replaced on the next save.
                tracing::warn!(
                    key = %key,
                    path = %path.display(),
                    error = %e,
                    "Stored status is corrupt, treating as first sighting"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &StateKey, record: &StatusRecord) -> Result<(), AppError> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec(record)
            .map_err(|e| AppError::Storage(format!("failed to encode {}: {}", key, e)))?;
        let dir = self.dir.clone();
        let target = path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &bytes))
            .await
            .map_err(|e| AppError::Storage(format!("write task failed: {}", e)))?
            .map_err(|e| {
                AppError::Storage(format!("failed to write {}: {}", path.display(), e))
            })?;

        tracing::debug!(key = %key, path = %path.display(), "Status persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(last_updated_time: i64) -> StatusRecord {
        serde_json::from_value(serde_json::json!({
            "applicationNumber": "C1",
            "status": "inProgress",
            "lastUpdatedTime": last_updated_time,
            "extraField": [1, 2, 3]
        }))
        .unwrap()
    }

    #[test]
    fn test_path_for_matches_legacy_layout() {
        let store = FileStateStore::new("/var/lib/casewatch");
        let key = StateKey::new("alice@example.com", "C000123");
        assert_eq!(
            store.path_for(&key),
            PathBuf::from("/var/lib/casewatch/status_alice@example.com_C000123.json")
        );
    }

    #[test]
    fn test_path_for_cannot_escape_dir() {
        let store = FileStateStore::new("/state");
        let key = StateKey::new("../../etc/passwd", "a/b\\c");
        let path = store.path_for(&key);
        assert_eq!(path.parent(), Some(Path::new("/state")));
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "status_..%2F..%2Fetc%2Fpasswd_a%2Fb%5Cc.json"
        );
    }

    #[test]
    fn test_path_for_distinct_keys_never_share_a_file() {
        let store = FileStateStore::new("/state");
        let keys = [
            StateKey::new("a+b@x.com", "C1"),
            StateKey::new("a_b@x.com", "C1"),
            StateKey::new("a%2Bb@x.com", "C1"),
            StateKey::new("a", "b_C1"),
            StateKey::new("a_b", "C1"),
            StateKey::new("tag=1,2@x.com", "C1"),
        ];
        let paths: std::collections::HashSet<_> =
            keys.iter().map(|k| store.path_for(k)).collect();
        assert_eq!(paths.len(), keys.len());

        // Plus-addressed and other filename-safe characters are kept verbatim.
        assert_eq!(
            store.path_for(&keys[0]),
            PathBuf::from("/state/status_a+b@x.com_C1.json")
        );
        assert_eq!(
            store.path_for(&keys[5]),
            PathBuf::from("/state/status_tag=1,2@x.com_C1.json")
        );
    }

    #[tokio::test]
    async fn test_plus_addressed_user_does_not_see_other_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());

        store
            .save(&StateKey::new("a+b@x.com", "C1"), &record(1000))
            .await
            .unwrap();
        assert!(
            store
                .load(&StateKey::new("a_b@x.com", "C1"))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            store
                .load(&StateKey::new("a+b@x.com", "C1"))
                .await
                .unwrap(),
            Some(record(1000))
        );
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        let loaded = store.load(&StateKey::new("bob", "C1")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nested"));
        let key = StateKey::new("bob", "C1");

        store.save(&key, &record(1000)).await.unwrap();
        store.save(&key, &record(2000)).await.unwrap();

        let loaded = store.load(&key).await.unwrap().unwrap();
        assert_eq!(loaded, record(2000));

        // Only the record itself remains; no temp files left behind.
        let entries: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());

        store
            .save(&StateKey::new("bob", "C1"), &record(1000))
            .await
            .unwrap();
        assert!(
            store
                .load(&StateKey::new("bob", "C2"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .load(&StateKey::new("carol", "C1"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_corrupt_record_treated_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        let key = StateKey::new("bob", "C1");
        std::fs::write(store.path_for(&key), b"{ not json").unwrap();

        assert!(store.load(&key).await.unwrap().is_none());
    }
}
