use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex, time::timeout};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::metrics;
use crate::errors::ServiceError;

/// What a transaction body wants done with the document it was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// Persist the mutated document, then return the value.
    Write(R),
    /// Leave the stored document untouched.
    Keep(R),
}

/// JSON file-backed store holding one document per named collection.
///
/// Each collection lives at `<data_dir>/<name>.json`. Saves go through a temp
/// file in the same directory and an atomic rename, so readers only ever see
/// a complete document. Read-modify-write sequences must go through
/// [`RecordStore::with_lock`], which serializes them per collection name.
///
/// Locking is in-process only; two processes sharing a data directory can
/// still lose updates.
pub struct RecordStore {
    data_dir: PathBuf,
    lock_timeout: Duration,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RecordStore {
    pub fn new<P: Into<PathBuf>>(data_dir: P, lock_timeout: Duration) -> Self {
        Self { data_dir: data_dir.into(), lock_timeout, locks: DashMap::new() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, ServiceError> {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ServiceError::Validation(format!("invalid collection name `{name}`")));
        }
        Ok(self.data_dir.join(format!("{name}.json")))
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks.entry(name.to_string()).or_default().clone()
    }

    /// Read and parse a collection, or return `default` when it was never saved.
    pub async fn load<D: DeserializeOwned>(&self, name: &str, default: D) -> Result<D, ServiceError> {
        let path = self.path_for(name)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(default),
            Err(source) => return Err(ServiceError::StoreRead { name: name.to_string(), source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| {
            warn!(collection = %name, path = %path.display(), error = %source, "collection document is corrupt");
            ServiceError::CorruptStore { name: name.to_string(), source }
        })
    }

    /// Replace a collection on disk. The previous document survives any failure.
    pub async fn save<D: Serialize>(&self, name: &str, document: &D) -> Result<(), ServiceError> {
        let path = self.path_for(name)?;
        let data = serde_json::to_vec_pretty(document).map_err(|e| ServiceError::store_write(name, e))?;
        let result = self.replace(&path, &data).await;
        if let Err(e) = &result {
            metrics::WRITE_ERRORS_TOTAL.inc();
            warn!(collection = %name, error = %e, "collection save failed");
        }
        result.map_err(|e| ServiceError::store_write(name, e))
    }

    async fn replace(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).await?;
        let tmp_path = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let mut tmp = TempFile::new(tmp_path);

        let mut file = fs::File::create(tmp.path()).await?;
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(tmp.path(), path).await?;
        tmp.persisted();

        sync_dir(&self.data_dir).await;
        Ok(())
    }

    /// Run a read-modify-write transaction against one collection.
    ///
    /// Waits at most the configured lock timeout for exclusive access, loads
    /// the current document (or `default`), hands it to `f`, and saves it if
    /// `f` returns [`Outcome::Write`]. An error from `f` discards the changes.
    #[instrument(skip(self, default, f), fields(collection = %name))]
    pub async fn with_lock<D, R, F>(&self, name: &str, default: D, f: F) -> Result<R, ServiceError>
    where
        D: Serialize + DeserializeOwned,
        F: FnOnce(&mut D) -> Result<Outcome<R>, ServiceError>,
    {
        self.path_for(name)?;
        metrics::TRANSACTIONS_TOTAL.inc();

        let lock = self.lock_for(name);
        let started = Instant::now();
        let _guard = match timeout(self.lock_timeout, lock.lock_owned()).await {
            Ok(guard) => guard,
            Err(_) => {
                metrics::LOCK_TIMEOUTS_TOTAL.inc();
                let waited_ms = self.lock_timeout.as_millis() as u64;
                warn!(waited_ms, "lock acquisition timed out");
                return Err(ServiceError::LockTimeout { name: name.to_string(), waited_ms });
            }
        };
        metrics::LOCK_WAIT_SECONDS.observe(started.elapsed().as_secs_f64());

        let mut document = self.load(name, default).await?;
        match f(&mut document)? {
            Outcome::Write(value) => {
                self.save(name, &document).await?;
                metrics::COMMITS_TOTAL.inc();
                debug!("transaction committed");
                Ok(value)
            }
            Outcome::Keep(value) => {
                debug!("transaction finished without changes");
                Ok(value)
            }
        }
    }
}

/// Temp file that is removed on drop unless it was renamed into place.
///
/// Covers error returns and futures dropped mid-save alike.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persisted(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

// Persist the rename itself; directories cannot be opened for sync everywhere.
#[cfg(unix)]
async fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir).await {
        let _ = handle.sync_all().await;
    }
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cleanup, store_in, temp_data_dir};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn save_then_load_round_trips() -> Result<(), anyhow::Error> {
        let dir = temp_data_dir("record_store_roundtrip");
        let store = store_in(dir.clone());

        let doc = json!([{"id": "a", "zeta": 1, "alpha": {"nested": [1, 2, null]}}, {"id": "b"}]);
        store.save("apps", &doc).await?;
        let loaded: Value = store.load("apps", json!([])).await?;
        assert_eq!(loaded, doc);

        // key order inside records survives the trip
        let keys: Vec<_> = loaded[0].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["id", "zeta", "alpha"]);

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_collection_returns_default() -> Result<(), anyhow::Error> {
        let dir = temp_data_dir("record_store_default");
        let store = store_in(dir.clone());
        let loaded: Value = store.load("users", json!({})).await?;
        assert_eq!(loaded, json!({}));
        Ok(())
    }

    #[tokio::test]
    async fn unparsable_document_is_reported_not_discarded() -> Result<(), anyhow::Error> {
        let dir = temp_data_dir("record_store_corrupt");
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join("apps.json"), b"[{\"id\": ").await?;
        let store = store_in(dir.clone());

        let err = store.load::<Value>("apps", json!([])).await.unwrap_err();
        assert!(matches!(err, ServiceError::CorruptStore { ref name, .. } if name == "apps"));

        // a transaction must not overwrite the damaged file either
        let res = store
            .with_lock("apps", Vec::<Value>::new(), |apps| {
                apps.push(json!({"id": "x"}));
                Ok(Outcome::Write(()))
            })
            .await;
        assert!(matches!(res, Err(ServiceError::CorruptStore { .. })));
        assert_eq!(tokio::fs::read(dir.join("apps.json")).await?, b"[{\"id\": ");

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_save_keeps_previous_document_and_no_temp_files() -> Result<(), anyhow::Error> {
        let dir = temp_data_dir("record_store_failed_save");
        let store = store_in(dir.clone());
        store.save("users", &json!({"u1": {"apps": []}})).await?;

        // a directory squatting on the target path makes the rename fail
        tokio::fs::create_dir_all(dir.join("apps.json")).await?;
        let err = store.save("apps", &json!([{"id": "a"}])).await.unwrap_err();
        assert!(matches!(err, ServiceError::StoreWrite { ref name, .. } if name == "apps"));

        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            assert!(!file_name.ends_with(".tmp"), "leftover temp file {file_name}");
        }
        let users: Value = store.load("users", json!({})).await?;
        assert_eq!(users, json!({"u1": {"apps": []}}));

        cleanup(&dir).await;
        Ok(())
    }

    async fn temp_files_in(dir: &Path) -> std::io::Result<Vec<String>> {
        let mut found = Vec::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.ends_with(".tmp") {
                found.push(file_name);
            }
        }
        Ok(found)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn aborted_save_leaves_no_temp_file() -> Result<(), anyhow::Error> {
        let dir = temp_data_dir("record_store_aborted_save");
        let store = store_in(dir.clone());
        store.save("apps", &json!([{"id": "before"}])).await?;

        let big: Vec<Value> = (0..400_000)
            .map(|i| json!({"id": format!("app{i}"), "name": "padding padding padding", "n": i}))
            .collect();
        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.save("apps", &big).await })
        };

        // wait for the temp file to show up, then cancel the save mid-write
        for _ in 0..5000 {
            if !temp_files_in(&dir).await?.is_empty() || writer.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        writer.abort();
        let _ = writer.await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(temp_files_in(&dir).await?, Vec::<String>::new());
        // whichever way the race went, the document is complete
        let apps: Vec<Value> = store.load("apps", Vec::new()).await?;
        assert!(apps.len() == 1 || apps.len() == 400_000);

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn rejects_names_that_escape_the_data_dir() {
        let store = store_in(temp_data_dir("record_store_names"));
        for bad in ["", "../apps", "a/b", "apps.json"] {
            let err = store.load::<Value>(bad, json!([])).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{bad} accepted");
        }
    }

    #[tokio::test]
    async fn keep_outcome_does_not_touch_disk() -> Result<(), anyhow::Error> {
        let dir = temp_data_dir("record_store_keep");
        let store = store_in(dir.clone());
        let n = store
            .with_lock("apps", Vec::<Value>::new(), |apps| {
                apps.push(json!({"id": "ghost"}));
                Ok(Outcome::Keep(apps.len()))
            })
            .await?;
        assert_eq!(n, 1);
        assert!(tokio::fs::metadata(dir.join("apps.json")).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn error_in_transaction_discards_changes() -> Result<(), anyhow::Error> {
        let dir = temp_data_dir("record_store_abort");
        let store = store_in(dir.clone());
        store.save("apps", &json!([{"id": "a"}])).await?;

        let res: Result<(), _> = store
            .with_lock("apps", Vec::<Value>::new(), |apps| {
                apps.clear();
                Err(ServiceError::not_found("app"))
            })
            .await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));
        let apps: Value = store.load("apps", json!([])).await?;
        assert_eq!(apps, json!([{"id": "a"}]));

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn held_lock_times_out() -> Result<(), anyhow::Error> {
        let dir = temp_data_dir("record_store_timeout");
        let store = RecordStore::new(dir.clone(), Duration::from_millis(50));

        let held = store.lock_for("apps").lock_owned().await;
        let res = store
            .with_lock("apps", Vec::<Value>::new(), |_| Ok(Outcome::Keep(())))
            .await;
        assert!(matches!(res, Err(ServiceError::LockTimeout { ref name, waited_ms: 50 }) if name == "apps"));

        // other collections are unaffected by the held lock
        store
            .with_lock("users", serde_json::Map::new(), |_| Ok(Outcome::Keep(())))
            .await?;

        drop(held);
        store
            .with_lock("apps", Vec::<Value>::new(), |_| Ok(Outcome::Keep(())))
            .await?;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transactions_do_not_lose_updates() -> Result<(), anyhow::Error> {
        let dir = temp_data_dir("record_store_concurrent");
        let store = store_in(dir.clone());

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .with_lock("counter", json!({"n": 0}), |doc| {
                        let n = doc["n"].as_u64().unwrap_or(0);
                        doc["n"] = json!(n + 1);
                        doc[format!("seen_{i}")] = json!(true);
                        Ok(Outcome::Write(()))
                    })
                    .await
            }));
        }
        for h in handles {
            h.await??;
        }

        let doc: Value = store.load("counter", json!({})).await?;
        assert_eq!(doc["n"], 32);
        cleanup(&dir).await;
        Ok(())
    }
}
