//! Pregnancy registration storage.
//!
//! Each registration is one JSON document at
//! `registrations/<sha256(pregnancy_id)>/registration.json`. Pregnancy ids are free-form text,
//! so the directory name is the hex SHA-256 digest of the id; the id itself is kept in the
//! document.
//!
//! Appending a report reference is a read-modify-write of that document; the store serialises
//! these within the process so concurrent appends for the same pregnancy are not lost.

use crate::config::CoreConfig;
use crate::constants::REGISTRATION_JSON_FILENAME;
use crate::error::{StoreError, StoreResult};
use crate::report::PregnancyRecord;
use crate::repositories::shared::{read_json, run_blocking, write_json_atomic};
use anc_types::PregnancyId;
use anc_uuid::ShardableUuid;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Persistence seam for pregnancy registrations.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Creates a registration with no report references.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the pregnancy id is already registered.
    async fn create(&self, pregnancy_id: &PregnancyId, data: Value)
        -> StoreResult<PregnancyRecord>;

    async fn get(&self, pregnancy_id: &PregnancyId) -> StoreResult<Option<PregnancyRecord>>;

    /// Appends `report_id` to the registration's report references.
    ///
    /// Returns `false` without writing if the reference is already present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the pregnancy is not registered.
    async fn append_report_ref(
        &self,
        pregnancy_id: &PregnancyId,
        report_id: &ShardableUuid,
    ) -> StoreResult<bool>;
}

/// Filesystem-backed [`RegistrationStore`].
#[derive(Clone, Debug)]
pub struct FileRegistrationStore {
    cfg: Arc<CoreConfig>,
    write_lock: Arc<Mutex<()>>,
}

impl FileRegistrationStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn registration_dir(&self, pregnancy_id: &PregnancyId) -> PathBuf {
        self.cfg
            .registrations_dir()
            .join(registration_dir_name(pregnancy_id))
    }

    fn create_blocking(&self, pregnancy_id: PregnancyId, data: Value) -> StoreResult<PregnancyRecord> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        fs::create_dir_all(self.cfg.registrations_dir()).map_err(StoreError::DirCreation)?;
        let dir = self.registration_dir(&pregnancy_id);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(format!(
                    "pregnancy {pregnancy_id}"
                )));
            }
            Err(e) => return Err(StoreError::DirCreation(e)),
        }

        let record = PregnancyRecord {
            pregnancy_id,
            report_refs: Vec::new(),
            data,
            created_at: Utc::now(),
        };

        if let Err(e) = write_json_atomic(&dir.join(REGISTRATION_JSON_FILENAME), &record) {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::error!(
                    "failed to clean up registration dir {} after write error: {:?}",
                    dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        Ok(record)
    }

    fn append_blocking(
        &self,
        pregnancy_id: PregnancyId,
        report_id: ShardableUuid,
    ) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let path = self
            .registration_dir(&pregnancy_id)
            .join(REGISTRATION_JSON_FILENAME);
        let mut record = read_json::<PregnancyRecord>(&path)?
            .ok_or_else(|| StoreError::NotFound(format!("pregnancy {pregnancy_id}")))?;

        if record.has_report(&report_id) {
            return Ok(false);
        }
        record.report_refs.push(report_id);
        write_json_atomic(&path, &record)?;
        Ok(true)
    }
}

fn registration_dir_name(pregnancy_id: &PregnancyId) -> String {
    hex::encode(Sha256::digest(pregnancy_id.as_str().as_bytes()))
}

#[async_trait]
impl RegistrationStore for FileRegistrationStore {
    async fn create(
        &self,
        pregnancy_id: &PregnancyId,
        data: Value,
    ) -> StoreResult<PregnancyRecord> {
        let store = self.clone();
        let pregnancy_id = pregnancy_id.clone();
        run_blocking(move || store.create_blocking(pregnancy_id, data)).await
    }

    async fn get(&self, pregnancy_id: &PregnancyId) -> StoreResult<Option<PregnancyRecord>> {
        let path = self
            .registration_dir(pregnancy_id)
            .join(REGISTRATION_JSON_FILENAME);
        run_blocking(move || read_json::<PregnancyRecord>(&path)).await
    }

    async fn append_report_ref(
        &self,
        pregnancy_id: &PregnancyId,
        report_id: &ShardableUuid,
    ) -> StoreResult<bool> {
        let store = self.clone();
        let pregnancy_id = pregnancy_id.clone();
        let report_id = report_id.clone();
        run_blocking(move || store.append_blocking(pregnancy_id, report_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_store(data_dir: &std::path::Path) -> FileRegistrationStore {
        FileRegistrationStore::new(Arc::new(
            CoreConfig::new(
                data_dir.to_path_buf(),
                "http://127.0.0.1:9".into(),
                Duration::from_secs(1),
                0,
                None,
            )
            .expect("CoreConfig::new should succeed"),
        ))
    }

    #[tokio::test]
    async fn create_and_get_registration() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        let pid = PregnancyId::new("PREG-1").unwrap();

        let created = store.create(&pid, json!({ "name": "Asha" })).await.unwrap();
        let fetched = store.get(&pid).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert!(fetched.report_refs.is_empty());
        assert_eq!(fetched.data["name"], "Asha");
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        let pid = PregnancyId::new("PREG-1").unwrap();

        store.create(&pid, json!({})).await.unwrap();
        let err = store.create(&pid, json!({})).await.unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn append_preserves_insertion_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        let pid = PregnancyId::new("PREG-1").unwrap();
        store.create(&pid, json!({})).await.unwrap();

        let first = ShardableUuid::new();
        let second = ShardableUuid::new();
        assert!(store.append_report_ref(&pid, &first).await.unwrap());
        assert!(store.append_report_ref(&pid, &second).await.unwrap());

        let record = store.get(&pid).await.unwrap().unwrap();
        assert_eq!(record.report_refs, vec![first, second]);
    }

    #[tokio::test]
    async fn append_to_missing_registration_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());

        let err = store
            .append_report_ref(&PregnancyId::new("NOPE").unwrap(), &ShardableUuid::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        let pid = PregnancyId::new("PREG-1").unwrap();
        store.create(&pid, json!({})).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let pid = pid.clone();
            handles.push(tokio::spawn(async move {
                store.append_report_ref(&pid, &ShardableUuid::new()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = store.get(&pid).await.unwrap().unwrap();
        assert_eq!(record.report_refs.len(), 8);
    }

    #[tokio::test]
    async fn appending_an_existing_ref_is_a_no_op() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        let pid = PregnancyId::new("PREG-1").unwrap();
        store.create(&pid, json!({})).await.unwrap();

        let report_id = ShardableUuid::new();
        assert!(store.append_report_ref(&pid, &report_id).await.unwrap());
        assert!(!store.append_report_ref(&pid, &report_id).await.unwrap());

        let record = store.get(&pid).await.unwrap().unwrap();
        assert_eq!(record.report_refs, vec![report_id]);
    }

    #[tokio::test]
    async fn free_form_ids_are_stored_under_hashed_dirs() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());

        for raw in ["ANC/2024/001", "PREG 001", "गर्भ-१२", ".."] {
            let pid = PregnancyId::new(raw).unwrap();
            store.create(&pid, json!({})).await.unwrap();

            let fetched = store.get(&pid).await.unwrap().unwrap();
            assert_eq!(fetched.pregnancy_id.as_str(), raw);
        }

        let dirs: Vec<_> = fs::read_dir(temp_dir.path().join("registrations"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(dirs.len(), 4);
        assert!(dirs
            .iter()
            .all(|d| d.len() == 64 && d.bytes().all(|b| b.is_ascii_hexdigit())));
    }
}
