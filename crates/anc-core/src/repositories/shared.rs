//! Shared filesystem helpers for the record stores.
//!
//! - **Directory allocation**: `create_uuid_and_shard_dir` reserves a fresh sharded directory.
//! - **Document I/O**: `write_json_atomic` / `read_json` persist one JSON document per record.
//! - **Traversal**: `sharded_record_files` walks the `<s1>/<s2>/<uuid>/` layout.
//! - **Blocking bridge**: `run_blocking` moves filesystem work off the async runtime.

use crate::error::{StoreError, StoreResult};
use anc_uuid::ShardableUuid;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

/// Creates a unique sharded directory within `base_dir`.
///
/// UUIDs come from `uuid_source`; a candidate that already exists is skipped. Gives up after 5
/// attempts so an external process squatting on directories cannot spin this forever.
///
/// # Errors
///
/// Returns [`StoreError::DirCreation`] if directory creation fails or no free candidate is found.
pub(crate) fn create_uuid_and_shard_dir(
    base_dir: &Path,
    mut uuid_source: impl FnMut() -> ShardableUuid,
) -> StoreResult<(ShardableUuid, PathBuf)> {
    for _attempt in 0..5 {
        let uuid = uuid_source();
        let candidate = uuid.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(StoreError::DirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((uuid, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(StoreError::DirCreation(e)),
        }
    }

    Err(StoreError::DirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique record directory after 5 attempts",
    )))
}

/// Serialises `value` and writes it to `path` via a temporary file and rename, so readers never
/// observe a half-written document.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(StoreError::Serialization)?;
    let tmp_path = path.with_extension("json.tmp");

    let mut file = fs::File::create(&tmp_path).map_err(StoreError::FileWrite)?;
    file.write_all(&bytes).map_err(StoreError::FileWrite)?;
    file.sync_all().map_err(StoreError::FileWrite)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(StoreError::FileWrite)
}

/// Reads a JSON document. A missing file yields `Ok(None)`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(StoreError::Deserialization),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::FileRead(e)),
    }
}

/// Returns `<base>/<s1>/<s2>/<uuid>/<filename>` for every record directory that contains
/// `filename`. A missing base directory yields an empty list.
pub(crate) fn sharded_record_files(base_dir: &Path, filename: &str) -> StoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    let s1_iter = match fs::read_dir(base_dir) {
        Ok(it) => it,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(StoreError::FileRead(e)),
    };

    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let Ok(s2_iter) = fs::read_dir(&s1_path) else {
            continue;
        };
        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let Ok(id_iter) = fs::read_dir(&s2_path) else {
                continue;
            };
            for id_ent in id_iter.flatten() {
                let record_file = id_ent.path().join(filename);
                if record_file.is_file() {
                    files.push(record_file);
                }
            }
        }
    }

    Ok(files)
}

/// Runs blocking filesystem work on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn create_uuid_and_shard_dir_creates_first_available_candidate() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path().join("reports");

        let uuids = vec![ShardableUuid::parse("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
            .expect("uuid should be canonical")];
        let mut iter = uuids.into_iter();

        let (uuid, dir) = create_uuid_and_shard_dir(&base, || iter.next().unwrap())
            .expect("allocation should succeed");

        assert_eq!(uuid.to_string(), "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert_eq!(
            dir,
            base.join("aa")
                .join("aa")
                .join("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
        );
        assert!(dir.exists());
    }

    #[test]
    fn create_uuid_and_shard_dir_skips_existing_candidate() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path().join("reports");

        let first = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let second = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
        fs::create_dir_all(base.join("aa").join("aa").join(first))
            .expect("Failed to pre-create first candidate dir");

        let uuids = vec![
            ShardableUuid::parse(first).expect("uuid should be canonical"),
            ShardableUuid::parse(second).expect("uuid should be canonical"),
        ];
        let mut iter = uuids.into_iter();

        let (uuid, _dir) = create_uuid_and_shard_dir(&base, || iter.next().unwrap())
            .expect("allocation should succeed");

        assert_eq!(uuid.to_string(), second);
    }

    #[test]
    fn create_uuid_and_shard_dir_fails_after_five_attempts() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path().join("reports");
        let id = "11111111111111111111111111111111";
        fs::create_dir_all(base.join(&id[0..2]).join(&id[2..4]).join(id))
            .expect("Failed to pre-create candidate dir");

        let err = create_uuid_and_shard_dir(&base, || ShardableUuid::parse(id).unwrap())
            .expect_err("allocation should fail");

        match err {
            StoreError::DirCreation(e) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn json_documents_round_trip_and_missing_is_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("doc.json");

        assert!(read_json::<Value>(&path).unwrap().is_none());

        write_json_atomic(&path, &json!({ "a": 1 })).unwrap();
        let back: Value = read_json(&path).unwrap().unwrap();
        assert_eq!(back, json!({ "a": 1 }));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_document_is_a_deserialization_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, b"{not json").unwrap();

        assert!(matches!(
            read_json::<Value>(&path),
            Err(StoreError::Deserialization(_))
        ));
    }

    #[test]
    fn sharded_record_files_finds_only_records_with_the_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path().join("reports");

        let with_file = base.join("aa/bb/aabb0000000000000000000000000000");
        let without_file = base.join("cc/dd/ccdd0000000000000000000000000000");
        fs::create_dir_all(&with_file).unwrap();
        fs::create_dir_all(&without_file).unwrap();
        fs::write(with_file.join("report.json"), b"{}").unwrap();

        let files = sharded_record_files(&base, "report.json").unwrap();
        assert_eq!(files, vec![with_file.join("report.json")]);

        let missing = sharded_record_files(&temp_dir.path().join("nope"), "report.json").unwrap();
        assert!(missing.is_empty());
    }
}
