use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use compio::BufResult;
use compio::fs::{self, File};
use compio::io::AsyncWriteAtExt;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::digest::{Digest, HashAlgorithm, InvalidDigestError, UnknownAlgorithmError};
use crate::ext::PathExt;
use crate::snapshot::{Snapshot, SnapshotBuildError, SnapshotBuilder};

/// On-disk shape of a snapshot. The flat form is what older deployments wrote
/// and is always SHA-256.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredSnapshot {
    Tagged {
        algorithm: String,
        files: BTreeMap<String, String>,
    },
    Flat(BTreeMap<String, String>),
}

/// Persists snapshots as JSON at a fixed location, replacing the file atomically.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location the next snapshot is staged at before it replaces the current one.
    pub fn temp_path(&self) -> PathBuf {
        self.path.temp_sibling()
    }

    /// Loads the stored snapshot. A missing file is the empty snapshot, not an error.
    pub async fn load(&self, expected: HashAlgorithm) -> Result<Snapshot, SnapshotLoadError> {
        debug!(
            "Reading snapshot from {}",
            self.path.best_effort_path_display()
        );
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("No existing snapshot found, starting fresh");
                return Ok(Snapshot::empty(expected));
            }
            Err(error) => {
                return Err(error).context(ReadSnafu { path: &self.path });
            }
        };

        let snapshot = self.decode(&bytes, expected)?;
        debug!("Loaded snapshot with {} records", snapshot.len());
        Ok(snapshot)
    }

    fn decode(&self, bytes: &[u8], expected: HashAlgorithm) -> Result<Snapshot, SnapshotLoadError> {
        let stored: StoredSnapshot =
            serde_json::from_slice(bytes).context(ParseSnafu { path: &self.path })?;

        let (algorithm, files) = match stored {
            StoredSnapshot::Tagged { algorithm, files } => {
                let algorithm = algorithm
                    .parse::<HashAlgorithm>()
                    .context(UnknownAlgorithmSnafu { path: &self.path })?;
                (algorithm, files)
            }
            StoredSnapshot::Flat(files) => (HashAlgorithm::Sha256, files),
        };

        if algorithm != expected {
            return AlgorithmMismatchSnafu {
                path: &self.path,
                found: algorithm,
                expected,
            }
            .fail();
        }

        let mut builder = SnapshotBuilder::new(algorithm);
        for (file, hex) in files {
            let digest = Digest::from_hex(algorithm, hex).context(InvalidDigestSnafu {
                path: &self.path,
                file: &file,
            })?;
            builder
                .insert(file, digest)
                .context(InvalidRecordSnafu { path: &self.path })?;
        }
        Ok(builder.build())
    }

    /// Writes `snapshot` next to the current file and renames it into place, so
    /// readers only ever see the old or the new snapshot in full.
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<(), SnapshotPersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context(CreateDirSnafu { path: parent })?;
        }

        let stored = StoredSnapshot::Tagged {
            algorithm: snapshot.algorithm().to_string(),
            files: snapshot
                .iter()
                .map(|(path, digest)| (path.to_owned(), digest.as_hex().to_owned()))
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&stored).context(SerializeSnafu)?;

        let temp_path = self.temp_path();
        if let Err(error) = Self::write_synced(&temp_path, bytes).await {
            Self::discard(&temp_path).await;
            return Err(error);
        }

        if let Err(source) = fs::rename(&temp_path, &self.path).await {
            Self::discard(&temp_path).await;
            return Err(SnapshotPersistError::RenameError {
                from: temp_path,
                to: self.path.clone(),
                source,
            });
        }

        debug!(
            "Persisted snapshot with {} records to {}",
            snapshot.len(),
            self.path.best_effort_path_display()
        );
        Ok(())
    }

    async fn write_synced(path: &Path, bytes: Vec<u8>) -> Result<(), SnapshotPersistError> {
        let mut file = File::create(path).await.context(WriteSnafu { path })?;
        let BufResult(result, _) = file.write_all_at(bytes, 0).await;
        result.context(WriteSnafu { path })?;
        file.sync_all().await.context(SyncSnafu { path })?;
        Ok(())
    }

    async fn discard(path: &Path) {
        if let Err(error) = fs::remove_file(path).await {
            if error.kind() != ErrorKind::NotFound {
                warn!(
                    "Failed to remove staged snapshot {}: {}",
                    path.best_effort_path_display(),
                    error
                );
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotLoadError {
    #[snafu(display("Failed to read snapshot {}", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Snapshot {} is not valid JSON", path.best_effort_path_display()))]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("Snapshot {} names an unsupported algorithm", path.best_effort_path_display()))]
    UnknownAlgorithmError {
        path: PathBuf,
        source: UnknownAlgorithmError,
    },
    #[snafu(display(
        "Snapshot {} was built with {} but {} is configured",
        path.best_effort_path_display(),
        found,
        expected
    ))]
    AlgorithmMismatchError {
        path: PathBuf,
        found: HashAlgorithm,
        expected: HashAlgorithm,
    },
    #[snafu(display("Snapshot {} has a bad digest for '{}'", path.best_effort_path_display(), file))]
    InvalidDigestError {
        path: PathBuf,
        file: String,
        source: InvalidDigestError,
    },
    #[snafu(display("Snapshot {} has an invalid record", path.best_effort_path_display()))]
    InvalidRecordError {
        path: PathBuf,
        source: SnapshotBuildError,
    },
}

#[derive(Debug, Snafu)]
pub enum SnapshotPersistError {
    #[snafu(display("Failed to create snapshot directory {}", path.best_effort_path_display()))]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to serialize snapshot"))]
    SerializeError { source: serde_json::Error },
    #[snafu(display("Failed to write staged snapshot {}", path.best_effort_path_display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to flush staged snapshot {}", path.best_effort_path_display()))]
    SyncError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Failed to move staged snapshot {} into place at {}",
        from.best_effort_path_display(),
        to.best_effort_path_display()
    ))]
    RenameError {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn digest(algorithm: HashAlgorithm, fill: char) -> Digest {
        Digest::from_hex(algorithm, fill.to_string().repeat(algorithm.hex_len())).unwrap()
    }

    fn sample_snapshot() -> Snapshot {
        let mut builder = SnapshotBuilder::new(HashAlgorithm::Sha256);
        builder
            .insert("/a.txt", digest(HashAlgorithm::Sha256, 'a'))
            .unwrap();
        builder
            .insert("/dir/b.txt", digest(HashAlgorithm::Sha256, 'b'))
            .unwrap();
        builder.build()
    }

    fn store_in(dir: &TempDir) -> SnapshotStore {
        SnapshotStore::new(dir.path().join("state").join("file_hashes.json"))
    }

    #[compio::test]
    async fn missing_file_loads_as_empty_snapshot() {
        let dir = TempDir::new().expect("Failed to create temp directory");

        let snapshot = store_in(&dir)
            .load(HashAlgorithm::Sha256)
            .await
            .expect("Missing snapshot should not be an error");

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.algorithm(), HashAlgorithm::Sha256);
    }

    #[compio::test]
    async fn persisted_snapshot_loads_back_equal() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&dir);
        let snapshot = sample_snapshot();

        store.persist(&snapshot).await.expect("Failed to persist");
        let loaded = store
            .load(HashAlgorithm::Sha256)
            .await
            .expect("Failed to load");

        assert_eq!(loaded, snapshot);
        assert!(!store.temp_path().exists());
    }

    #[compio::test]
    async fn persisted_file_is_keyed_by_path() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&dir);

        store
            .persist(&sample_snapshot())
            .await
            .expect("Failed to persist");

        let text = std::fs::read_to_string(store.path()).expect("Failed to read snapshot");
        let value: serde_json::Value = serde_json::from_str(&text).expect("Invalid JSON");
        assert_eq!(value["algorithm"], "sha256");
        assert_eq!(value["files"]["/a.txt"], "a".repeat(64));
    }

    #[compio::test]
    async fn flat_legacy_format_is_read_as_sha256() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("file_hashes.json");
        let legacy = format!("{{\n    \"/a.txt\": \"{}\"\n}}", "c".repeat(64));
        std::fs::write(&path, legacy).expect("Failed to write legacy snapshot");

        let snapshot = SnapshotStore::new(&path)
            .load(HashAlgorithm::Sha256)
            .await
            .expect("Failed to load legacy snapshot");

        assert_eq!(
            snapshot.get("/a.txt"),
            Some(&digest(HashAlgorithm::Sha256, 'c'))
        );
    }

    #[compio::test]
    async fn truncated_file_is_a_parse_error() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("file_hashes.json");
        std::fs::write(&path, "{\"algorithm\": \"sha256\", \"files\": {\"/a.t").unwrap();

        let result = SnapshotStore::new(&path).load(HashAlgorithm::Sha256).await;

        assert!(matches!(result, Err(SnapshotLoadError::ParseError { .. })));
    }

    #[compio::test]
    async fn other_algorithm_is_rejected() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&dir);
        store.persist(&sample_snapshot()).await.unwrap();

        let result = store.load(HashAlgorithm::Blake3).await;

        assert!(matches!(
            result,
            Err(SnapshotLoadError::AlgorithmMismatchError {
                found: HashAlgorithm::Sha256,
                expected: HashAlgorithm::Blake3,
                ..
            })
        ));
    }

    #[compio::test]
    async fn malformed_digest_is_rejected() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("file_hashes.json");
        std::fs::write(
            &path,
            r#"{"algorithm": "sha256", "files": {"/a.txt": "not-a-digest"}}"#,
        )
        .unwrap();

        let result = SnapshotStore::new(&path).load(HashAlgorithm::Sha256).await;

        assert!(matches!(
            result,
            Err(SnapshotLoadError::InvalidDigestError { .. })
        ));
    }

    #[compio::test]
    async fn failed_write_leaves_previous_snapshot_intact() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&dir);
        store.persist(&sample_snapshot()).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        // A directory squatting on the staging path makes the write fail.
        std::fs::create_dir(store.temp_path()).unwrap();
        let result = store
            .persist(&Snapshot::empty(HashAlgorithm::Sha256))
            .await;

        assert!(matches!(result, Err(SnapshotPersistError::WriteError { .. })));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        let reloaded = store.load(HashAlgorithm::Sha256).await.unwrap();
        assert_eq!(reloaded, sample_snapshot());
    }
}
