use std::io::Write;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const RECORD_EXT: &str = "bin";

/// One averaged face encoding per identity. Re-enrollment replaces the whole
/// record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingRecord {
    pub enrollment_id: String,
    pub identity: String,
    pub vector: Vec<f32>,
    pub images_used: u32,
    pub enrolled_at: String,
}

impl EncodingRecord {
    pub fn new(identity: &str, vector: Vec<f32>, images_used: u32) -> Self {
        Self {
            enrollment_id: uuid::Uuid::new_v4().to_string(),
            identity: identity.to_string(),
            vector,
            images_used,
            enrolled_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Flat-file encoding store: one postcard-serialized record per identity
/// under a single directory. Constructed explicitly by the caller; there is
/// no process-global store.
#[derive(Debug, Clone)]
pub struct EncodingStore {
    dir: PathBuf,
}

impl EncodingStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| Error::StoreWrite {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, identity: &str) -> Result<PathBuf> {
        validate_identity(identity)?;
        Ok(self.dir.join(format!("{identity}.{RECORD_EXT}")))
    }

    /// Write the record for its identity, replacing any previous one. The
    /// write goes through a temp file in the same directory so readers never
    /// observe a half-written record.
    pub fn save(&self, record: &EncodingRecord) -> Result<()> {
        let path = self.record_path(&record.identity)?;
        let data = postcard::to_allocvec(record).map_err(|e| Error::CorruptRecord {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|source| Error::StoreWrite {
                path: path.clone(),
                source,
            })?;
        tmp.write_all(&data).map_err(|source| Error::StoreWrite {
            path: path.clone(),
            source,
        })?;
        tmp.persist(&path).map_err(|e| Error::StoreWrite {
            path,
            source: e.error,
        })?;
        Ok(())
    }

    pub fn load(&self, identity: &str) -> Result<Option<EncodingRecord>> {
        let path = self.record_path(identity)?;
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    /// All stored records, sorted by identity. The sort fixes the iteration
    /// order the matcher's first-seen tie-break relies on. Unreadable record
    /// files are skipped with a warning so one bad file cannot take down
    /// every login; direct [`EncodingStore::load`] lookups stay strict.
    pub fn load_all(&self) -> Result<Vec<EncodingRecord>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let entries = std::fs::read_dir(&self.dir).map_err(|source| Error::StoreRead {
            path: self.dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| Error::StoreRead {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("skipping unreadable encoding record: {e}"),
            }
        }
        Ok(records)
    }

    pub fn identities(&self) -> Result<Vec<String>> {
        Ok(self
            .load_all()?
            .into_iter()
            .map(|r| r.identity)
            .collect())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.load_all()?.is_empty())
    }

    /// Remove the record for an identity. Returns whether one existed.
    pub fn remove(&self, identity: &str) -> Result<bool> {
        let path = self.record_path(identity)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|source| Error::StoreWrite { path, source })?;
        Ok(true)
    }
}

fn read_record(path: &Path) -> Result<EncodingRecord> {
    let data = std::fs::read(path).map_err(|source| Error::StoreRead {
        path: path.to_path_buf(),
        source,
    })?;
    postcard::from_bytes(&data).map_err(|e| Error::CorruptRecord {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Identity keys become file names, so restrict them accordingly.
fn validate_identity(identity: &str) -> Result<()> {
    let ok = !identity.is_empty()
        && identity
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        && !identity.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidIdentity(identity.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, EncodingStore) {
        let tmp = TempDir::new().unwrap();
        let store = EncodingStore::open(tmp.path().join("encodings")).unwrap();
        (tmp, store)
    }

    #[test]
    fn save_then_load() {
        let (_tmp, store) = store();
        let record = EncodingRecord::new("emp-7", vec![0.1, 0.2, 0.3], 2);
        store.save(&record).unwrap();

        let loaded = store.load("emp-7").unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn load_missing_identity_is_none() {
        let (_tmp, store) = store();
        assert!(store.load("nobody").unwrap().is_none());
    }

    #[test]
    fn save_overwrites_previous_record() {
        let (_tmp, store) = store();
        store
            .save(&EncodingRecord::new("emp-7", vec![1.0, 1.0], 1))
            .unwrap();
        store
            .save(&EncodingRecord::new("emp-7", vec![2.0, 2.0], 3))
            .unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].vector, vec![2.0, 2.0]);
        assert_eq!(all[0].images_used, 3);
    }

    #[test]
    fn load_all_is_sorted_by_identity() {
        let (_tmp, store) = store();
        for id in ["charlie", "alice", "bob"] {
            store.save(&EncodingRecord::new(id, vec![0.0], 1)).unwrap();
        }
        let ids = store.identities().unwrap();
        assert_eq!(ids, vec!["alice", "bob", "charlie"]);
    }

    #[test]
    fn remove_reports_presence() {
        let (_tmp, store) = store();
        store.save(&EncodingRecord::new("emp-7", vec![0.0], 1)).unwrap();
        assert!(store.remove("emp-7").unwrap());
        assert!(!store.remove("emp-7").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn load_all_skips_corrupt_record_files() {
        let (_tmp, store) = store();
        store.save(&EncodingRecord::new("alice", vec![0.1], 1)).unwrap();
        store.save(&EncodingRecord::new("bob", vec![0.2], 1)).unwrap();
        std::fs::write(store.dir().join("mallory.bin"), b"\xff\xfenot postcard").unwrap();

        let ids = store.identities().unwrap();
        assert_eq!(ids, vec!["alice", "bob"]);

        // direct lookup of the bad record still reports the corruption
        assert!(matches!(
            store.load("mallory"),
            Err(Error::CorruptRecord { .. })
        ));
    }

    #[test]
    fn rejects_path_traversal_identities() {
        let (_tmp, store) = store();
        let err = store.load("../etc/passwd").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentity(_)));
        assert!(matches!(store.load(""), Err(Error::InvalidIdentity(_))));
    }
}
