//! JSON file breaker store.
//!
//! All keys share one file holding a JSON object of key → record. Every save
//! rewrites the file through a temporary sibling and a rename, so a crash
//! mid-write leaves the previous contents intact.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::persistence::{BreakerStore, PersistedBreakerRecord, StoreError};

type RecordMap = HashMap<String, PersistedBreakerRecord>;

/// Breaker store backed by a JSON file on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<RecordMap, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecordMap::new()),
            Err(e) => return Err(e.into()),
        };
        let map = serde_json::from_reader(BufReader::new(file))?;
        Ok(map)
    }

    fn write_all(&self, map: &RecordMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, map)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl BreakerStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<PersistedBreakerRecord>, StoreError> {
        Ok(self.read_all()?.get(key).copied())
    }

    fn save(&self, key: &str, record: &PersistedBreakerRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("file store mutex poisoned");

        let mut map = match self.read_all() {
            Ok(map) => map,
            Err(StoreError::Serde(e)) => {
                tracing::warn!(
                    path = ?self.path,
                    error = %e,
                    "Breaker store file is corrupt, rewriting"
                );
                RecordMap::new()
            }
            Err(e) => return Err(e),
        };
        map.insert(key.to_string(), *record);
        self.write_all(&map)?;

        tracing::trace!(path = ?self.path, key = %key, records = map.len(), "Saved breaker record");
        Ok(())
    }
}
