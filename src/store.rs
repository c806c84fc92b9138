//! Flat-file JSON collections.
//!
//! Each collection is one file holding a JSON array of objects. Reads are
//! lock-free; read-modify-write cycles go through a [`Transaction`] which
//! holds the collection's write lock until it is committed or dropped, so
//! concurrent writers cannot lose each other's updates. Commits replace the
//! file by rename, so lock-free readers never observe a half-written array.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{} is not a JSON array of objects: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    id_floor: i64,
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// `id_floor` is the id the first generated id counts up from.
    pub fn new<P: Into<PathBuf>>(path: P, id_floor: i64) -> Self {
        Self {
            path: path.into(),
            id_floor,
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the collection. A missing file is an empty collection.
    pub async fn load(&self) -> Result<Vec<Record>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "collection file missing, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Like [`JsonStore::load`], but an unreadable collection is logged and
    /// treated as empty.
    pub async fn read_all(&self) -> Vec<Record> {
        match self.load().await {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, "reading collection failed");
                Vec::new()
            }
        }
    }

    /// Takes the write lock and loads the current records.
    pub async fn begin(&self) -> Transaction<'_> {
        let guard = self.write_lock.lock().await;
        let records = self.read_all().await;
        Transaction {
            store: self,
            _guard: guard,
            records,
        }
    }

    /// Highest id in `records` (or the floor) plus one.
    pub fn next_id(&self, records: &[Record]) -> i64 {
        records
            .iter()
            .filter_map(record_id)
            .fold(self.id_floor, i64::max)
            + 1
    }

    /// Writes the whole collection to a sibling staging file and renames it
    /// over the target, so readers see either the old or the new contents.
    async fn save(&self, records: &[Record]) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        records.serialize(&mut serializer)?;

        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let staging = self.staging_path();
        tokio::fs::write(&staging, buf).await.map_err(write_err)?;
        if let Err(source) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(write_err(source));
        }
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Exclusive read-modify-write access to a collection.
pub struct Transaction<'s> {
    store: &'s JsonStore,
    _guard: MutexGuard<'s, ()>,
    pub records: Vec<Record>,
}

impl Transaction<'_> {
    pub fn next_id(&self) -> i64 {
        self.store.next_id(&self.records)
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record_id(record) == Some(id))
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.store.save(&self.records).await
    }
}

pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}
