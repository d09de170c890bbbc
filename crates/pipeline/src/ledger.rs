//! Persisted usage ledger and its storage backends.
//!
//! The ledger maps content hashes to their last-known public location and
//! use time. Its only purpose is enabling a later cleanup pass to find
//! unreferenced assets; the pipeline itself never deletes files. Storage is
//! injected behind [`LedgerStore`] so tests run against an in-memory map
//! while builds persist JSON.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One ledger entry, keyed externally by content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Lowercased original extension, including the dot.
    pub ext: String,
    /// Public path the asset was placed at.
    pub path: String,
    /// When the asset was last referenced by a build.
    pub last_used: DateTime<Utc>,
}

/// Content hash → entry map, persisted across builds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageLedger {
    entries: BTreeMap<String, LedgerEntry>,
}

impl UsageLedger {
    /// Record a use of the hashed asset, inserting or refreshing its entry.
    /// One hash never yields more than one entry.
    pub fn touch(&mut self, hash: &str, ext: &str, path: &str, now: DateTime<Utc>) {
        self.entries.insert(
            hash.to_string(),
            LedgerEntry {
                ext: ext.to_string(),
                path: path.to_string(),
                last_used: now,
            },
        );
    }

    /// Entry for a content hash.
    pub fn get(&self, hash: &str) -> Option<&LedgerEntry> {
        self.entries.get(hash)
    }

    /// Number of tracked assets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in hash order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LedgerEntry)> {
        self.entries.iter()
    }
}

/// Storage backend for the usage ledger.
pub trait LedgerStore: Send + Sync {
    /// Load the ledger. Backends recover from missing or corrupt state by
    /// returning an empty ledger; load never fails a build.
    fn load(&self) -> UsageLedger;

    /// Persist the ledger in full, replacing previous contents.
    fn save(&self, ledger: &UsageLedger) -> Result<(), PipelineError>;
}

/// JSON file persistence (the production backend).
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> UsageLedger {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return UsageLedger::default(),
            Err(err) => {
                log::warn!(
                    "usage ledger {} unreadable ({}), starting empty",
                    self.path.display(),
                    err
                );
                return UsageLedger::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(ledger) => ledger,
            Err(err) => {
                log::warn!(
                    "usage ledger {} corrupt ({}), starting empty",
                    self.path.display(),
                    err
                );
                UsageLedger::default()
            }
        }
    }

    fn save(&self, ledger: &UsageLedger) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(ledger).map_err(|err| {
            PipelineError::LedgerSave {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, err),
            }
        })?;
        fs::write(&self.path, json).map_err(|err| PipelineError::LedgerSave {
            path: self.path.clone(),
            source: err,
        })
    }
}

/// In-memory persistence for tests; clones share one map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<UsageLedger>>,
}

impl MemoryStore {
    /// Empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the last saved ledger.
    pub fn snapshot(&self) -> UsageLedger {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> UsageLedger {
        self.snapshot()
    }

    fn save(&self, ledger: &UsageLedger) -> Result<(), PipelineError> {
        *self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = ledger.clone();
        Ok(())
    }
}
