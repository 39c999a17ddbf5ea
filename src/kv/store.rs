use std::path::Path;

use indexmap::IndexMap;
use log::{error, info, warn};

use super::{KvBackend, KvStore};
use crate::{codec, OrmError, Row, Value};

impl<B: KvBackend> KvStore<B> {
    pub fn new(backend: B) -> Self {
        KvStore { backend }
    }

    /// Serialize `value` to JSON text and store it, overwriting any prior
    /// value unconditionally.
    pub fn set(&mut self, key: &str, value: &Row) -> Result<(), OrmError> {
        let text = serde_json::to_string(&codec::row_to_json(value))?;
        match self.backend.set(key, &text) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("set {} failed: {}", key, e);
                Err(e.into())
            }
        }
    }

    /// `None` for a missing or empty entry; a present but non-JSON entry is
    /// malformed data.
    pub fn get(&mut self, key: &str) -> Result<Option<Row>, OrmError> {
        let Some(text) = self.backend.get(key)? else {
            return Ok(None);
        };
        if text.is_empty() {
            return Ok(None);
        }
        let document: serde_json::Value = serde_json::from_str(&text)?;
        let object = document.as_object().ok_or_else(|| {
            OrmError::MalformedData(format!("value at {} is not a JSON mapping", key))
        })?;
        Ok(Some(
            object
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect(),
        ))
    }

    /// Enumerate matching keys and resolve each one. Entries that fail to
    /// deserialize (the pattern may also match values written by something
    /// else) are logged and skipped, so the result can be partial or empty.
    pub fn scan(&mut self, pattern: &str) -> Result<IndexMap<String, Row>, OrmError> {
        let mut keys = self.backend.keys(pattern)?;
        keys.sort();
        let mut entries = IndexMap::new();
        for key in keys {
            match self.get(&key) {
                Ok(Some(row)) => {
                    entries.insert(key, row);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("skipping key {} during scan: {}", key, e);
                }
            }
        }
        Ok(entries)
    }

    /// Shallow-merge `patch` onto the stored mapping, patch wins on
    /// collision; existing keys are never removed. Missing key is a logged
    /// no-op, never an upsert.
    pub fn merge(&mut self, key: &str, patch: &Row) -> Result<(), OrmError> {
        match self.get(key)? {
            None => {
                warn!("key {} not found, merge skipped", key);
                Ok(())
            }
            Some(mut current) => {
                for (k, v) in patch {
                    current.insert(k.clone(), v.clone());
                }
                self.set(key, &current)
            }
        }
    }

    /// Deleting a missing key is a logged no-op.
    pub fn delete(&mut self, key: &str) -> Result<(), OrmError> {
        if !self.backend.del(key)? {
            info!("key {} not found, nothing to delete", key);
        }
        Ok(())
    }

    /// Snapshot of `scan(pattern)` flattened into a table: a `key` column
    /// plus the union of all entry columns, missing cells empty. Logs and
    /// writes nothing when nothing matched.
    pub fn export_as_csv(&mut self, pattern: &str, path: &Path) -> Result<(), OrmError> {
        let entries = self.scan(pattern)?;
        if entries.is_empty() {
            info!("no data matching {:?}, nothing to export", pattern);
            return Ok(());
        }
        codec::write_keyed_csv(path, "key", &entries)?;
        info!("data exported to {} successfully", path.display());
        Ok(())
    }

    /// Snapshot of `scan(pattern)` as one JSON object keyed by the original
    /// key strings.
    pub fn export_as_json(&mut self, pattern: &str, path: &Path) -> Result<(), OrmError> {
        let entries = self.scan(pattern)?;
        if entries.is_empty() {
            info!("no data matching {:?}, nothing to export", pattern);
            return Ok(());
        }
        codec::write_keyed_json(path, &entries)?;
        info!("data exported to {} successfully", path.display());
        Ok(())
    }
}
