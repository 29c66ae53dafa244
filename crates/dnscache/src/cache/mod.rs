mod entry;

pub use entry::{CacheKey, CacheValue, KeyKind};

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    key: CacheKey,
    value: CacheValue,
}

#[derive(Serialize)]
struct SnapshotEntryRef<'a> {
    key: &'a CacheKey,
    value: &'a CacheValue,
}

/// Cached record sets keyed by query name and type.
///
/// The store is owned by a single dispatcher, so it carries no locking of its own.
#[derive(Debug, Default, PartialEq)]
pub struct Store {
    entries: HashMap<CacheKey, CacheValue>,
}

impl Store {
    pub fn new() -> Self {
        Default::default()
    }

    /// Reads a snapshot written by [`Store::save`].
    ///
    /// Never fails: a missing, unreadable or corrupt snapshot results in an empty store.
    pub async fn load(path: &Path) -> Self {
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(?path, "No cache snapshot found, starting with an empty cache");
                return Store::new();
            }
            Err(e) => {
                tracing::warn!(?path, "Failed to read the cache snapshot: {}", e);
                return Store::new();
            }
        };

        match serde_json::from_slice::<Vec<SnapshotEntry>>(&contents) {
            Ok(entries) => Store {
                entries: entries
                    .into_iter()
                    .map(|entry| (entry.key, entry.value))
                    .collect(),
            },
            Err(e) => {
                tracing::warn!(?path, "Cache snapshot is corrupt, ignoring it: {}", e);
                Store::new()
            }
        }
    }

    /// Startup path: loads the snapshot and drops whatever expired while the process was down.
    pub async fn restore(path: &Path, now: u64) -> Self {
        let mut store = Store::load(path).await;
        let removed = store.sweep_expired(now);

        tracing::info!(entries = store.len(), removed, "Loaded cache snapshot");
        for (key, value) in store.iter() {
            tracing::debug!(
                name = key.name(),
                kind = ?key.kind(),
                expiry_time = value.expiry_time,
                authoritative = value.authoritative,
                records = value.records.len(),
                "Restored entry"
            );
        }

        store
    }

    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        let snapshot: Vec<_> = self
            .entries
            .iter()
            .map(|(key, value)| SnapshotEntryRef { key, value })
            .collect();
        let encoded = serde_json::to_vec(&snapshot).context("failed to serialize the cache")?;

        // Replace the previous snapshot atomically
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, encoded)
            .await
            .with_context(|| format!("failed to write the cache snapshot to {:?}", tmp_path))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .with_context(|| format!("failed to move the cache snapshot to {:?}", path))?;

        Ok(())
    }

    /// Removes every entry whose expiry time is already in the past.
    ///
    /// Returns the number of removed entries.
    pub fn sweep_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, value| !value.is_expired(now));
        before - self.entries.len()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheValue> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: CacheKey, value: CacheValue) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &CacheValue)> {
        self.entries.iter()
    }
}
