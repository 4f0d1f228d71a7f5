//! In-memory artifact store, used by tests and the demo server mode.

use crate::artifact::{ArtifactKey, BundleArtifact};
use crate::store::{ArtifactStore, StoreError, StoreStats};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Map-backed bundle store.
#[derive(Default)]
pub struct MemoryArtifactStore {
    bundles: RwLock<HashMap<ArtifactKey, String>>,
    stats: RwLock<StoreStats>,
}

impl MemoryArtifactStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the bundle at `key`.
    pub fn put(&self, key: ArtifactKey, source: impl Into<String>) {
        if let Ok(mut bundles) = self.bundles.write() {
            bundles.insert(key, source.into());
        }
    }

    /// Number of stored bundles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bundles.read().map(|b| b.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn read(&self, key: &ArtifactKey) -> Result<BundleArtifact, StoreError> {
        let source = self
            .bundles
            .read()
            .ok()
            .and_then(|bundles| bundles.get(key).cloned());
        match source {
            Some(source) => {
                if let Ok(mut stats) = self.stats.write() {
                    stats.read_count += 1;
                    stats.bytes_read += source.len() as u64;
                }
                Ok(BundleArtifact::new(key.clone(), source))
            }
            None => {
                if let Ok(mut stats) = self.stats.write() {
                    stats.miss_count += 1;
                }
                Err(StoreError::NotFound {
                    key: key.to_string(),
                })
            }
        }
    }

    async fn contains(&self, key: &ArtifactKey) -> bool {
        self.bundles
            .read()
            .map(|bundles| bundles.contains_key(key))
            .unwrap_or(false)
    }

    fn stats(&self) -> StoreStats {
        self.stats.read().map(|s| *s).unwrap_or_default()
    }
}
