//! Filesystem-backed artifact store.
//!
//! Layout: `{root}/{tenantId}/{fileId}.js`. Both path segments come
//! from validated identifiers, so no key can escape the root.

use crate::artifact::{ArtifactKey, BundleArtifact};
use crate::store::{ArtifactStore, StoreConfig, StoreError, StoreStats};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Bundle store rooted at a directory.
pub struct FsArtifactStore {
    config: StoreConfig,
    root: PathBuf,
    read_count: AtomicU64,
    miss_count: AtomicU64,
    bytes_read: AtomicU64,
}

impl FsArtifactStore {
    /// Store rooted at `root` with default limits.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let config = StoreConfig {
            root_dir: root.to_string_lossy().into_owned(),
            ..StoreConfig::default()
        };
        Self::with_config(config)
    }

    /// Store built from explicit configuration.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        let root = PathBuf::from(&config.root_dir);
        Self {
            config,
            root,
            read_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
        }
    }

    fn bundle_path(&self, key: &ArtifactKey) -> PathBuf {
        self.root
            .join(key.tenant.as_str())
            .join(format!("{}.js", key.file.as_str()))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn read(&self, key: &ArtifactKey) -> Result<BundleArtifact, StoreError> {
        let path = self.bundle_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "bundle not found");
                return Err(StoreError::NotFound {
                    key: key.to_string(),
                });
            }
            Err(e) => {
                return Err(StoreError::Io {
                    reason: e.to_string(),
                });
            }
        };

        if self.config.max_bundle_size != 0 && bytes.len() > self.config.max_bundle_size {
            return Err(StoreError::BundleTooLarge {
                size: bytes.len(),
                limit: self.config.max_bundle_size,
            });
        }

        let source = String::from_utf8(bytes).map_err(|e| StoreError::InvalidBundle {
            reason: e.to_string(),
        })?;

        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.bytes_read
            .fetch_add(source.len() as u64, Ordering::Relaxed);
        Ok(BundleArtifact::new(key.clone(), source))
    }

    async fn contains(&self, key: &ArtifactKey) -> bool {
        tokio::fs::try_exists(self.bundle_path(key))
            .await
            .unwrap_or(false)
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            read_count: self.read_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use belfry_core::{FileId, TenantId};

    fn make_key(tenant: &str, file: &str) -> ArtifactKey {
        ArtifactKey::new(
            TenantId::parse(tenant).unwrap(),
            FileId::parse(file).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let tenant_dir = dir.path().join("tenant-a");
        std::fs::create_dir_all(&tenant_dir).unwrap();
        std::fs::write(tenant_dir.join("bundle-1.js"), "var x = 1;").unwrap();

        let store = FsArtifactStore::new(dir.path());
        let artifact = store.read(&make_key("tenant-a", "bundle-1")).await.unwrap();
        assert_eq!(artifact.source, "var x = 1;");
        assert_eq!(store.stats().read_count, 1);
    }

    #[tokio::test]
    async fn test_missing_bundle_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let err = store
            .read(&make_key("tenant-a", "absent"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.stats().miss_count, 1);
    }

    #[tokio::test]
    async fn test_tenants_are_partitioned() {
        let dir = tempfile::tempdir().unwrap();
        let tenant_dir = dir.path().join("tenant-a");
        std::fs::create_dir_all(&tenant_dir).unwrap();
        std::fs::write(tenant_dir.join("shared.js"), "var a = 1;").unwrap();

        let store = FsArtifactStore::new(dir.path());
        assert!(store.contains(&make_key("tenant-a", "shared")).await);
        assert!(!store.contains(&make_key("tenant-b", "shared")).await);
    }

    #[tokio::test]
    async fn test_oversized_bundle_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tenant_dir = dir.path().join("tenant-a");
        std::fs::create_dir_all(&tenant_dir).unwrap();
        std::fs::write(tenant_dir.join("big.js"), "x".repeat(32)).unwrap();

        let store = FsArtifactStore::with_config(StoreConfig {
            max_bundle_size: 16,
            root_dir: dir.path().to_string_lossy().into_owned(),
        });
        let err = store.read(&make_key("tenant-a", "big")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::BundleTooLarge { size: 32, limit: 16 }
        ));
    }
}
