//! Artifact store trait, configuration, and errors.

use crate::artifact::{ArtifactKey, BundleArtifact};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum bundle size in bytes (0 = unlimited)
    pub max_bundle_size: usize,
    /// Root directory for filesystem stores
    pub root_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_bundle_size: 10 * 1024 * 1024, // 10 MB
            root_dir: ".belfry/bundles".to_string(),
        }
    }
}

/// Store error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No bundle at the given key
    #[error("Bundle not found: {key}")]
    NotFound {
        /// The missing `{tenantId}/{fileId}` address
        key: String,
    },
    /// Bundle exceeds the configured size cap
    #[error("Bundle too large: {size} bytes (limit: {limit})")]
    BundleTooLarge {
        /// Actual size
        size: usize,
        /// Configured cap
        limit: usize,
    },
    /// Bundle bytes are not valid UTF-8
    #[error("Invalid bundle: {reason}")]
    InvalidBundle {
        /// What was wrong
        reason: String,
    },
    /// Underlying IO failure
    #[error("IO error: {reason}")]
    Io {
        /// OS-level detail
        reason: String,
    },
}

/// Store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of successful reads
    pub read_count: u64,
    /// Number of reads that found nothing
    pub miss_count: u64,
    /// Total bytes served
    pub bytes_read: u64,
}

/// Read access to tenant-partitioned bundles.
///
/// The pipeline only ever reads; publishing bundles is an out-of-band
/// concern.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Retrieve the bundle at `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no bundle exists at the key;
    /// other variants for size and IO failures.
    async fn read(&self, key: &ArtifactKey) -> Result<BundleArtifact, StoreError>;

    /// Whether a bundle exists at `key`, without reading it.
    async fn contains(&self, key: &ArtifactKey) -> bool;

    /// Read-side statistics.
    fn stats(&self) -> StoreStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.max_bundle_size, 10 * 1024 * 1024);
        assert_eq!(config.root_dir, ".belfry/bundles");
    }

    #[test]
    fn test_not_found_display() {
        let err = StoreError::NotFound {
            key: "tenant-a/missing".to_string(),
        };
        assert_eq!(err.to_string(), "Bundle not found: tenant-a/missing");
    }
}
