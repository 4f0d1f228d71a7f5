//! Bundle artifacts and their addressing key.

use belfry_core::{FileId, TenantId};
use std::fmt;

/// Address of one stored bundle: `{tenantId}/{fileId}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    /// Owning tenant
    pub tenant: TenantId,
    /// Bundle file identifier
    pub file: FileId,
}

impl ArtifactKey {
    /// Build a key from validated identifiers.
    #[must_use]
    pub fn new(tenant: TenantId, file: FileId) -> Self {
        Self { tenant, file }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant, self.file)
    }
}

/// One retrieved bundle: the JavaScript source plus its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleArtifact {
    /// Where this bundle came from
    pub key: ArtifactKey,
    /// The bundle source text
    pub source: String,
}

impl BundleArtifact {
    /// Wrap retrieved source with its key.
    #[must_use]
    pub fn new(key: ArtifactKey, source: String) -> Self {
        Self { key, source }
    }

    /// Size of the source in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Whether the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_key() -> ArtifactKey {
        ArtifactKey::new(
            TenantId::parse("tenant-a").unwrap(),
            FileId::parse("bundle-1").unwrap(),
        )
    }

    #[test]
    fn test_key_display_is_slash_joined() {
        assert_eq!(make_key().to_string(), "tenant-a/bundle-1");
    }

    #[test]
    fn test_artifact_len() {
        let artifact = BundleArtifact::new(make_key(), "module.exports = {};".to_string());
        assert_eq!(artifact.len(), 20);
        assert!(!artifact.is_empty());
    }
}
