//! BELFRY Artifact Store
//!
//! Tenant-partitioned storage of compiled function bundles. Artifacts
//! are addressed by `{tenantId}/{fileId}`; a tenant can never name a
//! path outside its own partition because both segments are validated
//! identifiers, not paths.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod fs;
pub mod memory;
pub mod store;

pub use artifact::{ArtifactKey, BundleArtifact};
pub use fs::FsArtifactStore;
pub use memory::MemoryArtifactStore;
pub use store::{ArtifactStore, StoreConfig, StoreError, StoreStats};
