//! Invoker configuration.

use belfry_sandbox::DEFAULT_MEMORY_CEILING_BYTES;
use std::time::Duration;

/// Default overall invocation timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default namespace object the bundle is expected to publish.
pub const DEFAULT_NAMESPACE: &str = "MyModule";

/// Default cap on the serialized result size.
const DEFAULT_MAX_RESULT_BYTES: usize = 5 * 1024 * 1024;

/// Tunables for the invocation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokerConfig {
    /// Overall wall-clock budget shared by bundle execution and the
    /// function call.
    pub timeout: Duration,
    /// Heap ceiling applied to each sandbox.
    pub memory_ceiling_bytes: u64,
    /// Global object the bundle publishes its exports on.
    pub namespace: String,
    /// Mirror guest console output into host logs.
    pub dev_mirror_logs: bool,
    /// Reject serialized results larger than this.
    pub max_result_bytes: usize,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            memory_ceiling_bytes: DEFAULT_MEMORY_CEILING_BYTES,
            namespace: DEFAULT_NAMESPACE.to_string(),
            dev_mirror_logs: false,
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
        }
    }
}

impl InvokerConfig {
    /// Defaults: 30s timeout, 128 MiB ceiling, namespace `MyModule`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overall timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the heap ceiling in bytes.
    #[must_use]
    pub fn with_memory_ceiling_bytes(mut self, bytes: u64) -> Self {
        self.memory_ceiling_bytes = bytes;
        self
    }

    /// Set the export namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Mirror guest console output into host logs.
    #[must_use]
    pub fn with_dev_mirror_logs(mut self, mirror: bool) -> Self {
        self.dev_mirror_logs = mirror;
        self
    }

    /// Cap the serialized result size.
    #[must_use]
    pub fn with_max_result_bytes(mut self, bytes: usize) -> Self {
        self.max_result_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InvokerConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(30_000));
        assert_eq!(config.memory_ceiling_bytes, 128 * 1024 * 1024);
        assert_eq!(config.namespace, "MyModule");
        assert!(!config.dev_mirror_logs);
    }

    #[test]
    fn test_builder() {
        let config = InvokerConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_namespace("Functions")
            .with_dev_mirror_logs(true);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.namespace, "Functions");
        assert!(config.dev_mirror_logs);
    }
}
