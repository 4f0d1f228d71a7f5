//! Resource limits applied to a sandbox at creation time.

/// Default heap ceiling: 128 MiB.
pub const DEFAULT_MEMORY_CEILING_BYTES: u64 = 128 * 1024 * 1024;

/// Hard resource bounds for one sandbox.
///
/// The memory ceiling is enforced by the engine's heap limit; the time
/// bound is supplied per evaluation, not here, because one sandbox may
/// run several scripts under one shared deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    /// Heap ceiling in bytes. Exceeding it terminates execution.
    pub memory_ceiling_bytes: u64,
    /// Whether guest failures are surfaced softly (logs kept, partial
    /// response) instead of failing the invocation outright.
    pub debugging_enabled: bool,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            memory_ceiling_bytes: DEFAULT_MEMORY_CEILING_BYTES,
            debugging_enabled: false,
        }
    }
}

impl SandboxLimits {
    /// Limits with the default 128 MiB ceiling and debugging off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the heap ceiling in bytes.
    #[must_use]
    pub fn with_memory_ceiling_bytes(mut self, bytes: u64) -> Self {
        self.memory_ceiling_bytes = bytes;
        self
    }

    /// Enable or disable debug-mode soft failures.
    #[must_use]
    pub fn with_debugging_enabled(mut self, enabled: bool) -> Self {
        self.debugging_enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ceiling_is_128_mib() {
        assert_eq!(SandboxLimits::default().memory_ceiling_bytes, 128 * 1024 * 1024);
        assert!(!SandboxLimits::default().debugging_enabled);
    }

    #[test]
    fn test_builder_overrides() {
        let limits = SandboxLimits::new()
            .with_memory_ceiling_bytes(64 * 1024 * 1024)
            .with_debugging_enabled(true);
        assert_eq!(limits.memory_ceiling_bytes, 64 * 1024 * 1024);
        assert!(limits.debugging_enabled);
    }
}
