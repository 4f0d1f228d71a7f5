//! Sandbox provisioning seam.
//!
//! The invoker acquires sandboxes through [`SandboxFactory`] so the
//! provisioning policy (fresh isolate per invocation today, pooling
//! later) can change without touching the invocation pipeline, and so
//! tests can count or fail acquisitions.

use crate::isolate::{Sandbox, SandboxError};
use crate::limits::SandboxLimits;

/// Provides sandboxes to the invocation pipeline.
///
/// `create` is called on the thread that will drive the sandbox;
/// implementations must not move the returned sandbox elsewhere.
pub trait SandboxFactory: Send + Sync {
    /// Provision one sandbox under the given limits.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Create`] when provisioning fails.
    fn create(&self, limits: &SandboxLimits) -> Result<Sandbox, SandboxError>;
}

/// Default policy: a fresh isolate per invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolateFactory;

impl IsolateFactory {
    /// Create the default factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SandboxFactory for IsolateFactory {
    fn create(&self, limits: &SandboxLimits) -> Result<Sandbox, SandboxError> {
        Sandbox::new(limits)
    }
}
