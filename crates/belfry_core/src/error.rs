//! Invocation error taxonomy.
//!
//! Everything after input validation funnels through one normalized
//! public message at the service boundary; the variants below are the
//! internal classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Invocation result type
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Invocation error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// A required request field is missing or empty
    InvalidInput {
        /// Field that failed validation
        field: String,
    },

    /// Function name fails the identifier grammar
    InvalidFunctionName {
        /// The rejected name
        name: String,
    },

    /// No bundle artifact at the (tenant, file) key
    BundleNotFound {
        /// Tenant component of the key
        tenant: String,
        /// File component of the key
        file: String,
    },

    /// A capability module failed to install into the sandbox
    BridgeInstallFailed {
        /// Capability that failed
        capability: String,
        /// Underlying reason
        reason: String,
    },

    /// Requested export missing or not callable
    FunctionNotFound {
        /// The requested export
        name: String,
    },

    /// Sandboxed code threw
    RuntimeError {
        /// Inner error message
        message: String,
    },

    /// Deadline race fired
    TimedOut {
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// Memory ceiling exceeded, sandbox terminated
    ResourceExhausted {
        /// Configured ceiling in bytes
        ceiling_bytes: u64,
    },

    /// Unexpected host-side failure
    Internal {
        /// Error message
        message: String,
    },
}

impl InvokeError {
    /// Whether this error is rejected before any sandbox is created.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::InvalidFunctionName { .. }
        )
    }

    /// The inner detail, without the `Execution failed` prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidInput { field } => format!("Missing required field: {}", field),
            Self::InvalidFunctionName { name } => format!("Invalid function name: {}", name),
            Self::BundleNotFound { tenant, file } => {
                format!("Bundle not found: {}/{}", tenant, file)
            }
            Self::BridgeInstallFailed { capability, reason } => {
                format!("Failed to install {} capability: {}", capability, reason)
            }
            Self::FunctionNotFound { name } => format!("Function {} not found", name),
            Self::RuntimeError { message } => message.clone(),
            Self::TimedOut { .. } => "Execution timeout".to_string(),
            Self::ResourceExhausted { ceiling_bytes } => {
                format!("Memory limit exceeded ({} bytes)", ceiling_bytes)
            }
            Self::Internal { message } => message.clone(),
        }
    }

    /// The single normalized message callers see in non-debug mode.
    ///
    /// Validation failures keep their own message; everything else is
    /// folded into `Execution failed: <detail>`.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_validation() {
            self.detail()
        } else {
            format!("Execution failed: {}", self.detail())
        }
    }
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.public_message())
    }
}

impl std::error::Error for InvokeError {}

/// Error payload attached to a debug-mode soft result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// Human-readable error message
    pub message: String,
}

impl ErrorDescriptor {
    /// Create a descriptor from an invocation error.
    #[must_use]
    pub fn from_error(err: &InvokeError) -> Self {
        Self {
            message: err.detail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_keep_own_message() {
        let err = InvokeError::InvalidFunctionName {
            name: "a; drop()".to_string(),
        };
        assert!(err.is_validation());
        assert_eq!(err.public_message(), "Invalid function name: a; drop()");
    }

    #[test]
    fn test_runtime_error_is_normalized() {
        let err = InvokeError::RuntimeError {
            message: "boom".to_string(),
        };
        assert!(!err.is_validation());
        assert_eq!(err.public_message(), "Execution failed: boom");
    }

    #[test]
    fn test_timeout_detail() {
        let err = InvokeError::TimedOut { timeout_ms: 30_000 };
        assert_eq!(err.public_message(), "Execution failed: Execution timeout");
    }

    #[test]
    fn test_bundle_not_found_detail() {
        let err = InvokeError::BundleNotFound {
            tenant: "acme".to_string(),
            file: "checkout".to_string(),
        };
        let s = err.public_message();
        assert!(s.contains("acme/checkout"));
        assert!(s.starts_with("Execution failed:"));
    }

    #[test]
    fn test_bridge_install_failed_names_capability() {
        let err = InvokeError::BridgeInstallFailed {
            capability: "fetch".to_string(),
            reason: "shim rejected".to_string(),
        };
        assert!(err.detail().contains("fetch"));
        assert!(err.detail().contains("shim rejected"));
    }

    #[test]
    fn test_error_descriptor_uses_detail() {
        let err = InvokeError::RuntimeError {
            message: "boom".to_string(),
        };
        let desc = ErrorDescriptor::from_error(&err);
        assert_eq!(desc.message, "boom");
    }

    #[test]
    fn test_error_equality() {
        let a = InvokeError::TimedOut { timeout_ms: 100 };
        let b = InvokeError::TimedOut { timeout_ms: 100 };
        assert_eq!(a, b);
        assert_ne!(
            a,
            InvokeError::Internal {
                message: "x".to_string()
            }
        );
    }
}
