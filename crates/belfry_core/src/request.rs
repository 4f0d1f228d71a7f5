//! Invocation request and response envelopes.

use crate::error::{ErrorDescriptor, InvokeError};
use crate::id::{FileId, TenantId};
use crate::log::LogEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Check a function name against the identifier grammar
/// `[A-Za-z_$][A-Za-z0-9_$]*`.
///
/// Anything else is rejected before a sandbox exists, so
/// caller-controlled text can never reach an executable position.
#[must_use]
pub fn is_valid_function_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// One request to call a named export inside a sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Tenant that registered the bundle
    pub tenant_id: TenantId,
    /// Bundle artifact within the tenant
    pub file_id: FileId,
    /// Exported function to call
    pub function_name: String,
    /// Parameter payload passed to the function
    pub params: Value,
    /// Optional caller context forwarded as `customer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Value>,
    /// Debug mode: failures degrade to a soft result with logs
    #[serde(default)]
    pub debug: bool,
}

impl InvocationRequest {
    /// Create a request with required fields only.
    #[must_use]
    pub fn new(tenant_id: TenantId, file_id: FileId, function_name: &str, params: Value) -> Self {
        Self {
            tenant_id,
            file_id,
            function_name: function_name.to_string(),
            params,
            customer: None,
            debug: false,
        }
    }

    /// Attach caller context.
    #[must_use]
    pub fn with_customer(mut self, customer: Value) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Enable debug mode.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Validate the request before any sandbox is created.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a missing function name or a
    /// non-object-compatible params slot, and `InvalidFunctionName`
    /// when the name fails the identifier grammar.
    pub fn validate(&self) -> Result<(), InvokeError> {
        if self.function_name.is_empty() {
            return Err(InvokeError::InvalidInput {
                field: "functionName".to_string(),
            });
        }
        if self.params.is_null() {
            return Err(InvokeError::InvalidInput {
                field: "params".to_string(),
            });
        }
        if !is_valid_function_name(&self.function_name) {
            return Err(InvokeError::InvalidFunctionName {
                name: self.function_name.clone(),
            });
        }
        Ok(())
    }
}

/// The response returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    /// Function return value (or a null placeholder in debug failures)
    pub result: Value,
    /// Captured log entries, emission-ordered
    pub logs: Vec<LogEntry>,
    /// Present only on a debug-mode soft failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

impl InvocationResponse {
    /// Successful response.
    #[must_use]
    pub fn success(result: Value, logs: Vec<LogEntry>) -> Self {
        Self {
            result,
            logs,
            error: None,
        }
    }

    /// Debug-mode soft failure: placeholder value plus whatever logs
    /// were captured before the failure.
    #[must_use]
    pub fn soft_failure(logs: Vec<LogEntry>, error: ErrorDescriptor) -> Self {
        Self {
            result: Value::Null,
            logs,
            error: Some(error),
        }
    }
}
