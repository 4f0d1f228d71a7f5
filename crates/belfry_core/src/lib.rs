//! BELFRY Core Types
//!
//! This crate contains pure types and logic with no I/O: tenant/file
//! identifiers, the invocation request/response envelopes, captured log
//! entries, and the invocation error taxonomy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod log;
pub mod request;

// Re-exports
pub use error::{ErrorDescriptor, InvokeError, InvokeResult};
pub use id::{FileId, IdError, TenantId};
pub use log::{LogEntry, LogLevel};
pub use request::{is_valid_function_name, InvocationRequest, InvocationResponse};
