//! BELFRY Invocation Pipeline
//!
//! Drives one request through the full lifecycle: validate, acquire a
//! sandbox, install the capability bridge, load and execute the
//! tenant's bundle, call the named export under the deadline, and
//! release the sandbox unconditionally.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod invoker;
pub mod phase;
mod script;

pub use config::{InvokerConfig, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT_MS};
pub use invoker::Invoker;
pub use phase::InvokePhase;
