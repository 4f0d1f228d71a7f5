//! Bounded JavaScript sandbox lifecycle.
//!
//! A [`Sandbox`] wraps one V8 isolate with a hard heap ceiling and a
//! wall-clock watchdog. Sandboxes are created fresh per invocation and
//! released by drop; nothing inside an isolate outlives it.
//!
//! Isolates are not `Send`, so a sandbox must be created, driven, and
//! dropped on a single thread. The invoker owns that thread.

#![warn(missing_docs)]

mod factory;
mod isolate;
mod limits;

pub use factory::{IsolateFactory, SandboxFactory};
pub use isolate::{Sandbox, SandboxError};
pub use limits::{SandboxLimits, DEFAULT_MEMORY_CEILING_BYTES};
