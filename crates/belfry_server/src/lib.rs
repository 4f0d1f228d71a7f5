//! BELFRY Server
//!
//! HTTP API in front of the invocation pipeline.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;

pub use api::{build_router, AppState, ServerConfig};
