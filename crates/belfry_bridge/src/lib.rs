//! BELFRY Capability Bridge
//!
//! Re-implemented standard-library surface for sandboxed tenant code:
//! URI codec, query-string parser, console forwarder, and fetch
//! forwarder. Every crossing of the trust boundary copies arguments
//! and results by value; no live host reference is ever reachable from
//! inside a sandbox.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fetch;
pub mod install;
pub mod ops;
pub mod query;
pub mod uri;

pub use fetch::{FetchBackend, FetchError, FetchRequest, FetchResponse, HttpFetcher};
pub use install::{install, install_all, BridgeContext, Capability, InstallError};
pub use ops::{bridge_extension, BridgeSettings, InvocationDeadline, LogSink, ResultCell};
pub use query::SearchParams;
pub use uri::{decode_uri, decode_uri_component, encode_uri, encode_uri_component, UriError};
