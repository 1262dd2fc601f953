//! Remote metadata gateway
//!
//! Everything that talks to the remote LoRA manager instance: the cached
//! HTTP client for metadata endpoints, the reverse-proxy route table, and
//! the request forwarder. Model files themselves never cross this boundary;
//! only descriptive metadata does.

pub mod cache;
pub mod client;
pub mod proxy;
pub mod routes;

pub use cache::Fetched;
pub use cache::Freshness;
pub use cache::MetadataCache;
pub use client::RemoteClient;
pub use proxy::ProxyForwarder;
pub use routes::Disposition;
pub use routes::LocalAction;
pub use routes::RoutePattern;
pub use routes::RouteRule;
pub use routes::RouteTable;

use crate::LoraBridgeError;

/// Classify a transport-level failure from the HTTP client.
pub(crate) fn map_transport_error(err: reqwest::Error, timeout_secs: u64) -> LoraBridgeError {
    if err.is_timeout() {
        LoraBridgeError::RemoteTimeout(timeout_secs)
    } else if err.is_connect() {
        LoraBridgeError::RemoteUnreachable(err.to_string())
    } else {
        LoraBridgeError::Reqwest(err)
    }
}
