//! HTTP API server
//!
//! Hosts the locally handled gateway routes, a few introspection endpoints,
//! and the reverse-proxy fallback that forwards everything else the route
//! table claims to the remote instance.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use server::serve;
