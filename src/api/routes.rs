//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create the gateway router: introspection endpoints, the locally handled
/// manager routes, and the proxy fallback for everything else.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Introspection
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/routes", get(handlers::list_routes))
        // Locally handled manager routes (these broadcast to the local
        // front end; forwarding them would broadcast on the remote instead)
        .route(
            "/api/lm/loras/get_trigger_words",
            get(handlers::get_trigger_words),
        )
        .route("/api/lm/update-lora-code", post(handlers::update_lora_code))
        .route(
            "/api/lm/update-node-widget",
            post(handlers::update_node_widget),
        )
        .route("/api/lm/register-nodes", post(handlers::register_nodes))
        // Everything else the route table claims is proxied
        .fallback(handlers::proxy_fallback)
        .with_state(state)
}
