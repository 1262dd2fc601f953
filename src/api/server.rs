//! HTTP server implementation

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::events::EventBus;
use crate::remote::MetadataCache;
use crate::remote::ProxyForwarder;
use crate::remote::RemoteClient;
use crate::remote::RouteTable;
use crate::Result;

/// Access log middleware to log all HTTP requests
async fn access_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    tracing::info!("→ {} {}", method, uri);

    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!("← {} {}ms", response.status(), duration.as_millis());

    response
}

/// Build the shared state for a server (or for tests driving the router
/// directly).
pub fn build_state(config: AppConfig) -> Result<AppState> {
    let config = Arc::new(config);
    let cache = Arc::new(MetadataCache::new(&config.cache, Arc::new(SystemClock)));
    let client = Arc::new(RemoteClient::new(config.clone(), cache.clone())?);
    let forwarder = Arc::new(ProxyForwarder::new(config.clone())?);

    Ok(AppState {
        config,
        client,
        cache,
        routes: Arc::new(RouteTable::lora_manager_defaults()),
        forwarder,
        events: EventBus::default(),
    })
}

/// Start the gateway server.
pub async fn serve(config: AppConfig, host: String, port: u16) -> Result<()> {
    if config.is_configured() {
        info!("Proxying manager routes to {}", config.remote.url);
    } else {
        info!("No remote_url configured; proxy routes will answer 502");
    }

    let state = build_state(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::api_routes(state)
        .layer(axum::middleware::from_fn(access_log_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("{host}:{port}");
    info!("Gateway listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
