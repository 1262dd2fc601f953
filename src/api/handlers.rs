//! API request handlers

use std::sync::Arc;

use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use tracing::info;
use tracing::warn;

use crate::api::types::ApiResponse;
use crate::api::types::BroadcastAck;
use crate::api::types::HealthResponse;
use crate::api::types::StatusResponse;
use crate::api::types::TriggerWordQuery;
use crate::api::types::WidgetUpdateRequest;
use crate::config::AppConfig;
use crate::events::BridgeEvent;
use crate::events::CodeUpdate;
use crate::events::EventBus;
use crate::remote::Disposition;
use crate::remote::MetadataCache;
use crate::remote::ProxyForwarder;
use crate::remote::RemoteClient;
use crate::remote::RouteRule;
use crate::remote::RouteTable;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub client: Arc<RemoteClient>,
    pub cache: Arc<MetadataCache>,
    pub routes: Arc<RouteTable>,
    pub forwarder: Arc<ProxyForwarder>,
    pub events: EventBus,
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Gateway status: configuration plus cache statistics
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    Json(ApiResponse::success(StatusResponse {
        configured: state.config.is_configured(),
        remote_url: state.config.remote.url.clone(),
        cache: state.cache.stats().await,
        cached_entries: state.cache.len().await,
    }))
}

/// The active proxy route table
pub async fn list_routes(State(state): State<AppState>) -> Json<ApiResponse<Vec<RouteRule>>> {
    Json(ApiResponse::success(state.routes.rules().to_vec()))
}

/// Locally handled: fetch trigger words from the remote, broadcast them to
/// local listeners, acknowledge to the caller.
pub async fn get_trigger_words(
    State(state): State<AppState>,
    Query(query): Query<TriggerWordQuery>,
) -> Json<ApiResponse<BroadcastAck>> {
    let (_, trigger_words) = state.client.lora_info(&query.name).await;
    state.events.emit(BridgeEvent::TriggerWordUpdate {
        node_id: query.node_id,
        trigger_words,
    });
    Json(ApiResponse::success(BroadcastAck::sent()))
}

/// Locally handled: broadcast a lora-code update to the nodes.
pub async fn update_lora_code(
    State(state): State<AppState>,
    Json(update): Json<CodeUpdate>,
) -> Json<ApiResponse<BroadcastAck>> {
    info!(
        "Lora code update for node {} ({:?})",
        update.node_id, update.mode
    );
    state.events.emit(BridgeEvent::LoraCodeUpdate {
        node_id: update.node_id,
        graph_id: update.graph_id,
        lora_code: update.lora_code,
        mode: update.mode,
    });
    Json(ApiResponse::success(BroadcastAck::sent()))
}

/// Locally handled: broadcast a widget value update.
pub async fn update_node_widget(
    State(state): State<AppState>,
    Json(request): Json<WidgetUpdateRequest>,
) -> Json<ApiResponse<BroadcastAck>> {
    state.events.emit(BridgeEvent::WidgetUpdate {
        node_id: request.node_id,
        widget: request.widget,
        value: request.value,
    });
    Json(ApiResponse::success(BroadcastAck::sent()))
}

/// Locally handled: ask registered nodes to re-announce themselves.
pub async fn register_nodes(State(state): State<AppState>) -> Json<ApiResponse<BroadcastAck>> {
    state.events.emit(BridgeEvent::RegistryRefresh);
    Json(ApiResponse::success(BroadcastAck::sent()))
}

/// Fallback handler: consult the route table and forward what it claims.
///
/// Local-handle routes are registered explicitly on the router and never
/// reach this handler; an unmatched path is a logged 404.
pub async fn proxy_fallback(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), ToString::to_string);
    let headers = request.headers().clone();

    let rule = match state.routes.route(&path) {
        Ok(rule) => rule,
        Err(err) => {
            warn!("{err}");
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": format!("No route for {path}")})),
            )
                .into_response();
        }
    };

    match rule.disposition {
        Disposition::Forward => {
            let body = match axum::body::to_bytes(request.into_body(), usize::MAX).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"error": format!("Failed to read request body: {err}")})),
                    )
                        .into_response();
                }
            };
            match state
                .forwarder
                .forward(&method, &path_and_query, &headers, body)
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    tracing::error!("Proxy error for {method} {path}: {err}");
                    (
                        StatusCode::BAD_GATEWAY,
                        Json(json!({"error": format!("Remote instance unavailable: {err}")})),
                    )
                        .into_response()
                }
            }
        }
        Disposition::LocalHandle(action) => {
            warn!("Local-handle route {path} ({action:?}) reached the proxy fallback");
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": format!("No local handler mounted for {path}")})),
            )
                .into_response()
        }
    }
}
