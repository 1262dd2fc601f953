//! API request and response types

use serde::Deserialize;
use serde::Serialize;

use crate::remote::cache::CacheStats;

/// Standard response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Gateway status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub configured: bool,
    pub remote_url: String,
    pub cache: CacheStats,
    pub cached_entries: usize,
}

/// Query parameters for the trigger-word route
#[derive(Debug, Deserialize)]
pub struct TriggerWordQuery {
    pub name: String,
    /// Target node for the broadcast; defaults to broadcast-to-all
    #[serde(default = "default_broadcast_target")]
    pub node_id: i64,
}

const fn default_broadcast_target() -> i64 {
    crate::events::BROADCAST_NODE_ID
}

/// Body of the update-node-widget route
#[derive(Debug, Deserialize)]
pub struct WidgetUpdateRequest {
    pub node_id: i64,
    pub widget: String,
    pub value: serde_json::Value,
}

/// Acknowledgment payload for locally handled routes: the real result goes
/// out on the event channel, not in the HTTP body.
#[derive(Debug, Serialize)]
pub struct BroadcastAck {
    pub broadcast: bool,
}

impl BroadcastAck {
    pub const fn sent() -> Self {
        Self { broadcast: true }
    }
}
