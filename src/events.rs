//! Widget-facing event channel
//!
//! Local listeners (the editor front end) subscribe to a broadcast channel;
//! locally handled gateway routes publish their results here instead of in
//! the HTTP response body.

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::broadcast;

/// Node id meaning "deliver to every registered node".
pub const BROADCAST_NODE_ID: i64 = -1;

/// How an inbound lora-code payload is applied to a node's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    Append,
    Replace,
}

/// Inbound code-update request from the editor or the remote UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeUpdate {
    /// Target node, or [`BROADCAST_NODE_ID`] for all registered nodes
    pub node_id: i64,
    #[serde(default)]
    pub graph_id: String,
    pub lora_code: String,
    pub mode: UpdateMode,
}

/// Outbound events broadcast to local listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    TriggerWordUpdate {
        node_id: i64,
        trigger_words: Vec<String>,
    },
    WidgetUpdate {
        node_id: i64,
        widget: String,
        value: serde_json::Value,
    },
    LoraCodeUpdate {
        node_id: i64,
        graph_id: String,
        lora_code: String,
        mode: UpdateMode,
    },
    RegistryRefresh,
}

/// Broadcast channel for [`BridgeEvent`]s.
///
/// Cheap to clone; emitting with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn emit(&self, event: BridgeEvent) {
        let receivers = self.tx.receiver_count();
        if self.tx.send(event).is_err() {
            tracing::debug!("Event dropped: no subscribers");
        } else {
            tracing::debug!("Event broadcast to {} subscriber(s)", receivers);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
