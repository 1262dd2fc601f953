//! lorabridge: remote LoRA metadata bridge
//!
//! Bridges a graphical node-editor front end to a remote LoRA manager
//! instance: heavy model files stay on local mounts while descriptive
//! metadata (trigger words, hashes, pool membership) is fetched over the
//! manager's HTTP API.
//!
//! # Features
//!
//! - **Spec text codec**: `<lora:name:strength>` DSL ⇄ structured entry
//!   lists, with surgical re-encoding that never touches surrounding text
//! - **Chain collection**: pure active-set computation over an immutable
//!   node-graph snapshot
//! - **Sync engine**: per-node state machine reconciling text and widget
//!   edits without feedback loops, with debounced write-back
//! - **Remote gateway**: TTL-cached metadata client plus a selective
//!   reverse proxy that forwards manager routes and handles
//!   event-broadcasting routes locally
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lorabridge::{codec, AppConfig};
//!
//! # fn main() -> lorabridge::Result<()> {
//! let config = AppConfig::load()?;
//!
//! let entries = codec::decode("a prompt <lora:style:0.8>");
//! assert_eq!(entries[0].name, "style");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            CLI / API Layer                  │
//! ├──────────────┬──────────────────────────────┤
//! │  Sync Engine │      Remote Gateway          │
//! │  (reconciler,│  (client, cache, routes,     │
//! │   scheduler) │   proxy forwarder)           │
//! ├──────────────┴──────────────────────────────┤
//! │      Codec / Graph / Events / Config        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod cli;
pub mod clock;
pub mod codec;
pub mod config;
pub mod errors;
pub mod events;
pub mod graph;
pub mod logging;
pub mod remote;
pub mod sync;

pub use codec::LoraEntry;
pub use config::AppConfig;
pub use errors::LoraBridgeError;
pub use errors::Result;
pub use events::BridgeEvent;
pub use events::EventBus;
pub use graph::collect_active;
pub use graph::GraphSnapshot;
pub use remote::MetadataCache;
pub use remote::RemoteClient;
pub use remote::RouteTable;
pub use sync::SyncReconciler;
