//! Text/list synchronization engine
//!
//! Keeps each node's free-text lora spec and its structured entry list
//! mutually consistent, propagating changes downstream exactly once per
//! logical change. Reentrancy is guarded by an explicit per-node state
//! machine; text write-back is debounced through a cancellable per-node
//! scheduler.

pub mod reconciler;
pub mod scheduler;

pub use reconciler::SyncReconciler;
pub use reconciler::SyncState;
pub use reconciler::WidgetHost;
pub use scheduler::RewriteScheduler;
