//! Per-node synchronization state machine
//!
//! Each node owns a structured entry list and a free-text spec; edits arrive
//! from either side. The reconciler normalizes an edit through the codec,
//! recomputes the active set through the chain collector, notifies
//! collaborators once, and schedules a debounced text write-back when the
//! structured side changed. An explicit state enum guards against a
//! collaborator callback re-entering mid-pass and cascading updates back
//! into the side that produced them.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::codec;
use crate::codec::LoraEntry;
use crate::events::CodeUpdate;
use crate::events::UpdateMode;
use crate::events::BROADCAST_NODE_ID;
use crate::graph::collect_active;
use crate::graph::GraphSnapshot;
use crate::graph::NodeId;
use crate::sync::scheduler::RewriteScheduler;

/// Reconciliation state of one node.
///
/// `Updating` and `SyncingInput` are reentrancy guards, not concurrent
/// states: the host runs a cooperative event model, so a pass runs to
/// completion before the next callback is dispatched. An edit arriving while
/// a pass is in flight is dropped, not queued; the edit already in flight
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// A normalization/propagation pass is in progress
    Updating,
    /// A debounced text rewrite is being written back
    SyncingInput,
}

/// The widget side of a node: an opaque mutable text cell with change
/// notification, plus the collaborators interested in the active set.
pub trait WidgetHost {
    /// Current text of the node's spec widget, `None` if the widget is gone.
    fn current_text(&self, node: NodeId) -> Option<String>;
    /// Write the spec widget's text.
    fn set_text(&mut self, node: NodeId, text: &str);
    /// The set of active entry names changed; update trigger-word display.
    fn notify_active_set(&mut self, node: NodeId, active: &BTreeSet<String>);
    /// Push the change to downstream chain nodes.
    fn propagate(&mut self, node: NodeId);
}

#[derive(Debug, Default)]
struct NodeState {
    entries: Vec<LoraEntry>,
    state: SyncState,
}

/// Synchronization engine over all registered node instances.
pub struct SyncReconciler {
    nodes: HashMap<NodeId, NodeState>,
    scheduler: RewriteScheduler,
}

impl SyncReconciler {
    #[must_use]
    pub fn new(debounce: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            nodes: HashMap::new(),
            scheduler: RewriteScheduler::new(debounce, clock),
        }
    }

    /// Register a node with its initially loaded entry list.
    pub fn register(&mut self, node: NodeId, entries: Vec<LoraEntry>) {
        self.nodes.insert(
            node,
            NodeState {
                entries,
                state: SyncState::Idle,
            },
        );
    }

    /// Remove a node, cancelling any pending rewrite.
    pub fn unregister(&mut self, node: NodeId) {
        self.nodes.remove(&node);
        self.scheduler.cancel(node);
    }

    #[must_use]
    pub fn entries(&self, node: NodeId) -> Option<&[LoraEntry]> {
        self.nodes.get(&node).map(|n| n.entries.as_slice())
    }

    #[must_use]
    pub fn state(&self, node: NodeId) -> Option<SyncState> {
        self.nodes.get(&node).map(|n| n.state)
    }

    /// Registered node ids in ascending order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The structured list changed (widget edit, persistence restore).
    ///
    /// Replaces the node's list, notifies collaborators with the new active
    /// set, and schedules a debounced text rewrite. Dropped when a pass is
    /// already in flight.
    pub fn on_entries_changed(
        &mut self,
        node: NodeId,
        new_entries: Vec<LoraEntry>,
        snapshot: Option<&GraphSnapshot>,
        host: &mut dyn WidgetHost,
    ) {
        let Some(node_state) = self.nodes.get_mut(&node) else {
            debug!("Entries changed for unregistered node {node}, ignoring");
            return;
        };
        if node_state.state != SyncState::Idle {
            debug!(
                "Node {node} is {:?}, dropping entries change",
                node_state.state
            );
            return;
        }

        node_state.state = SyncState::Updating;
        node_state.entries = new_entries;

        let active = self.active_set(node, snapshot);
        host.notify_active_set(node, &active);
        host.propagate(node);
        self.scheduler.schedule(node);

        if let Some(node_state) = self.nodes.get_mut(&node) {
            node_state.state = SyncState::Idle;
        }
    }

    /// The text changed (user typed into the spec widget).
    ///
    /// Decodes the text and merges into the current list; a textual edit
    /// never silently disables an entry. Notifies collaborators only when
    /// the merge actually changed the list, so the write-back echo of our
    /// own rewrite cannot trigger a second propagation. Dropped when a pass
    /// is already in flight.
    pub fn on_text_changed(
        &mut self,
        node: NodeId,
        new_text: &str,
        snapshot: Option<&GraphSnapshot>,
        host: &mut dyn WidgetHost,
    ) {
        let Some(node_state) = self.nodes.get_mut(&node) else {
            debug!("Text changed for unregistered node {node}, ignoring");
            return;
        };
        if node_state.state != SyncState::Idle {
            debug!("Node {node} is {:?}, dropping text change", node_state.state);
            return;
        }

        node_state.state = SyncState::Updating;
        let decoded = codec::decode(new_text);
        let merged = codec::merge(&decoded, &node_state.entries);
        let changed = merged != node_state.entries;
        node_state.entries = merged;

        if changed {
            let active = self.active_set(node, snapshot);
            host.notify_active_set(node, &active);
            host.propagate(node);
        }

        if let Some(node_state) = self.nodes.get_mut(&node) {
            node_state.state = SyncState::Idle;
        }
    }

    /// Fire every debounced rewrite whose quiescence delay has elapsed.
    ///
    /// Returns the number of text writes performed. A rewrite producing
    /// text identical to the widget's current text writes nothing.
    pub fn run_due_rewrites(&mut self, host: &mut dyn WidgetHost) -> usize {
        let mut writes = 0;
        for node in self.scheduler.due() {
            let Some(node_state) = self.nodes.get_mut(&node) else {
                continue;
            };
            if node_state.state == SyncState::SyncingInput {
                debug!("Node {node} already syncing input, coalescing rewrite");
                continue;
            }
            node_state.state = SyncState::SyncingInput;

            if let Some(previous) = host.current_text(node) {
                let encoded = codec::encode(&previous, &node_state.entries);
                if encoded != previous {
                    host.set_text(node, &encoded);
                    writes += 1;
                }
            }

            if let Some(node_state) = self.nodes.get_mut(&node) {
                node_state.state = SyncState::Idle;
            }
        }
        writes
    }

    /// Apply an inbound code-update event (append or replace), then run the
    /// normal text reconciliation. `node_id` −1 targets every registered
    /// node.
    pub fn apply_code_update(
        &mut self,
        update: &CodeUpdate,
        snapshot: Option<&GraphSnapshot>,
        host: &mut dyn WidgetHost,
    ) {
        let targets: Vec<NodeId> = if update.node_id == BROADCAST_NODE_ID {
            self.node_ids()
        } else {
            match u64::try_from(update.node_id) {
                Ok(id) if self.nodes.contains_key(&id) => vec![id],
                _ => {
                    debug!("Code update for unknown node {}, ignoring", update.node_id);
                    return;
                }
            }
        };

        for node in targets {
            let current = host.current_text(node).unwrap_or_default();
            let updated = match update.mode {
                UpdateMode::Replace => update.lora_code.clone(),
                UpdateMode::Append if current.is_empty() => update.lora_code.clone(),
                UpdateMode::Append => format!("{current} {}", update.lora_code),
            };
            host.set_text(node, &updated);
            self.on_text_changed(node, &updated, snapshot, host);
        }
    }

    /// Active entry names at `node`: the chain fold when the node is part of
    /// a snapshot, otherwise just this node's own active entries.
    fn active_set(&self, node: NodeId, snapshot: Option<&GraphSnapshot>) -> BTreeSet<String> {
        match snapshot {
            Some(snapshot) if snapshot.contains(node) => collect_active(snapshot, node),
            _ => self
                .nodes
                .get(&node)
                .map(|n| {
                    n.entries
                        .iter()
                        .filter(|e| e.active)
                        .map(|e| e.name.clone())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
