//! Node chain traversal
//!
//! Computes the set of active entry names visible at a node by folding all
//! entry lists reachable upstream through stack links. The traversal runs
//! over an immutable [`GraphSnapshot`] captured from the editor, so the
//! algorithm is pure and testable without a running UI host.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use crate::codec::LoraEntry;

pub type NodeId = u64;

/// The kind of node participating in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Loader,
    Stacker,
    Randomizer,
    Cycler,
    Pool,
    Output,
}

impl NodeKind {
    /// Whether this node type accepts a stack input; only edges into such
    /// nodes are followed during traversal.
    #[must_use]
    pub const fn accepts_stack_input(self) -> bool {
        matches!(self, Self::Loader | Self::Stacker | Self::Randomizer)
    }
}

/// Execution mode of a node as reported by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMode {
    Enabled,
    Disabled,
    Bypassed,
}

impl NodeMode {
    #[must_use]
    pub const fn contributes(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// One node as captured at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    pub mode: NodeMode,
    #[serde(default)]
    pub entries: Vec<LoraEntry>,
}

/// A directed "stack" connection between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub from: NodeId,
    pub to: NodeId,
}

/// Immutable view of the node graph captured before a traversal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    nodes: HashMap<NodeId, NodeSnapshot>,
    links: Vec<ChainLink>,
}

impl GraphSnapshot {
    #[must_use]
    pub fn new(nodes: Vec<NodeSnapshot>, links: Vec<ChainLink>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            links,
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ids of nodes linking directly into `id`.
    fn upstream_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.links
            .iter()
            .filter(move |link| link.to == id)
            .map(|link| link.from)
    }
}

/// Collect the names of entries active at `start`.
///
/// Depth-first upstream traversal from `start`, following only edges whose
/// target accepts a stack input. Bypassed and disabled nodes contribute
/// nothing; every other visited node contributes its active entry names.
/// Each node is visited at most once, so an accidental cycle in the editor
/// terminates instead of recursing. Links into deleted nodes are skipped.
#[must_use]
pub fn collect_active(snapshot: &GraphSnapshot, start: NodeId) -> BTreeSet<String> {
    let mut active = BTreeSet::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![start];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = snapshot.node(id) else {
            continue; // dangling link: empty contribution
        };

        if node.mode.contributes() {
            for entry in &node.entries {
                if entry.active {
                    active.insert(entry.name.clone());
                }
            }
        }

        if node.kind.accepts_stack_input() {
            stack.extend(snapshot.upstream_of(id));
        }
    }

    active
}
