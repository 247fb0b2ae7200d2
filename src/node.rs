//! Pipeline node data model.
//!
//! A [`PipelineNode`] is one step of the pipeline: a type identifier, an
//! ordered list of parent names, a list of child names, the execution
//! state, a type-specific parameter map, and opaque layout metadata the
//! engine passes through for the UI layer. Edges are stored as names,
//! not references — the graph arena in
//! [`GraphStore`](crate::graph::GraphStore) owns every node and resolves
//! names on demand, so there are no ownership cycles to manage.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{NodeState, TypeId};

/// Layout metadata carried for the rendering layer.
///
/// The engine never interprets these fields; they round-trip through
/// session files untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeLayout {
    /// Scene position `[x, y]`.
    pub position: [f64; 2],
    /// Widget size `[w, h]`.
    pub size: [f64; 2],
    /// Visibility flags `[parameters_hidden, result_hidden]`.
    pub hidden: [bool; 2],
}

/// One step of the pipeline graph.
///
/// Nodes are created only through
/// [`GraphStore::add_node`](crate::graph::GraphStore::add_node), which
/// guarantees a unique `name` and mutual parent/child registration.
/// State and `error_message` are written by the scheduler; parameters
/// and layout by user edits.
#[derive(Clone, Debug)]
pub struct PipelineNode {
    /// Unique node name, also the cache and session key.
    pub name: String,
    /// Operation type identifier resolved through the registry.
    pub type_id: TypeId,
    /// Ordered parent names; order defines operation input order.
    pub parents: Vec<String>,
    /// Child names, maintained mutually with `parents`.
    pub children: Vec<String>,
    /// Current execution state.
    pub state: NodeState,
    /// Message of the latest failure, when `state == Fail`.
    pub error_message: Option<String>,
    /// Type-specific parameter values keyed by parameter name.
    pub parameters: FxHashMap<String, Value>,
    /// Pass-through layout metadata.
    pub layout: NodeLayout,
}

impl PipelineNode {
    pub(crate) fn new(name: String, type_id: TypeId, parents: Vec<String>) -> Self {
        Self {
            name,
            type_id,
            parents,
            children: Vec::new(),
            state: NodeState::Idle,
            error_message: None,
            parameters: FxHashMap::default(),
            layout: NodeLayout::default(),
        }
    }

    /// Returns `true` when the node has no parents (a source node).
    #[must_use]
    pub fn is_source(&self) -> bool {
        self.parents.is_empty()
    }

    /// Set a single parameter value, replacing any previous value.
    pub fn set_parameter(&mut self, key: impl Into<String>, value: Value) {
        self.parameters.insert(key.into(), value);
    }
}
