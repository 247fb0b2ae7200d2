//! Graph topology store for the pipeline engine.
//!
//! [`GraphStore`] owns the node arena and every structural mutation:
//! node creation with unique-name allocation, renaming, and cascading
//! branch deletion. Edges are stored as node names in both directions
//! (parent → children, child → parents) and are kept mutual by
//! construction.
//!
//! # Invariants
//!
//! - Names are pairwise unique at all times.
//! - Every parent/child reference resolves to a live node and is
//!   mirrored on the other side.
//! - The graph is acyclic: nodes are only ever created with
//!   already-existing parents, so a cycle cannot arise by construction.
//!   Any future relinking feature must add an explicit cycle check.
//!
//! # Quick Start
//!
//! ```rust
//! use pipelab::graph::GraphStore;
//!
//! let mut graph = GraphStore::new();
//! let load = graph.add_node("load", &[]).unwrap().name.clone();
//! let filter = graph.add_node("filter", &[load.as_str()]).unwrap().name.clone();
//!
//! // A second "load" gets a uniquified name.
//! let load2 = graph.add_node("load", &[]).unwrap().name.clone();
//! assert_eq!(load2, "load_1");
//!
//! let order: Vec<_> = graph.topological_order().map(|n| n.name.as_str()).collect();
//! assert_eq!(order, vec!["load", "filter", "load_1"]);
//! # let _ = filter;
//! ```

mod store;
mod topology;

#[cfg(test)]
mod tests;

pub use store::GraphStore;

use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced synchronously by structural graph edits.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// A structural edit referenced a parent that does not exist.
    #[error("unknown parent node: {name}")]
    #[diagnostic(
        code(pipelab::graph::unknown_parent),
        help("Parents must be added to the graph before their children.")
    )]
    UnknownParent { name: String },

    /// The named node is not present in the graph.
    #[error("node not found: {name}")]
    #[diagnostic(code(pipelab::graph::node_not_found))]
    NodeNotFound { name: String },
}
