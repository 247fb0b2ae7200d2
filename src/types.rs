//! Core identifiers and lifecycle labels for the pipelab engine.
//!
//! This module defines the small vocabulary shared by every other module:
//! the per-node execution state machine ([`NodeState`]) and the string
//! alias used for node-type identifiers.
//!
//! # Examples
//!
//! ```rust
//! use pipelab::types::NodeState;
//!
//! let state = NodeState::Idle;
//! assert!(!state.is_settled());
//! assert_eq!(NodeState::Valid.to_string(), "valid");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node type, resolved through the
/// [`OperationRegistry`](crate::registry::OperationRegistry).
///
/// Plain `String` rather than a newtype: type identifiers cross the
/// engine boundary constantly (menus, session files, registry config)
/// and the registry validates them at registration time.
pub type TypeId = String;

/// Execution state of a single pipeline node.
///
/// The lifecycle is re-entrant: a node may leave `Valid` or `Fail` and
/// return to `Loading` whenever it is re-triggered.
///
/// ```text
/// Idle → Loading → {Valid, Fail} → Loading → …
/// ```
///
/// `Loading` is active while at least one running task for the node is
/// outstanding; the terminal label is written only by the completion
/// that drains the last outstanding task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Never run since creation (or since a restore).
    #[default]
    Idle,
    /// At least one operation dispatch is in flight.
    Loading,
    /// The latest completed run produced a value.
    Valid,
    /// The latest completed run produced a failure outcome.
    Fail,
}

impl NodeState {
    /// Returns `true` once the node has a settled result (value or failure).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Valid | Self::Fail)
    }

    /// Returns `true` while a run is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Valid => write!(f, "valid"),
            Self::Fail => write!(f, "fail"),
        }
    }
}
