//! Error-as-data outcomes for node operations.
//!
//! Every completed run of a node's operation produces an [`Outcome`]:
//! either a JSON value or a typed failure. Failures flow through the
//! cache and downstream inputs exactly like values — an operation error
//! never aborts the engine or any sibling node. Callers pattern-match
//! on the two variants instead of type-checking a caught exception.
//!
//! # Examples
//!
//! ```rust
//! use pipelab::outcome::Outcome;
//! use serde_json::json;
//!
//! let ok = Outcome::value(json!({"rows": 10}));
//! assert!(ok.is_value());
//!
//! let bad = Outcome::failure("ValueError", "empty table");
//! assert_eq!(bad.failure_message(), Some("empty table"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::OperationError;

/// Result of running a node's operation: a value or a typed failure.
///
/// Stored as-is in the [`ResultCache`](crate::cache::ResultCache) and
/// handed to child operations as input. The engine never interprets
/// the value payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "payload", rename_all = "snake_case")]
pub enum Outcome {
    /// Successful run; payload is opaque to the engine.
    Value(Value),
    /// Failed run, recorded as ordinary data.
    Failure {
        /// Short error-kind label, e.g. the originating error type name.
        kind: String,
        /// Human-readable message surfaced on the failed node.
        message: String,
    },
}

impl Outcome {
    /// Wrap a successful value.
    pub fn value(v: Value) -> Self {
        Outcome::Value(v)
    }

    /// Build a failure outcome from a kind label and message.
    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Outcome::Failure {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for the `Value` variant.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    /// Returns `true` for the `Failure` variant.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    /// Borrow the value payload, if any.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Outcome::Value(v) => Some(v),
            Outcome::Failure { .. } => None,
        }
    }

    /// The failure message, if this outcome is a failure.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Outcome::Failure { message, .. } => Some(message),
            Outcome::Value(_) => None,
        }
    }

    /// The failure kind label, if this outcome is a failure.
    #[must_use]
    pub fn failure_kind(&self) -> Option<&str> {
        match self {
            Outcome::Failure { kind, .. } => Some(kind),
            Outcome::Value(_) => None,
        }
    }
}

impl From<Result<Value, OperationError>> for Outcome {
    /// The error protector: converts an operation result into cacheable
    /// data, so no operation error can escape a worker task.
    fn from(res: Result<Value, OperationError>) -> Self {
        match res {
            Ok(v) => Outcome::Value(v),
            Err(e) => Outcome::Failure {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}
